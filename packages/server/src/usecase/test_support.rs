//! Fixtures for the use-case tests.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    domain::{
        DisplayName, OutboundFrame, PusherChannel, RoomId, RoomKind, RoomRecord, RoomRecordStore,
        RoomSettings, Song, SongId, Timestamp, UserId,
    },
    infrastructure::{
        dto::websocket::{Envelope, MessageKind},
        repository::InMemoryRoomRecordStore,
        room_manager::RoomManager,
    },
};
use syncrate_shared::time::ManualClock;

pub(crate) const ROOM: &str = "AB12CD";

pub(crate) fn uid(s: &str) -> UserId {
    UserId::new(s.to_string()).unwrap()
}

pub(crate) fn name(s: &str) -> DisplayName {
    DisplayName::new(s.to_string()).unwrap()
}

pub(crate) fn room_id() -> RoomId {
    RoomId::new(ROOM.to_string()).unwrap()
}

pub(crate) fn song(id: u32) -> Song {
    Song {
        id: SongId::new(id),
        title: format!("Song {id}"),
        title_english: String::new(),
        artists: vec!["Aqours".to_string()],
        source_url: format!("https://www.youtube.com/watch?v=vid{id}"),
        thumbnail_url: String::new(),
        category_id: Some(1),
        category_name: Some("Love Live! Sunshine!!".to_string()),
        is_cover: false,
    }
}

pub(crate) struct Fixture {
    pub room_manager: Arc<RoomManager>,
    pub store: Arc<InMemoryRoomRecordStore>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let clock = Arc::new(ManualClock::new(1_000));
        Self {
            room_manager: Arc::new(RoomManager::new(clock.clone())),
            store: Arc::new(InMemoryRoomRecordStore::new()),
            clock,
        }
    }

    /// Persist a record and load the matching live room.
    pub(crate) async fn room(&self, kind: RoomKind, settings: RoomSettings) -> RoomRecord {
        let record = RoomRecord::new(
            room_id(),
            kind,
            uid("creator"),
            name("creator"),
            settings,
            Timestamp::new(1_000),
        );
        self.store.create(record.clone()).await.unwrap();
        self.room_manager
            .create_room(room_id(), kind, uid("creator"), name("creator"))
            .await;
        record
    }

    pub(crate) async fn join(&self, user: &str, display: &str) -> UnboundedReceiver<OutboundFrame> {
        let (channel, rx) = PusherChannel::new();
        self.room_manager
            .register(uid(user), name(display), room_id(), channel)
            .await
            .unwrap();
        rx
    }
}

/// Every text frame queued so far, decoded.
pub(crate) fn drain(rx: &mut UnboundedReceiver<OutboundFrame>) -> Vec<Envelope> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let OutboundFrame::Text(text) = frame {
            frames.push(Envelope::decode(&text).unwrap());
        }
    }
    frames
}

/// Frames of one kind, in arrival order.
pub(crate) fn of_kind(frames: &[Envelope], kind: MessageKind) -> Vec<Envelope> {
    frames.iter().filter(|f| f.kind == kind).cloned().collect()
}
