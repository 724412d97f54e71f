//! UseCase: 受信フレームの振り分け
//!
//! ## 責務
//!
//! 1. フレームをデコードし、送信者の接続とルームを特定する
//! 2. 接続とレコードのアクティビティを更新する
//! 3. レコードが消えていれば `error`（reload 付き）を配信してライブルームを閉じる
//! 4. 種別とルーム種別に応じて処理する
//!
//! - パススルー: `video_sync`（再生状態も更新）、`navigate_match`
//! - 状態変更: `vote_update`、`next_song`、`start_tournament`、`start_match`、
//!   `pick_winner`、`room_settings`（作成者のみ）
//! - `join_room`: 初期状態を再送
//! - `leave_room`: 退出処理
//! - サーバー専用の種別は破棄
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - パススルーの中継、作成者チェック、ルーム消滅時の通知
//!
//! ### どのような状況を想定しているか
//! - 異常系：不正な JSON、未知の種別、サーバー専用の種別、レコード削除後のフレーム

use std::sync::Arc;

use uuid::Uuid;

use super::{
    error::DispatchError, leave_room::LeaveRoomUseCase, room_handlers::RoomHandlers,
    support::envelope,
};
use crate::{
    domain::{PlaybackState, RoomError, RoomId, RoomKind, RoomRecord, RoomRecordStore, UserId},
    infrastructure::{
        dto::websocket::{
            Envelope, MessageKind, NavigateMatchData, PickWinnerData, RoomSettingsData,
            StartMatchData, VideoSyncData, VoteUpdateData,
        },
        room_manager::{RoomManager, registry::Connection},
    },
};

/// フレーム振り分けのユースケース
pub struct DispatchMessageUseCase {
    store: Arc<dyn RoomRecordStore>,
    room_manager: Arc<RoomManager>,
    handlers: Arc<RoomHandlers>,
    leave: Arc<LeaveRoomUseCase>,
}

impl DispatchMessageUseCase {
    pub fn new(
        store: Arc<dyn RoomRecordStore>,
        room_manager: Arc<RoomManager>,
        handlers: Arc<RoomHandlers>,
        leave: Arc<LeaveRoomUseCase>,
    ) -> Self {
        Self {
            store,
            room_manager,
            handlers,
            leave,
        }
    }

    /// 1 フレームを処理する
    ///
    /// # Arguments
    ///
    /// * `user_id` - 送信者
    /// * `connection_id` - 送信元の接続
    /// * `text` - 受信したテキストフレーム
    ///
    /// # Returns
    ///
    /// * `Ok(MessageKind)` - 処理した種別
    /// * `Err(DispatchError)` - 破棄した理由（呼び出し側でログに残す）
    pub async fn execute(
        &self,
        user_id: &UserId,
        connection_id: Uuid,
        text: &str,
    ) -> Result<MessageKind, DispatchError> {
        let envelope = Envelope::decode(text)?;
        let connection = self
            .room_manager
            .lookup(user_id)
            .await
            .ok_or_else(|| DispatchError::NotInRoom(user_id.to_string()))?;
        self.room_manager.touch(user_id).await;
        tracing::debug!(
            "{} from '{}' in room '{}'",
            envelope.kind,
            user_id,
            connection.room_id
        );

        if envelope.kind.is_server_originated() {
            return Err(DispatchError::ServerOnly(envelope.kind));
        }
        if envelope.kind == MessageKind::LeaveRoom {
            self.leave.execute(user_id, Some(connection_id)).await;
            return Ok(envelope.kind);
        }

        let room_id = connection.room_id.clone();
        let Some(record) = self.store.load(&room_id).await? else {
            self.close_gone_room(&room_id).await;
            return Err(DispatchError::RoomGone(room_id.to_string()));
        };
        if let Err(e) = self.store.touch(&room_id, self.room_manager.now()).await {
            tracing::warn!("Failed to touch record of room '{}': {}", room_id, e);
        }

        let kind = envelope.kind;
        if kind.is_pass_through() {
            self.relay(&room_id, record.kind, &envelope).await?;
            return Ok(kind);
        }
        match (kind, record.kind) {
            (MessageKind::JoinRoom, _) => self.handlers.on_join(user_id, &record).await?,
            (MessageKind::VoteUpdate, room_kind) => {
                let data: VoteUpdateData = envelope.payload()?;
                let name = &connection.display_name;
                match room_kind {
                    RoomKind::Rating => {
                        self.handlers.rating.vote(user_id, name, &room_id, data).await?;
                    }
                    RoomKind::Radio => {
                        self.handlers.radio.vote(user_id, name, &record, data).await?;
                    }
                    RoomKind::Tournament => {
                        self.handlers
                            .tournament
                            .vote(user_id, name, &room_id, data)
                            .await?;
                    }
                }
            }
            (MessageKind::NextSong, RoomKind::Rating) => {
                self.handlers.rating.next_song(&room_id).await?;
            }
            (MessageKind::NextSong, RoomKind::Radio) => {
                self.handlers.radio.next_song(&room_id).await?;
            }
            (MessageKind::RoomSettings, RoomKind::Rating | RoomKind::Tournament) => {
                let data: RoomSettingsData = envelope.payload()?;
                self.update_settings(&connection, record, data).await?;
            }
            (MessageKind::StartTournament, RoomKind::Tournament) => {
                self.handlers.tournament.start_tournament(&room_id).await?;
            }
            (MessageKind::StartMatch, RoomKind::Tournament) => {
                let data: StartMatchData = envelope.payload()?;
                self.handlers.tournament.start_match(&room_id, data).await?;
            }
            (MessageKind::PickWinner, RoomKind::Tournament) => {
                let data: PickWinnerData = envelope.payload()?;
                self.handlers
                    .tournament
                    .pick_winner(user_id, &connection.display_name, &room_id, data)
                    .await?;
            }
            (kind, room_kind) => return Err(DispatchError::Unsupported { kind, room_kind }),
        }
        Ok(kind)
    }

    /// 中継種別をルームへそのまま流す。video_sync は再生状態も更新する
    async fn relay(
        &self,
        room_id: &RoomId,
        room_kind: RoomKind,
        envelope: &Envelope,
    ) -> Result<(), DispatchError> {
        match (envelope.kind, room_kind) {
            (MessageKind::VideoSync, _) => {
                let data: VideoSyncData = envelope.payload()?;
                self.room_manager
                    .update_room(room_id, |room| {
                        room.playback = PlaybackState {
                            position: data.time,
                            is_playing: data.is_playing,
                        };
                    })
                    .await?;
            }
            (MessageKind::NavigateMatch, RoomKind::Tournament) => {
                let _: NavigateMatchData = envelope.payload()?;
            }
            (kind, room_kind) => return Err(DispatchError::Unsupported { kind, room_kind }),
        }
        self.room_manager.broadcast_to_room(room_id, envelope).await?;
        Ok(())
    }

    /// 作成者によるビデオ同期の切り替え
    async fn update_settings(
        &self,
        connection: &Connection,
        mut record: RoomRecord,
        data: RoomSettingsData,
    ) -> Result<(), DispatchError> {
        if record.creator_id != connection.user_id {
            return Err(RoomError::NotRoomCreator(connection.user_id.to_string()).into());
        }
        let room_id = record.room_id.clone();
        record.settings.video_sync_enabled = data.video_sync_enabled;
        record.last_active_at = self.room_manager.now();
        self.store.save(record).await?;
        self.room_manager
            .update_room(&room_id, |room| {
                room.video_sync_enabled = data.video_sync_enabled;
            })
            .await?;
        tracing::info!(
            "Video sync in room '{}' turned {}",
            room_id,
            if data.video_sync_enabled { "on" } else { "off" }
        );

        let envelope = envelope(MessageKind::RoomSettings, &data, self.room_manager.now())?;
        self.room_manager.broadcast_to_room(&room_id, &envelope).await?;
        Ok(())
    }

    /// 永続レコードが消えたルームのメンバーにリロードを促し、ライブルームを閉じる
    async fn close_gone_room(&self, room_id: &RoomId) {
        let notice = DispatchError::RoomGone(room_id.to_string()).client_notice();
        if let Some(notice) = notice {
            match envelope(MessageKind::Error, &notice, self.room_manager.now()) {
                Ok(frame) => {
                    if let Err(e) = self.room_manager.broadcast_to_room(room_id, &frame).await {
                        tracing::warn!("Failed to notify room '{}' of removal: {}", room_id, e);
                    }
                }
                Err(e) => tracing::error!("Failed to build error frame: {}", e),
            }
        }
        self.room_manager.delete_room(room_id).await;
        tracing::info!("Room '{}' has no record anymore, closed", room_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{OutboundFrame, RandomSource, RoomSettings},
        infrastructure::{
            dto::websocket::{ErrorData, ProtocolError},
            repository::InMemorySongCatalog,
        },
        usecase::test_support::{Fixture, drain, of_kind, room_id, song, uid},
    };

    fn usecase(fixture: &Fixture) -> DispatchMessageUseCase {
        let random = Arc::new(RandomSource::seeded(9));
        let handlers = RoomHandlers::new(
            Arc::new(InMemorySongCatalog::new(vec![song(1), song(2)])),
            fixture.store.clone(),
            fixture.room_manager.clone(),
            random.clone(),
            random,
        );
        DispatchMessageUseCase::new(
            fixture.store.clone(),
            fixture.room_manager.clone(),
            Arc::new(handlers),
            Arc::new(LeaveRoomUseCase::new(fixture.room_manager.clone())),
        )
    }

    async fn connection_id(fixture: &Fixture, user: &str) -> Uuid {
        fixture
            .room_manager
            .lookup(&uid(user))
            .await
            .unwrap()
            .connection_id
    }

    #[tokio::test]
    async fn test_video_sync_is_relayed_and_updates_playback() {
        // テスト項目: video_sync はそのまま中継され、再生状態が更新される
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.room(RoomKind::Rating, RoomSettings::default()).await;
        let _alice = fixture.join("alice", "alice").await;
        let mut bob_rx = fixture.join("bob", "bob").await;
        let usecase = usecase(&fixture);
        let id = connection_id(&fixture, "alice").await;
        let frame = r#"{"type":"video_sync","data":{"time":42.5,"is_playing":true},"timestamp":7}"#;

        // when (操作):
        let kind = usecase.execute(&uid("alice"), id, frame).await.unwrap();

        // then (期待する結果):
        assert_eq!(kind, MessageKind::VideoSync);
        let relayed = of_kind(&drain(&mut bob_rx), MessageKind::VideoSync);
        assert_eq!(relayed[0].timestamp, 7);
        let data: VideoSyncData = relayed[0].payload().unwrap();
        assert_eq!(data.time, 42.5);
        let live = fixture.room_manager.get_room(&room_id()).await.unwrap();
        assert!(live.playback.is_playing);
    }

    #[tokio::test]
    async fn test_navigate_match_is_relayed_only_in_tournaments() {
        // テスト項目: navigate_match はトーナメントでのみ中継され、他のルームでは何も送られない
        // given (前提条件):
        let tournament = Fixture::new();
        tournament.room(RoomKind::Tournament, RoomSettings::default()).await;
        let _alice = tournament.join("alice", "alice").await;
        let mut bob_rx = tournament.join("bob", "bob").await;
        let rating = Fixture::new();
        rating.room(RoomKind::Rating, RoomSettings::default()).await;
        let _carol = rating.join("carol", "carol").await;
        let mut dave_rx = rating.join("dave", "dave").await;
        let frame = r#"{"type":"navigate_match","data":{"match_id":"r1m3"},"timestamp":3}"#;
        drain(&mut bob_rx);
        drain(&mut dave_rx);

        // when (操作):
        let relayed = usecase(&tournament)
            .execute(&uid("alice"), connection_id(&tournament, "alice").await, frame)
            .await;
        let rejected = usecase(&rating)
            .execute(&uid("carol"), connection_id(&rating, "carol").await, frame)
            .await;

        // then (期待する結果):
        assert!(matches!(relayed, Ok(MessageKind::NavigateMatch)));
        let frames = of_kind(&drain(&mut bob_rx), MessageKind::NavigateMatch);
        let data: NavigateMatchData = frames[0].payload().unwrap();
        assert_eq!(data.match_id, "r1m3");
        assert!(matches!(
            rejected,
            Err(DispatchError::Unsupported {
                kind: MessageKind::NavigateMatch,
                room_kind: RoomKind::Rating
            })
        ));
        assert!(drain(&mut dave_rx).is_empty());
    }

    #[tokio::test]
    async fn test_next_song_in_rating_room() {
        // テスト項目: next_song はレーティングルームのハンドラに渡される
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.room(RoomKind::Rating, RoomSettings::default()).await;
        let mut rx = fixture.join("alice", "alice").await;
        let usecase = usecase(&fixture);
        let id = connection_id(&fixture, "alice").await;

        // when (操作):
        usecase
            .execute(&uid("alice"), id, r#"{"type":"next_song","data":{},"timestamp":1}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(of_kind(&drain(&mut rx), MessageKind::SongChange).len(), 1);
    }

    #[tokio::test]
    async fn test_room_settings_requires_creator() {
        // テスト項目: 作成者以外の room_settings は NotRoomCreator
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.room(RoomKind::Rating, RoomSettings::default()).await;
        let _alice = fixture.join("alice", "alice").await;
        let usecase = usecase(&fixture);
        let id = connection_id(&fixture, "alice").await;
        let frame = r#"{"type":"room_settings","data":{"video_sync_enabled":false},"timestamp":1}"#;

        // when (操作):
        let result = usecase.execute(&uid("alice"), id, frame).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(DispatchError::Room(RoomError::NotRoomCreator(_)))
        ));
    }

    #[tokio::test]
    async fn test_room_settings_by_creator() {
        // テスト項目: 作成者はビデオ同期を切り替えられ、レコードにも保存される
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.room(RoomKind::Rating, RoomSettings::default()).await;
        let mut rx = fixture.join("creator", "creator").await;
        let usecase = usecase(&fixture);
        let id = connection_id(&fixture, "creator").await;
        let frame = r#"{"type":"room_settings","data":{"video_sync_enabled":false},"timestamp":1}"#;

        // when (操作):
        usecase.execute(&uid("creator"), id, frame).await.unwrap();

        // then (期待する結果):
        let record = fixture.store.load(&room_id()).await.unwrap().unwrap();
        assert!(!record.settings.video_sync_enabled);
        let live = fixture.room_manager.get_room(&room_id()).await.unwrap();
        assert!(!live.video_sync_enabled);
        assert_eq!(of_kind(&drain(&mut rx), MessageKind::RoomSettings).len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_record_turns_next_frame_into_reload_error() {
        // テスト項目: レコード削除後のフレームには reload 付き error が返り、ルームが閉じる
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.room(RoomKind::Radio, RoomSettings::default()).await;
        let mut rx = fixture.join("alice", "alice").await;
        let usecase = usecase(&fixture);
        let id = connection_id(&fixture, "alice").await;
        fixture.store.delete(&room_id()).await.unwrap();
        drain(&mut rx);

        // when (操作):
        let result = usecase
            .execute(&uid("alice"), id, r#"{"type":"next_song","data":{},"timestamp":1}"#)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(DispatchError::RoomGone(_))));
        let frame = rx.try_recv().unwrap();
        let OutboundFrame::Text(text) = frame else {
            panic!("expected a text frame, got {frame:?}");
        };
        let error: ErrorData = Envelope::decode(&text).unwrap().payload().unwrap();
        assert!(error.reload);
        assert_eq!(rx.try_recv().unwrap(), OutboundFrame::Close);
        assert!(fixture.room_manager.get_room(&room_id()).await.is_none());
    }

    #[tokio::test]
    async fn test_rejected_frames() {
        // テスト項目: 不正な JSON・未知の種別・サーバー専用種別・種別違いは破棄される
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.room(RoomKind::Rating, RoomSettings::default()).await;
        let _alice = fixture.join("alice", "alice").await;
        let usecase = usecase(&fixture);
        let id = connection_id(&fixture, "alice").await;

        // when (操作):
        let malformed = usecase.execute(&uid("alice"), id, "{not json").await;
        let unknown = usecase
            .execute(&uid("alice"), id, r#"{"type":"dance","data":{},"timestamp":1}"#)
            .await;
        let server_only = usecase
            .execute(&uid("alice"), id, r#"{"type":"song_change","data":{},"timestamp":1}"#)
            .await;
        let wrong_room = usecase
            .execute(&uid("alice"), id, r#"{"type":"start_tournament","data":{},"timestamp":1}"#)
            .await;

        // then (期待する結果):
        assert!(matches!(
            malformed,
            Err(DispatchError::Protocol(ProtocolError::Decode(_)))
        ));
        assert!(matches!(
            unknown,
            Err(DispatchError::Protocol(ProtocolError::UnknownKind(_)))
        ));
        assert!(matches!(
            server_only,
            Err(DispatchError::ServerOnly(MessageKind::SongChange))
        ));
        assert!(matches!(
            wrong_room,
            Err(DispatchError::Unsupported {
                kind: MessageKind::StartTournament,
                room_kind: RoomKind::Rating
            })
        ));
    }

    #[tokio::test]
    async fn test_leave_room_frame() {
        // テスト項目: leave_room で退出する
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.room(RoomKind::Rating, RoomSettings::default()).await;
        let _alice = fixture.join("alice", "alice").await;
        let usecase = usecase(&fixture);
        let id = connection_id(&fixture, "alice").await;

        // when (操作):
        usecase
            .execute(&uid("alice"), id, r#"{"type":"leave_room","data":{},"timestamp":1}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(fixture.room_manager.lookup(&uid("alice")).await.is_none());
        assert_eq!(fixture.room_manager.member_count(&room_id()).await.unwrap(), 0);
    }
}
