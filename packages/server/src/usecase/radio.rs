//! UseCase: ラジオルーム
//!
//! - 参加時: `room_settings`（ビデオ同期は常に有効）→ 現在の曲
//! - `next_song`: カテゴリ・カバー曲・最低平均評価のフィルタで無作為に選曲
//! - `vote_update`: 保存せずブロードキャストのみ

use std::sync::Arc;

use super::{
    error::DispatchError,
    support::{choose, envelope, load_record, song_change_envelope, stamped_vote},
};
use crate::{
    domain::{
        DisplayName, RandomSource, RoomId, RoomKind, RoomRecord, RoomRecordStore, Song,
        SongCatalog, SongId, UserId,
    },
    infrastructure::{
        dto::websocket::{MessageKind, RoomSettingsData, VoteUpdateData},
        room_manager::RoomManager,
    },
};

/// ラジオルームのハンドラ
pub struct RadioRoomHandler {
    catalog: Arc<dyn SongCatalog>,
    store: Arc<dyn RoomRecordStore>,
    room_manager: Arc<RoomManager>,
    random: Arc<RandomSource>,
}

impl RadioRoomHandler {
    pub fn new(
        catalog: Arc<dyn SongCatalog>,
        store: Arc<dyn RoomRecordStore>,
        room_manager: Arc<RoomManager>,
        random: Arc<RandomSource>,
    ) -> Self {
        Self {
            catalog,
            store,
            room_manager,
            random,
        }
    }

    pub async fn on_join(&self, user_id: &UserId, record: &RoomRecord) -> Result<(), DispatchError> {
        let settings = envelope(
            MessageKind::RoomSettings,
            &RoomSettingsData {
                video_sync_enabled: true,
            },
            self.room_manager.now(),
        )?;
        self.room_manager.send_to_user(user_id, &settings).await?;

        if let Some(song_id) = record.current_song_id {
            let song = self.catalog.get_song(song_id).await?;
            let envelope =
                song_change_envelope(&*self.catalog, &self.room_manager, &record.room_id, &song)
                    .await?;
            self.room_manager.send_to_user(user_id, &envelope).await?;
        }
        Ok(())
    }

    /// 投票を表示用にブロードキャストする（保存はしない）
    pub async fn vote(
        &self,
        user_id: &UserId,
        display_name: &DisplayName,
        record: &RoomRecord,
        data: VoteUpdateData,
    ) -> Result<usize, DispatchError> {
        if record.current_song_id.is_none() {
            return Err(DispatchError::NoCurrentSong(record.room_id.to_string()));
        }
        let payload = stamped_vote(user_id, display_name, data)?;
        let envelope = envelope(MessageKind::VoteUpdate, &payload, self.room_manager.now())?;
        Ok(self
            .room_manager
            .broadcast_to_room(&record.room_id, &envelope)
            .await?)
    }

    pub async fn next_song(&self, room_id: &RoomId) -> Result<SongId, DispatchError> {
        let lock = self.room_manager.room_lock(room_id).await;
        let _guard = lock.lock().await;

        let mut record = load_record(&*self.store, room_id).await?;
        let candidates = self
            .catalog
            .list_candidate_songs(&record.settings.song_filter(RoomKind::Radio))
            .await?;
        let fresh: Vec<Song> = candidates
            .iter()
            .filter(|s| Some(s.id) != record.current_song_id)
            .cloned()
            .collect();
        let pool = if fresh.is_empty() { candidates } else { fresh };
        let song = choose(&self.random, &pool)
            .cloned()
            .ok_or_else(|| DispatchError::NoSongAvailable(room_id.to_string()))?;

        record.current_song_id = Some(song.id);
        record.last_active_at = self.room_manager.now();
        self.store.save(record).await?;
        self.room_manager
            .update_room(room_id, |room| {
                room.current_item_id = Some(song.id.to_string());
            })
            .await?;
        tracing::info!("Radio '{}' now playing song {} ({})", room_id, song.id, song.title);

        let envelope =
            song_change_envelope(&*self.catalog, &self.room_manager, room_id, &song).await?;
        self.room_manager.broadcast_to_room(room_id, &envelope).await?;
        Ok(song.id)
    }
}
