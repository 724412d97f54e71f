//! UseCase: ルーム参加
//!
//! ## 責務
//!
//! - 永続レコードの存在確認（なければ `RoomNotFound`）
//! - ライブルームがなければレコードから復元
//! - 接続の登録（同じユーザーの前の接続は閉じられる）
//! - 種別ごとの初期状態を本人に送る
//!
//! ## テスト実装の作業記録
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加とメンバー一覧の配信、掃除済みライブルームの復元
//! - 異常系：存在しないルーム

use std::sync::Arc;

use uuid::Uuid;

use super::{error::JoinError, room_handlers::RoomHandlers};
use crate::{
    domain::{
        DisplayName, PusherChannel, Room, RoomId, RoomKind, RoomRecord, RoomRecordStore, UserId,
    },
    infrastructure::room_manager::RoomManager,
};

/// Load the live room for `record`, creating it from the record when missing.
pub(crate) async fn ensure_live_room(room_manager: &RoomManager, record: &RoomRecord) -> Room {
    if let Some(room) = room_manager.get_room(&record.room_id).await {
        return room;
    }
    room_manager
        .create_room(
            record.room_id.clone(),
            record.kind,
            record.creator_id.clone(),
            record.creator_name.clone(),
        )
        .await;

    let current_item = match record.kind {
        RoomKind::Tournament => record.current_match_id.map(|id| id.to_string()),
        RoomKind::Rating | RoomKind::Radio => record.current_song_id.map(|id| id.to_string()),
    };
    let video_sync_enabled =
        record.kind == RoomKind::Radio || record.settings.video_sync_enabled;
    let restored = room_manager
        .update_room(&record.room_id, |room| {
            room.current_item_id = current_item;
            room.video_sync_enabled = video_sync_enabled;
            room.clone()
        })
        .await;
    match restored {
        Ok(room) => room,
        // Removed again in between. Start from a fresh view.
        Err(_) => Room::new(
            record.room_id.clone(),
            record.kind,
            record.creator_id.clone(),
            record.creator_name.clone(),
            room_manager.now(),
        ),
    }
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    store: Arc<dyn RoomRecordStore>,
    room_manager: Arc<RoomManager>,
    handlers: Arc<RoomHandlers>,
}

impl JoinRoomUseCase {
    pub fn new(
        store: Arc<dyn RoomRecordStore>,
        room_manager: Arc<RoomManager>,
        handlers: Arc<RoomHandlers>,
    ) -> Self {
        Self {
            store,
            room_manager,
            handlers,
        }
    }

    /// ルームに参加する
    ///
    /// # Arguments
    ///
    /// * `user_id` / `display_name` - 接続クエリで渡された識別情報
    /// * `room_id` - 参加するルーム
    /// * `channel` - この接続への送信チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(Uuid)` - 接続 ID（切断時に古い接続かどうかの判定に使う）
    /// * `Err(JoinError)` - ルームがない、またはストアエラー
    pub async fn execute(
        &self,
        user_id: UserId,
        display_name: DisplayName,
        room_id: RoomId,
        channel: PusherChannel,
    ) -> Result<Uuid, JoinError> {
        let record = self
            .store
            .load(&room_id)
            .await?
            .ok_or_else(|| JoinError::RoomNotFound(room_id.to_string()))?;

        ensure_live_room(&self.room_manager, &record).await;
        let connection_id = self
            .room_manager
            .register(user_id.clone(), display_name, room_id.clone(), channel)
            .await?;
        if let Err(e) = self.store.touch(&room_id, self.room_manager.now()).await {
            tracing::warn!("Failed to touch record of room '{}': {}", room_id, e);
        }

        if let Err(e) = self.handlers.on_join(&user_id, &record).await {
            tracing::warn!(
                "Failed to send initial state of room '{}' to '{}': {}",
                room_id,
                user_id,
                e
            );
        }
        Ok(connection_id)
    }
}
