//! UseCase: ルーム退出
//!
//! 明示的な `leave_room` と切断の両方から呼ばれる。接続 ID を渡した場合は、
//! その接続がまだ現在の接続であるときだけ取り除く（再接続後の古い読み取りループ対策）。

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    domain::{RoomId, UserId},
    infrastructure::room_manager::RoomManager,
};

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    room_manager: Arc<RoomManager>,
}

impl LeaveRoomUseCase {
    pub fn new(room_manager: Arc<RoomManager>) -> Self {
        Self { room_manager }
    }

    /// # Returns
    ///
    /// * `Some(RoomId)` - 退出したルーム
    /// * `None` - 取り除く接続がなかった
    pub async fn execute(&self, user_id: &UserId, connection_id: Option<Uuid>) -> Option<RoomId> {
        match connection_id {
            Some(connection_id) => {
                self.room_manager
                    .unregister_connection(user_id, connection_id)
                    .await
            }
            None => self.room_manager.unregister(user_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{PusherChannel, RoomKind, RoomSettings},
        usecase::test_support::{Fixture, name, room_id, uid},
    };

    #[tokio::test]
    async fn test_stale_connection_does_not_remove_newer_one() {
        // テスト項目: 古い接続 ID での退出は新しい接続を残す
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.room(RoomKind::Rating, RoomSettings::default()).await;
        let (old_channel, _old_rx) = PusherChannel::new();
        let old = fixture
            .room_manager
            .register(uid("alice"), name("alice"), room_id(), old_channel)
            .await
            .unwrap();
        let _new_rx = fixture.join("alice", "alice").await;
        let usecase = LeaveRoomUseCase::new(fixture.room_manager.clone());

        // when (操作):
        let left = usecase.execute(&uid("alice"), Some(old)).await;

        // then (期待する結果):
        assert!(left.is_none());
        assert!(fixture.room_manager.lookup(&uid("alice")).await.is_some());
    }

    #[tokio::test]
    async fn test_explicit_leave() {
        // テスト項目: 接続 ID なしの退出は現在の接続を取り除く
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.room(RoomKind::Rating, RoomSettings::default()).await;
        let _rx = fixture.join("alice", "alice").await;
        let usecase = LeaveRoomUseCase::new(fixture.room_manager.clone());

        // when (操作):
        let left = usecase.execute(&uid("alice"), None).await;

        // then (期待する結果):
        assert_eq!(left, Some(room_id()));
        assert_eq!(fixture.room_manager.member_count(&room_id()).await.unwrap(), 0);
    }
}
