//! Room Manager
//!
//! ## 責務
//!
//! - ライブルームの生成・取得・削除
//! - 接続レジストリを通じたユーザーの入退室（1 ユーザー 1 ルーム）
//! - ルーム単位のブロードキャストと個別送信
//! - ルームごとの排他区間（`room_lock`）
//! - アイドルルームの掃除
//!
//! ## 設計ノート
//!
//! ルームとレジストリは 1 つの `RwLock` で守られる。ブロードキャストは読み取り側、
//! 入退室は書き込み側を取る。送信はノンブロッキングな unbounded チャンネルへの
//! push なので、ロック中に行っても待ちは発生しない。

pub mod registry;

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    domain::{
        DisplayName, Member, MessagePushError, PusherChannel, Room, RoomError, RoomId, RoomKind,
        Timestamp, UserId,
    },
    infrastructure::dto::{
        conversion,
        websocket::{Envelope, MessageKind},
    },
};
use registry::{Connection, ConnectionRegistry};
use syncrate_shared::time::Clock;

#[derive(Debug, Default)]
struct ManagerState {
    rooms: HashMap<RoomId, Room>,
    registry: ConnectionRegistry,
}

pub struct RoomManager {
    state: RwLock<ManagerState>,
    locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
    clock: Arc<dyn Clock>,
}

impl RoomManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(ManagerState::default()),
            locks: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// Allocate an empty live room. Returns the existing room if one is already loaded.
    pub async fn create_room(
        &self,
        room_id: RoomId,
        kind: RoomKind,
        creator_id: UserId,
        creator_name: DisplayName,
    ) -> Room {
        let now = self.now();
        let mut state = self.state.write().await;
        state
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                tracing::info!("Room '{}' ({}) created", room_id, kind);
                Room::new(room_id, kind, creator_id, creator_name, now)
            })
            .clone()
    }

    pub async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        self.state.read().await.rooms.get(room_id).cloned()
    }

    pub async fn list_rooms(&self) -> Vec<Room> {
        let state = self.state.read().await;
        let mut rooms: Vec<Room> = state.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    pub async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.registry.len()
    }

    /// Drop a live room and every connection in it. Member channels are closed.
    pub async fn delete_room(&self, room_id: &RoomId) -> bool {
        let removed = {
            let mut state = self.state.write().await;
            match state.rooms.remove(room_id) {
                Some(room) => {
                    for user_id in room.members.keys() {
                        if let Some(connection) = state.registry.remove(user_id) {
                            connection.channel.close();
                        }
                    }
                    true
                }
                None => false,
            }
        };
        if removed {
            self.locks.lock().await.remove(room_id);
            tracing::info!("Room '{}' deleted", room_id);
        }
        removed
    }

    /// Bind `user_id` to `room_id` through `channel`.
    ///
    /// A previous connection of the same user is closed first and its room is
    /// told about the departure. Returns the new connection id.
    pub async fn register(
        &self,
        user_id: UserId,
        display_name: DisplayName,
        room_id: RoomId,
        channel: PusherChannel,
    ) -> Result<Uuid, RoomError> {
        let now = self.now();
        let (connection_id, vacated) = {
            let mut state = self.state.write().await;
            if !state.rooms.contains_key(&room_id) {
                return Err(RoomError::RoomNotFound(room_id.to_string()));
            }

            let mut vacated = None;
            if let Some(previous) = state.registry.remove(&user_id) {
                previous.channel.close();
                if let Some(old_room) = state.rooms.get_mut(&previous.room_id) {
                    old_room.remove_member(&user_id, now);
                }
                if previous.room_id != room_id {
                    vacated = Some(previous.room_id);
                }
                tracing::info!(
                    "Replaced previous connection of '{}' (connection {})",
                    user_id,
                    previous.connection_id
                );
            }

            let connection = Connection::new(
                user_id.clone(),
                display_name.clone(),
                room_id.clone(),
                channel,
                now,
            );
            let connection_id = connection.connection_id;
            state.registry.insert(connection);

            let room = state
                .rooms
                .get_mut(&room_id)
                .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;
            room.add_member(
                Member {
                    user_id: user_id.clone(),
                    display_name,
                    joined_at: now,
                },
                now,
            );
            (connection_id, vacated)
        };

        tracing::info!("User '{}' joined room '{}'", user_id, room_id);
        if let Some(old_room) = vacated {
            self.broadcast_member_list(&old_room).await;
        }
        self.broadcast_member_list(&room_id).await;
        Ok(connection_id)
    }

    /// Remove the user's connection, if any. Returns the vacated room.
    pub async fn unregister(&self, user_id: &UserId) -> Option<RoomId> {
        let now = self.now();
        let removed = {
            let mut state = self.state.write().await;
            let removed = state.registry.remove(user_id);
            Self::leave_room_member(&mut state, removed.as_ref(), now);
            removed
        };
        self.detach(removed).await
    }

    /// Like [`unregister`](Self::unregister), but only while `connection_id` is still current.
    pub async fn unregister_connection(
        &self,
        user_id: &UserId,
        connection_id: Uuid,
    ) -> Option<RoomId> {
        let now = self.now();
        let removed = {
            let mut state = self.state.write().await;
            let removed = state.registry.remove_if_current(user_id, connection_id);
            Self::leave_room_member(&mut state, removed.as_ref(), now);
            removed
        };
        if removed.is_none() {
            tracing::debug!(
                "Connection {} of '{}' is no longer current, nothing to remove",
                connection_id,
                user_id
            );
        }
        self.detach(removed).await
    }

    /// Drop the member entry of a connection just taken out of the registry.
    /// Runs in the same write section as the registry removal.
    fn leave_room_member(state: &mut ManagerState, removed: Option<&Connection>, now: Timestamp) {
        if let Some(connection) = removed
            && let Some(room) = state.rooms.get_mut(&connection.room_id)
        {
            room.remove_member(&connection.user_id, now);
        }
    }

    /// Close a detached connection and tell its room.
    async fn detach(&self, removed: Option<Connection>) -> Option<RoomId> {
        let connection = removed?;
        connection.channel.close();
        tracing::info!(
            "User '{}' left room '{}'",
            connection.user_id,
            connection.room_id
        );
        self.broadcast_member_list(&connection.room_id).await;
        Some(connection.room_id)
    }

    pub async fn lookup(&self, user_id: &UserId) -> Option<Connection> {
        self.state.read().await.registry.get(user_id).cloned()
    }

    /// Refresh the user's `last_seen_at` and the activity of their room.
    pub async fn touch(&self, user_id: &UserId) {
        let now = self.now();
        let mut state = self.state.write().await;
        if !state.registry.touch(user_id, now) {
            return;
        }
        let Some(room_id) = state.registry.get(user_id).map(|c| c.room_id.clone()) else {
            return;
        };
        if let Some(room) = state.rooms.get_mut(&room_id) {
            room.touch(now);
        }
    }

    pub async fn member_count(&self, room_id: &RoomId) -> Result<usize, RoomError> {
        let state = self.state.read().await;
        state
            .rooms
            .get(room_id)
            .map(Room::member_count)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))
    }

    /// Members ordered by display name.
    pub async fn members(&self, room_id: &RoomId) -> Result<Vec<Member>, RoomError> {
        let state = self.state.read().await;
        state
            .rooms
            .get(room_id)
            .map(|room| room.sorted_members().into_iter().cloned().collect())
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))
    }

    /// Mutate a live room and mark it active.
    pub async fn update_room<T>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&mut Room) -> T,
    ) -> Result<T, RoomError> {
        let now = self.now();
        let mut state = self.state.write().await;
        let room = state
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;
        let result = f(room);
        room.touch(now);
        Ok(result)
    }

    /// Per-room critical section for load, mutate and persist sequences.
    pub async fn room_lock(&self, room_id: &RoomId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(room_id.clone())
            .or_default()
            .clone()
    }

    /// Encode once and push to every member. Returns how many members received it.
    ///
    /// A failed push is logged and skipped.
    pub async fn broadcast_to_room(
        &self,
        room_id: &RoomId,
        envelope: &Envelope,
    ) -> Result<usize, RoomError> {
        let text = envelope
            .encode()
            .map_err(|e| RoomError::Encode(room_id.to_string(), e.to_string()))?;

        let state = self.state.read().await;
        let room = state
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;

        let mut delivered = 0;
        for user_id in room.members.keys() {
            let Some(connection) = state.registry.get(user_id) else {
                tracing::warn!("Member '{}' has no connection, skipping", user_id);
                continue;
            };
            match connection.channel.push(&text) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(
                    "Failed to push {} to '{}' in room '{}': {}",
                    envelope.kind,
                    user_id,
                    room_id,
                    e
                ),
            }
        }
        tracing::debug!(
            "Broadcast {} to {}/{} members of room '{}'",
            envelope.kind,
            delivered,
            room.member_count(),
            room_id
        );
        Ok(delivered)
    }

    pub async fn send_to_user(
        &self,
        user_id: &UserId,
        envelope: &Envelope,
    ) -> Result<(), MessagePushError> {
        let text = envelope
            .encode()
            .map_err(|e| MessagePushError::ChannelWriteFailure(e.to_string()))?;
        let state = self.state.read().await;
        let connection = state
            .registry
            .get(user_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(user_id.to_string()))?;
        connection.channel.push(&text)
    }

    async fn broadcast_member_list(&self, room_id: &RoomId) {
        let members = match self.members(room_id).await {
            Ok(members) => members,
            Err(_) => return,
        };
        let payload = conversion::user_update(&members);
        let envelope = match Envelope::with_payload(
            MessageKind::UserListUpdate,
            &payload,
            self.now().value(),
        ) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!("Failed to build member list for '{}': {}", room_id, e);
                return;
            }
        };
        if let Err(e) = self.broadcast_to_room(room_id, &envelope).await {
            tracing::warn!("Failed to broadcast member list to '{}': {}", room_id, e);
        }
    }

    /// Delete empty rooms idle for longer than `threshold`. Returns the removed ids.
    pub async fn cleanup_idle_rooms(&self, threshold: Duration) -> Vec<RoomId> {
        let now = self.now();
        let threshold_millis = i64::try_from(threshold.as_millis()).unwrap_or(i64::MAX);
        let removed: Vec<RoomId> = {
            let mut state = self.state.write().await;
            let idle: Vec<RoomId> = state
                .rooms
                .values()
                .filter(|room| room.is_idle(now, threshold_millis))
                .map(|room| room.id.clone())
                .collect();
            for room_id in &idle {
                state.rooms.remove(room_id);
            }
            idle
        };

        if !removed.is_empty() {
            let mut locks = self.locks.lock().await;
            for room_id in &removed {
                locks.remove(room_id);
            }
            tracing::info!("Removed {} idle room(s): {:?}", removed.len(), removed);
        }
        removed
    }

    /// Run [`cleanup_idle_rooms`](Self::cleanup_idle_rooms) every `interval`.
    pub fn spawn_idle_sweeper(
        self: Arc<Self>,
        interval: Duration,
        threshold: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.cleanup_idle_rooms(threshold).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::OutboundFrame,
        infrastructure::dto::websocket::{UserUpdateData, VideoSyncData},
    };
    use syncrate_shared::time::ManualClock;
    use tokio::sync::mpsc::UnboundedReceiver;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 入退室とメンバー一覧のブロードキャスト
    // - 1 ユーザー 1 ルームの保証（別ルームへの移動・再接続）
    // - ブロードキャストの部分失敗の許容
    // - アイドルルームの掃除
    // ========================================

    fn manager() -> (RoomManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (RoomManager::new(clock.clone()), clock)
    }

    fn uid(s: &str) -> UserId {
        UserId::new(s.to_string()).unwrap()
    }

    fn name(s: &str) -> DisplayName {
        DisplayName::new(s.to_string()).unwrap()
    }

    fn rid(s: &str) -> RoomId {
        RoomId::new(s.to_string()).unwrap()
    }

    async fn create(manager: &RoomManager, room: &str) {
        manager
            .create_room(rid(room), RoomKind::Rating, uid("creator"), name("creator"))
            .await;
    }

    async fn join(
        manager: &RoomManager,
        user: &str,
        room: &str,
    ) -> (Uuid, UnboundedReceiver<OutboundFrame>) {
        let (channel, rx) = PusherChannel::new();
        let id = manager
            .register(uid(user), name(user), rid(room), channel)
            .await
            .unwrap();
        (id, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<OutboundFrame>) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn last_user_list(frames: &[OutboundFrame]) -> Vec<String> {
        frames
            .iter()
            .rev()
            .find_map(|frame| match frame {
                OutboundFrame::Text(text) => {
                    let envelope = Envelope::decode(text).ok()?;
                    (envelope.kind == MessageKind::UserListUpdate)
                        .then(|| envelope.payload::<UserUpdateData>().ok())
                        .flatten()
                }
                OutboundFrame::Close => None,
            })
            .map(|data| data.users.into_iter().map(|u| u.username).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_register_into_missing_room_fails() {
        // テスト項目: 存在しないルームへの登録は RoomNotFound
        // given (前提条件):
        let (manager, _clock) = manager();
        let (channel, _rx) = PusherChannel::new();

        // when (操作):
        let result = manager
            .register(uid("alice"), name("alice"), rid("NOROOM"), channel)
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RoomError::RoomNotFound("NOROOM".to_string())));
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_two_users_see_each_other_in_member_list() {
        // テスト項目: AB12CD に alice と bob が入ると両者に 2 人のメンバー一覧が届く
        // given (前提条件):
        let (manager, _clock) = manager();
        create(&manager, "AB12CD").await;

        // when (操作):
        let (_, mut alice_rx) = join(&manager, "alice", "AB12CD").await;
        let (_, mut bob_rx) = join(&manager, "bob", "AB12CD").await;

        // then (期待する結果):
        assert_eq!(last_user_list(&drain(&mut alice_rx)), vec!["alice", "bob"]);
        assert_eq!(last_user_list(&drain(&mut bob_rx)), vec!["alice", "bob"]);
        assert_eq!(manager.member_count(&rid("AB12CD")).await, Ok(2));
    }

    #[tokio::test]
    async fn test_joining_another_room_leaves_the_first() {
        // テスト項目: 別ルームに入ると元のルームから抜け、元のルームに通知される
        // given (前提条件):
        let (manager, _clock) = manager();
        create(&manager, "AAAAAA").await;
        create(&manager, "BBBBBB").await;
        let (_, mut first_rx) = join(&manager, "alice", "AAAAAA").await;
        let (_, mut bob_rx) = join(&manager, "bob", "AAAAAA").await;
        drain(&mut first_rx);
        drain(&mut bob_rx);

        // when (操作):
        let (_, mut second_rx) = join(&manager, "alice", "BBBBBB").await;

        // then (期待する結果):
        assert_eq!(manager.member_count(&rid("AAAAAA")).await, Ok(1));
        assert_eq!(manager.member_count(&rid("BBBBBB")).await, Ok(1));
        assert_eq!(last_user_list(&drain(&mut bob_rx)), vec!["bob"]);
        assert_eq!(drain(&mut first_rx), vec![OutboundFrame::Close]);
        assert_eq!(last_user_list(&drain(&mut second_rx)), vec!["alice"]);
        let connection = manager.lookup(&uid("alice")).await.unwrap();
        assert_eq!(connection.room_id, rid("BBBBBB"));
    }

    #[tokio::test]
    async fn test_stale_unregister_keeps_new_connection() {
        // テスト項目: 置き換えられた古い接続の unregister は新しい接続を残す
        // given (前提条件):
        let (manager, _clock) = manager();
        create(&manager, "AB12CD").await;
        let (old_id, _old_rx) = join(&manager, "alice", "AB12CD").await;
        let (new_id, _new_rx) = join(&manager, "alice", "AB12CD").await;

        // when (操作):
        let vacated = manager.unregister_connection(&uid("alice"), old_id).await;

        // then (期待する結果):
        assert!(vacated.is_none());
        let connection = manager.lookup(&uid("alice")).await.unwrap();
        assert_eq!(connection.connection_id, new_id);
        assert_eq!(manager.member_count(&rid("AB12CD")).await, Ok(1));
    }

    #[tokio::test]
    async fn test_rejoin_queued_behind_leave_stays_in_member_list() {
        // テスト項目: 退出の直後に同じユーザーが再参加しても、レジストリとメンバー一覧が一致する
        // given (前提条件): 読み取りロックを保持し、unregister → register の順で書き込みを待たせる
        let (manager, _clock) = manager();
        let manager = Arc::new(manager);
        create(&manager, "AB12CD").await;
        let (_, _old_rx) = join(&manager, "alice", "AB12CD").await;

        let guard = manager.state.read().await;
        let leaving = tokio::spawn({
            let manager = manager.clone();
            async move { manager.unregister(&uid("alice")).await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let rejoining = tokio::spawn({
            let manager = manager.clone();
            async move {
                let (channel, rx) = PusherChannel::new();
                let id = manager
                    .register(uid("alice"), name("alice"), rid("AB12CD"), channel)
                    .await;
                (id, rx)
            }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        // when (操作): ロックを解放して両方を走らせる
        drop(guard);
        leaving.await.unwrap();
        let (new_id, _new_rx) = rejoining.await.unwrap();

        // then (期待する結果):
        let connection = manager.lookup(&uid("alice")).await.unwrap();
        assert_eq!(connection.connection_id, new_id.unwrap());
        let members = manager.members(&rid("AB12CD")).await.unwrap();
        assert!(members.iter().any(|m| m.user_id == uid("alice")));
        assert_eq!(manager.member_count(&rid("AB12CD")).await, Ok(1));
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        // テスト項目: unregister は 2 回目以降なにもしない
        // given (前提条件):
        let (manager, _clock) = manager();
        create(&manager, "AB12CD").await;
        let (_, mut rx) = join(&manager, "alice", "AB12CD").await;

        // when (操作):
        let first = manager.unregister(&uid("alice")).await;
        let second = manager.unregister(&uid("alice")).await;

        // then (期待する結果):
        assert_eq!(first, Some(rid("AB12CD")));
        assert_eq!(second, None);
        assert!(drain(&mut rx).contains(&OutboundFrame::Close));
        assert_eq!(manager.member_count(&rid("AB12CD")).await, Ok(0));
    }

    #[tokio::test]
    async fn test_broadcast_skips_failed_member() {
        // テスト項目: 1 人への送信失敗があっても他のメンバーには届く
        // given (前提条件):
        let (manager, _clock) = manager();
        create(&manager, "AB12CD").await;
        let (_, alice_rx) = join(&manager, "alice", "AB12CD").await;
        let (_, mut bob_rx) = join(&manager, "bob", "AB12CD").await;
        drop(alice_rx);
        drain(&mut bob_rx);
        let envelope = Envelope::with_payload(
            MessageKind::VideoSync,
            &VideoSyncData {
                time: 3.0,
                is_playing: true,
            },
            1,
        )
        .unwrap();

        // when (操作):
        let delivered = manager.broadcast_to_room(&rid("AB12CD"), &envelope).await;

        // then (期待する結果):
        assert_eq!(delivered, Ok(1));
        let frames = drain(&mut bob_rx);
        assert_eq!(frames.len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_to_missing_room_fails() {
        // テスト項目: 存在しないルームへのブロードキャストは RoomNotFound
        // given (前提条件):
        let (manager, _clock) = manager();
        let envelope = Envelope::new(MessageKind::NavigateMatch, serde_json::Value::Null, 0);

        // when (操作):
        let result = manager.broadcast_to_room(&rid("NOROOM"), &envelope).await;

        // then (期待する結果):
        assert_eq!(result, Err(RoomError::RoomNotFound("NOROOM".to_string())));
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_empty_idle_rooms() {
        // テスト項目: 空かつ閾値を超えたルームだけが掃除される
        // given (前提条件):
        let (manager, clock) = manager();
        create(&manager, "EMPTY1").await;
        create(&manager, "BUSY01").await;
        let (_, _rx) = join(&manager, "alice", "BUSY01").await;

        // when (操作):
        clock.advance(5_000);
        let early = manager.cleanup_idle_rooms(Duration::from_secs(10)).await;
        clock.advance(6_000);
        let late = manager.cleanup_idle_rooms(Duration::from_secs(10)).await;

        // then (期待する結果):
        assert!(early.is_empty());
        assert_eq!(late, vec![rid("EMPTY1")]);
        assert!(manager.get_room(&rid("BUSY01")).await.is_some());
    }

    #[tokio::test]
    async fn test_room_lock_is_shared_per_room() {
        // テスト項目: 同じルームには同じロックが返る
        // given (前提条件):
        let (manager, _clock) = manager();

        // when (操作):
        let a1 = manager.room_lock(&rid("AAAAAA")).await;
        let a2 = manager.room_lock(&rid("AAAAAA")).await;
        let b = manager.room_lock(&rid("BBBBBB")).await;

        // then (期待する結果):
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[tokio::test]
    async fn test_update_room_marks_activity() {
        // テスト項目: update_room は変更を適用して最終アクティビティを更新する
        // given (前提条件):
        let (manager, clock) = manager();
        create(&manager, "AB12CD").await;
        clock.advance(500);

        // when (操作):
        manager
            .update_room(&rid("AB12CD"), |room| {
                room.playback.position = 42.0;
                room.playback.is_playing = true;
            })
            .await
            .unwrap();

        // then (期待する結果):
        let room = manager.get_room(&rid("AB12CD")).await.unwrap();
        assert_eq!(room.playback.position, 42.0);
        assert_eq!(room.last_activity_at, Timestamp::new(1_500));
    }

    #[tokio::test]
    async fn test_delete_room_closes_member_channels() {
        // テスト項目: ルーム削除でメンバーの接続が閉じられる
        // given (前提条件):
        let (manager, _clock) = manager();
        create(&manager, "AB12CD").await;
        let (_, mut rx) = join(&manager, "alice", "AB12CD").await;

        // when (操作):
        let deleted = manager.delete_room(&rid("AB12CD")).await;

        // then (期待する結果):
        assert!(deleted);
        assert!(drain(&mut rx).contains(&OutboundFrame::Close));
        assert!(manager.lookup(&uid("alice")).await.is_none());
    }
}
