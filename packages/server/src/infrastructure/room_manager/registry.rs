//! Connection registry.
//!
//! ## 責務
//!
//! - ユーザー ID と現在の接続（チャンネル・所属ルーム）の対応を保持
//! - 1 ユーザーにつき同時に 1 接続だけを保持する
//!
//! ロックは持たない。`RoomManager` が自身の `RwLock` の内側で操作する。

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::{DisplayName, PusherChannel, RoomId, Timestamp, UserId};

/// A user's live connection.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Distinguishes a reconnect from a superseded connection of the same user.
    pub connection_id: Uuid,
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub room_id: RoomId,
    pub channel: PusherChannel,
    pub connected_at: Timestamp,
    pub last_seen_at: Timestamp,
}

impl Connection {
    pub fn new(
        user_id: UserId,
        display_name: DisplayName,
        room_id: RoomId,
        channel: PusherChannel,
        now: Timestamp,
    ) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            user_id,
            display_name,
            room_id,
            channel,
            connected_at: now,
            last_seen_at: now,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<UserId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection, returning the one it replaced.
    pub fn insert(&mut self, connection: Connection) -> Option<Connection> {
        self.connections
            .insert(connection.user_id.clone(), connection)
    }

    pub fn remove(&mut self, user_id: &UserId) -> Option<Connection> {
        self.connections.remove(user_id)
    }

    /// Remove only if the registered connection is still `connection_id`.
    pub fn remove_if_current(
        &mut self,
        user_id: &UserId,
        connection_id: Uuid,
    ) -> Option<Connection> {
        match self.connections.get(user_id) {
            Some(current) if current.connection_id == connection_id => {
                self.connections.remove(user_id)
            }
            _ => None,
        }
    }

    pub fn get(&self, user_id: &UserId) -> Option<&Connection> {
        self.connections.get(user_id)
    }

    pub fn touch(&mut self, user_id: &UserId, now: Timestamp) -> bool {
        match self.connections.get_mut(user_id) {
            Some(connection) => {
                connection.last_seen_at = now;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
