//! InMemory Room Record Store 実装
//!
//! ドメイン層が定義する `RoomRecordStore` trait の具体的な実装。
//! ルームレコードを HashMap に保持します。ブラケットは `tree_blob` の
//! 文字列としてそのまま保存され、ストアは中身を解釈しません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, RoomId, RoomKind, RoomRecord, RoomRecordStore, Timestamp};

/// インメモリのルームレコードストア
#[derive(Default)]
pub struct InMemoryRoomRecordStore {
    records: Mutex<HashMap<RoomId, RoomRecord>>,
}

impl InMemoryRoomRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl RoomRecordStore for InMemoryRoomRecordStore {
    async fn create(&self, record: RoomRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.room_id) {
            return Err(RepositoryError::RoomAlreadyExists(
                record.room_id.to_string(),
            ));
        }
        records.insert(record.room_id.clone(), record);
        Ok(())
    }

    async fn load(&self, room_id: &RoomId) -> Result<Option<RoomRecord>, RepositoryError> {
        Ok(self.records.lock().await.get(room_id).cloned())
    }

    async fn save(&self, record: RoomRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().await;
        match records.get_mut(&record.room_id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RepositoryError::RoomNotFound(record.room_id.to_string())),
        }
    }

    async fn delete(&self, room_id: &RoomId) -> Result<(), RepositoryError> {
        self.records.lock().await.remove(room_id);
        Ok(())
    }

    async fn touch(&self, room_id: &RoomId, now: Timestamp) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
        if now > record.last_active_at {
            record.last_active_at = now;
        }
        Ok(())
    }

    async fn delete_inactive(
        &self,
        kind: RoomKind,
        cutoff: Timestamp,
    ) -> Result<Vec<RoomId>, RepositoryError> {
        let mut records = self.records.lock().await;
        let mut stale: Vec<RoomId> = records
            .values()
            .filter(|r| r.kind == kind && r.last_active_at < cutoff)
            .map(|r| r.room_id.clone())
            .collect();
        stale.sort();
        for room_id in &stale {
            records.remove(room_id);
        }
        Ok(stale)
    }
}
