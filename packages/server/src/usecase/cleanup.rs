//! UseCase: 永続レコードの掃除
//!
//! 種別ごとの保持期間より長く非アクティブなレコードを削除する。
//! ライブルームはここでは閉じない。メンバーが残っていれば、次のフレームで
//! `error`（reload 付き）が配信される。

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::{
    config::RetentionPolicy,
    domain::{RepositoryError, RoomId, RoomKind, RoomRecordStore, Timestamp},
    infrastructure::room_manager::RoomManager,
};

const KINDS: [RoomKind; 3] = [RoomKind::Rating, RoomKind::Radio, RoomKind::Tournament];

/// レコード掃除のユースケース
pub struct SweepRecordsUseCase {
    store: Arc<dyn RoomRecordStore>,
    room_manager: Arc<RoomManager>,
    retention: RetentionPolicy,
}

impl SweepRecordsUseCase {
    pub fn new(
        store: Arc<dyn RoomRecordStore>,
        room_manager: Arc<RoomManager>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            store,
            room_manager,
            retention,
        }
    }

    /// 期限切れのレコードを削除し、削除したルーム ID を返す
    pub async fn execute(&self) -> Result<Vec<RoomId>, RepositoryError> {
        let now = self.room_manager.now();
        let mut removed = Vec::new();
        for kind in KINDS {
            let keep = i64::try_from(self.retention.for_kind(kind).as_millis()).unwrap_or(i64::MAX);
            let cutoff = Timestamp::new(now.value().saturating_sub(keep));
            let deleted = self.store.delete_inactive(kind, cutoff).await?;
            if !deleted.is_empty() {
                tracing::info!("Deleted {} inactive {} room record(s)", deleted.len(), kind);
            }
            removed.extend(deleted);
        }
        Ok(removed)
    }

    /// `interval` ごとに掃除する
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.execute().await {
                    tracing::error!("Record sweep failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{RoomRecord, RoomSettings},
        infrastructure::repository::InMemoryRoomRecordStore,
        usecase::test_support::{name, uid},
    };
    use syncrate_shared::time::ManualClock;

    const HOUR_MS: i64 = 60 * 60 * 1_000;

    fn record(id: &str, kind: RoomKind) -> RoomRecord {
        RoomRecord::new(
            RoomId::new(id.to_string()).unwrap(),
            kind,
            uid("creator"),
            name("creator"),
            RoomSettings::default(),
            Timestamp::new(0),
        )
    }

    #[tokio::test]
    async fn test_tournaments_outlive_radio_rooms() {
        // テスト項目: 30 時間後、ラジオ・レーティングは削除、トーナメントは残る
        // given (前提条件):
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(InMemoryRoomRecordStore::new());
        for (id, kind) in [
            ("RADIO1", RoomKind::Radio),
            ("RATE01", RoomKind::Rating),
            ("TOUR01", RoomKind::Tournament),
        ] {
            store.create(record(id, kind)).await.unwrap();
        }
        let usecase = SweepRecordsUseCase::new(
            store.clone(),
            Arc::new(RoomManager::new(clock.clone())),
            RetentionPolicy::default(),
        );
        clock.set(30 * HOUR_MS);

        // when (操作):
        let removed = usecase.execute().await.unwrap();

        // then (期待する結果):
        let removed: Vec<&str> = removed.iter().map(RoomId::as_str).collect();
        assert_eq!(removed, vec!["RATE01", "RADIO1"]);
        assert_eq!(store.len().await, 1);

        clock.set(49 * HOUR_MS);
        let removed = usecase.execute().await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.len().await, 0);
    }
}
