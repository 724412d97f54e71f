//! UseCase: ルーム作成
//!
//! 1. 未使用のルームコードを採番（衝突したら再試行）
//! 2. トーナメントなら楽曲を選んでブラケットを構築（状態は `setup`）
//! 3. レコードを保存し、ライブルームを用意する
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 種別ごとのレコード内容（ブラケット、ビデオ同期）
//! - ブラケットサイズの検証と候補不足

use std::sync::Arc;

use super::{
    error::CreateRoomError,
    join_room::ensure_live_room,
    song_selection::TournamentSongSelector,
};
use crate::{
    domain::{
        BracketSize, DisplayName, MatchSong, RandomSource, RepositoryError, RoomIdFactory,
        RoomKind, RoomRecord, RoomRecordStore, RoomSettings, SongCatalog, TreeState, UserId,
    },
    infrastructure::room_manager::RoomManager,
};

/// コード採番の再試行回数
const MAX_ID_ATTEMPTS: usize = 16;

/// トーナメントの既定サイズ
pub const DEFAULT_TREE_SIZE: usize = 16;

/// ルーム作成の入力
#[derive(Debug, Clone)]
pub struct CreateRoomCommand {
    pub kind: RoomKind,
    pub creator_id: UserId,
    pub creator_name: DisplayName,
    pub settings: RoomSettings,
}

/// ルーム作成のユースケース
pub struct CreateRoomUseCase {
    catalog: Arc<dyn SongCatalog>,
    store: Arc<dyn RoomRecordStore>,
    room_manager: Arc<RoomManager>,
    random: Arc<RandomSource>,
    selector: TournamentSongSelector,
}

impl CreateRoomUseCase {
    pub fn new(
        catalog: Arc<dyn SongCatalog>,
        store: Arc<dyn RoomRecordStore>,
        room_manager: Arc<RoomManager>,
        random: Arc<RandomSource>,
    ) -> Self {
        Self {
            selector: TournamentSongSelector::new(catalog.clone(), random.clone()),
            catalog,
            store,
            room_manager,
            random,
        }
    }

    /// ルームを作成する
    ///
    /// # Returns
    ///
    /// * `Ok(RoomRecord)` - 保存されたレコード
    /// * `Err(CreateRoomError)` - サイズ不正・候補不足・ストアエラー
    pub async fn execute(&self, command: CreateRoomCommand) -> Result<RoomRecord, CreateRoomError> {
        let CreateRoomCommand {
            kind,
            creator_id,
            creator_name,
            mut settings,
        } = command;
        if kind == RoomKind::Radio {
            settings.video_sync_enabled = true;
        }

        let tree_blob = match kind {
            RoomKind::Tournament => Some(self.build_bracket(&creator_id, &mut settings).await?),
            RoomKind::Rating | RoomKind::Radio => None,
        };

        let now = self.room_manager.now();
        for _ in 0..MAX_ID_ATTEMPTS {
            let room_id = self.random.with_rng(|rng| RoomIdFactory::generate_with(rng));
            if self.store.load(&room_id).await?.is_some() {
                continue;
            }
            let mut record = RoomRecord::new(
                room_id.clone(),
                kind,
                creator_id.clone(),
                creator_name.clone(),
                settings.clone(),
                now,
            );
            record.tree_blob = tree_blob.clone();

            match self.store.create(record.clone()).await {
                Ok(()) => {}
                Err(RepositoryError::RoomAlreadyExists(_)) => continue,
                Err(e) => return Err(e.into()),
            }
            ensure_live_room(&self.room_manager, &record).await;
            tracing::info!(
                "'{}' created {} room '{}'",
                creator_name,
                kind,
                record.room_id
            );
            return Ok(record);
        }
        Err(CreateRoomError::RoomIdExhausted)
    }

    async fn build_bracket(
        &self,
        creator_id: &UserId,
        settings: &mut RoomSettings,
    ) -> Result<String, CreateRoomError> {
        let size = BracketSize::new(settings.tree_size.unwrap_or(DEFAULT_TREE_SIZE))?;
        settings.tree_size = Some(size.value());

        let songs = self
            .selector
            .select(creator_id, settings, size.value())
            .await?;
        let mut entries = Vec::with_capacity(songs.len());
        for song in &songs {
            let rating = self.catalog.get_average_rating(song.id).await?.unwrap_or(0.0);
            entries.push(MatchSong::from_song(song, rating));
        }

        let tree = self
            .random
            .with_rng(|rng| TreeState::build(entries, size, rng))?;
        tracing::debug!(
            "Built a {}-song bracket with {} matches",
            size.value(),
            tree.total_matches()
        );
        Ok(tree.to_json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{BracketError, TournamentStatus},
        infrastructure::repository::{InMemoryRoomRecordStore, InMemorySongCatalog},
        usecase::{
            song_selection::SelectionError,
            test_support::{name, song, uid},
        },
    };
    use syncrate_shared::time::FixedClock;

    fn usecase(song_count: u32) -> (CreateRoomUseCase, Arc<InMemoryRoomRecordStore>, Arc<RoomManager>) {
        let catalog = Arc::new(InMemorySongCatalog::new((1..=song_count).map(song).collect()));
        let store = Arc::new(InMemoryRoomRecordStore::new());
        let room_manager = Arc::new(RoomManager::new(Arc::new(FixedClock::new(5_000))));
        let usecase = CreateRoomUseCase::new(
            catalog,
            store.clone(),
            room_manager.clone(),
            Arc::new(RandomSource::seeded(42)),
        );
        (usecase, store, room_manager)
    }

    fn command(kind: RoomKind, settings: RoomSettings) -> CreateRoomCommand {
        CreateRoomCommand {
            kind,
            creator_id: uid("creator"),
            creator_name: name("creator"),
            settings,
        }
    }

    #[tokio::test]
    async fn test_create_rating_room() {
        // テスト項目: レーティングルームはブラケットなしで保存され、ライブルームも用意される
        // given (前提条件):
        let (usecase, store, room_manager) = usecase(4);

        // when (操作):
        let record = usecase
            .execute(command(RoomKind::Rating, RoomSettings::default()))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(record.tree_blob.is_none());
        assert_eq!(record.room_id.as_str().len(), 6);
        assert_eq!(store.load(&record.room_id).await.unwrap(), Some(record.clone()));
        assert!(room_manager.get_room(&record.room_id).await.is_some());
    }

    #[tokio::test]
    async fn test_radio_room_always_syncs_video() {
        // テスト項目: ラジオルームのビデオ同期は常に有効
        // given (前提条件):
        let (usecase, _, room_manager) = usecase(4);
        let settings = RoomSettings {
            video_sync_enabled: false,
            ..RoomSettings::default()
        };

        // when (操作):
        let record = usecase
            .execute(command(RoomKind::Radio, settings))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(record.settings.video_sync_enabled);
        let live = room_manager.get_room(&record.room_id).await.unwrap();
        assert!(live.video_sync_enabled);
    }

    #[tokio::test]
    async fn test_create_tournament_builds_bracket() {
        // テスト項目: トーナメントは既定 16 曲のブラケットを setup 状態で保存する
        // given (前提条件):
        let (usecase, _, _) = usecase(20);

        // when (操作):
        let record = usecase
            .execute(command(RoomKind::Tournament, RoomSettings::default()))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(record.tournament_status, TournamentStatus::Setup);
        assert_eq!(record.settings.tree_size, Some(16));
        let tree = TreeState::from_json(record.tree_blob.as_deref().unwrap()).unwrap();
        assert_eq!(tree.rounds.len(), 4);
        assert_eq!(tree.total_matches(), 15);
        assert_eq!(tree.song_ids().len(), 16);
    }

    #[tokio::test]
    async fn test_invalid_tree_size() {
        // テスト項目: 8/16/32/64/128 以外のサイズは拒否
        // given (前提条件):
        let (usecase, store, _) = usecase(20);
        let settings = RoomSettings {
            tree_size: Some(12),
            ..RoomSettings::default()
        };

        // when (操作):
        let result = usecase.execute(command(RoomKind::Tournament, settings)).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(CreateRoomError::Bracket(BracketError::InvalidBracketSize(12)))
        ));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_insufficient_candidates() {
        // テスト項目: 候補が足りなければ作成されない
        // given (前提条件):
        let (usecase, store, _) = usecase(6);
        let settings = RoomSettings {
            tree_size: Some(8),
            ..RoomSettings::default()
        };

        // when (操作):
        let result = usecase.execute(command(RoomKind::Tournament, settings)).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(CreateRoomError::Selection(SelectionError::Bracket(
                BracketError::InsufficientCandidates { needed: 8, found: 6 }
            )))
        ));
        assert_eq!(store.len().await, 0);
    }
}
