//! UseCase: トーナメントの楽曲選択
//!
//! 作成者の投票状況に応じて候補を選ぶ。
//!
//! - `voted_only`: 作成者が投票済みの曲を優先し、足りなければ未投票曲で埋める
//! - `voted_ratio` (0 < r < 1): `floor(size * r)` 曲を投票済みから、残りを未投票から選び、
//!   それでも足りなければ残りの候補で埋める
//! - どちらもなければ候補全体から無作為に選ぶ

use std::{collections::HashSet, sync::Arc};

use crate::domain::{
    BracketError, RandomSource, RepositoryError, RoomKind, RoomSettings, Song, SongCatalog,
    SongId, UserId,
};

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error(transparent)]
    Bracket(#[from] BracketError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// トーナメント用の楽曲選択
pub struct TournamentSongSelector {
    catalog: Arc<dyn SongCatalog>,
    random: Arc<RandomSource>,
}

impl TournamentSongSelector {
    pub fn new(catalog: Arc<dyn SongCatalog>, random: Arc<RandomSource>) -> Self {
        Self { catalog, random }
    }

    /// `size` 曲を選ぶ。候補が足りなければ `InsufficientCandidates`。
    pub async fn select(
        &self,
        creator_id: &UserId,
        settings: &RoomSettings,
        size: usize,
    ) -> Result<Vec<Song>, SelectionError> {
        let mut candidates = self
            .catalog
            .list_candidate_songs(&settings.song_filter(RoomKind::Tournament))
            .await?;
        if candidates.len() < size {
            return Err(BracketError::InsufficientCandidates {
                needed: size,
                found: candidates.len(),
            }
            .into());
        }
        self.random.shuffle(&mut candidates);

        let ratio = settings.voted_ratio.filter(|r| *r > 0.0 && *r < 1.0);
        if !settings.voted_only && ratio.is_none() {
            candidates.truncate(size);
            return Ok(candidates);
        }

        let voted: HashSet<SongId> = self
            .catalog
            .votes_by_users(std::slice::from_ref(creator_id))
            .await?
            .into_iter()
            .map(|v| v.song_id)
            .collect();
        let (voted_songs, unvoted_songs): (Vec<Song>, Vec<Song>) = candidates
            .into_iter()
            .partition(|song| voted.contains(&song.id));

        let voted_quota = match ratio {
            Some(r) if !settings.voted_only => (size as f64 * r).floor() as usize,
            _ => size,
        };

        let mut selected: Vec<Song> = voted_songs.iter().take(voted_quota).cloned().collect();
        let unvoted_quota = size - selected.len().min(size);
        selected.extend(unvoted_songs.iter().take(unvoted_quota).cloned());

        if selected.len() < size {
            let chosen: HashSet<SongId> = selected.iter().map(|s| s.id).collect();
            let remaining = size - selected.len();
            selected.extend(
                voted_songs
                    .into_iter()
                    .chain(unvoted_songs)
                    .filter(|s| !chosen.contains(&s.id))
                    .take(remaining),
            );
        }

        tracing::debug!(
            "Selected {} songs for a tournament ({} voted by creator)",
            selected.len(),
            selected.iter().filter(|s| voted.contains(&s.id)).count()
        );
        Ok(selected)
    }
}
