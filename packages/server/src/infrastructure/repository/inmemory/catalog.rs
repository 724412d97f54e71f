//! InMemory Song Catalog 実装
//!
//! ドメイン層が定義する `SongCatalog` trait の具体的な実装。
//! 楽曲と投票を HashMap に保持し、JSON のシードファイルから読み込めます。
//!
//! ## シード形式
//!
//! ```json
//! {
//!   "songs": [{"id": 1, "title": "...", "source_url": "...", "artists": ["..."]}],
//!   "votes": [{"user_id": "u1", "display_name": "alice", "song_id": 1, "rating": 8}]
//! }
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::{
    CoverPolicy, DisplayName, RepositoryError, Song, SongCatalog, SongFilter, SongId, UserId,
    Vote,
};

#[derive(Debug, Deserialize)]
struct CatalogSeed {
    songs: Vec<Song>,
    #[serde(default)]
    votes: Vec<SeedVote>,
}

#[derive(Debug, Deserialize)]
struct SeedVote {
    user_id: String,
    #[serde(default)]
    display_name: Option<String>,
    song_id: u32,
    rating: i64,
    #[serde(default)]
    comment: String,
}

impl SeedVote {
    fn into_vote(self) -> Result<Vote, RepositoryError> {
        let invalid = |e: crate::domain::ValueObjectError| RepositoryError::Storage(e.to_string());
        let display_name = self.display_name.unwrap_or_else(|| self.user_id.clone());
        Vote::new(
            UserId::new(self.user_id).map_err(invalid)?,
            DisplayName::new(display_name).map_err(invalid)?,
            SongId::new(self.song_id),
            self.rating,
            self.comment,
        )
        .map_err(invalid)
    }
}

/// インメモリ楽曲カタログ
pub struct InMemorySongCatalog {
    songs: RwLock<BTreeMap<SongId, Song>>,
    /// Key: (song, user)
    votes: RwLock<HashMap<(SongId, UserId), Vote>>,
}

impl InMemorySongCatalog {
    pub fn new(songs: Vec<Song>) -> Self {
        Self {
            songs: RwLock::new(songs.into_iter().map(|s| (s.id, s)).collect()),
            votes: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_votes(songs: Vec<Song>, votes: Vec<Vote>) -> Self {
        let catalog = Self::new(songs);
        let votes = votes
            .into_iter()
            .map(|v| ((v.song_id, v.user_id.clone()), v))
            .collect();
        Self {
            votes: RwLock::new(votes),
            ..catalog
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, RepositoryError> {
        let seed: CatalogSeed =
            serde_json::from_str(json).map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let votes = seed
            .votes
            .into_iter()
            .map(SeedVote::into_vote)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_votes(seed.songs, votes))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RepositoryError::Storage(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_json_str(&json)?;
        tracing::info!(
            "Loaded {} songs from '{}'",
            catalog.songs.read().await.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub async fn song_count(&self) -> usize {
        self.songs.read().await.len()
    }

    fn averages(votes: &HashMap<(SongId, UserId), Vote>) -> HashMap<SongId, f64> {
        let mut sums: HashMap<SongId, (u32, u32)> = HashMap::new();
        for vote in votes.values() {
            let entry = sums.entry(vote.song_id).or_default();
            entry.0 += u32::from(vote.rating);
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(id, (sum, count))| (id, f64::from(sum) / f64::from(count)))
            .collect()
    }
}

#[async_trait]
impl SongCatalog for InMemorySongCatalog {
    async fn get_song(&self, song_id: SongId) -> Result<Song, RepositoryError> {
        self.songs
            .read()
            .await
            .get(&song_id)
            .cloned()
            .ok_or(RepositoryError::SongNotFound(song_id.value()))
    }

    async fn list_candidate_songs(
        &self,
        filter: &SongFilter,
    ) -> Result<Vec<Song>, RepositoryError> {
        let averages = match filter.min_average_rating {
            Some(_) => Self::averages(&*self.votes.read().await),
            None => HashMap::new(),
        };
        let songs = self.songs.read().await;
        Ok(songs
            .values()
            .filter(|song| filter.category_id.is_none_or(|c| song.category_id == Some(c)))
            .filter(|song| match filter.covers {
                CoverPolicy::Any => true,
                CoverPolicy::Only => song.is_cover,
                CoverPolicy::Exclude => !song.is_cover,
            })
            .filter(|song| {
                filter
                    .min_average_rating
                    .is_none_or(|min| averages.get(&song.id).is_some_and(|avg| *avg >= min))
            })
            .filter(|song| !filter.exclude.contains(&song.id))
            .cloned()
            .collect())
    }

    async fn get_average_rating(&self, song_id: SongId) -> Result<Option<f64>, RepositoryError> {
        let votes = self.votes.read().await;
        let ratings: Vec<f64> = votes
            .values()
            .filter(|v| v.song_id == song_id)
            .map(|v| f64::from(v.rating))
            .collect();
        if ratings.is_empty() {
            return Ok(None);
        }
        Ok(Some(ratings.iter().sum::<f64>() / ratings.len() as f64))
    }

    async fn get_room_members_votes(
        &self,
        song_id: SongId,
        user_ids: &[UserId],
    ) -> Result<Vec<Vote>, RepositoryError> {
        let votes = self.votes.read().await;
        let mut result: Vec<Vote> = votes
            .values()
            .filter(|v| v.song_id == song_id && user_ids.contains(&v.user_id))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(result)
    }

    async fn votes_by_users(&self, user_ids: &[UserId]) -> Result<Vec<Vote>, RepositoryError> {
        let votes = self.votes.read().await;
        let mut result: Vec<Vote> = votes
            .values()
            .filter(|v| user_ids.contains(&v.user_id))
            .cloned()
            .collect();
        result.sort_by(|a, b| (a.song_id, &a.user_id).cmp(&(b.song_id, &b.user_id)));
        Ok(result)
    }

    async fn upsert_vote(&self, vote: Vote) -> Result<(), RepositoryError> {
        if !self.songs.read().await.contains_key(&vote.song_id) {
            return Err(RepositoryError::SongNotFound(vote.song_id.value()));
        }
        tracing::debug!(
            "Vote {} from '{}' on song {}",
            vote.rating,
            vote.user_id,
            vote.song_id
        );
        self.votes
            .write()
            .await
            .insert((vote.song_id, vote.user_id.clone()), vote);
        Ok(())
    }

    async fn votes_for_songs(&self, song_ids: &[SongId]) -> Result<Vec<Vote>, RepositoryError> {
        let votes = self.votes.read().await;
        let mut result: Vec<Vote> = votes
            .values()
            .filter(|v| song_ids.contains(&v.song_id))
            .cloned()
            .collect();
        result.sort_by(|a, b| (a.song_id, &a.user_id).cmp(&(b.song_id, &b.user_id)));
        Ok(result)
    }
}
