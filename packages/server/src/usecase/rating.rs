//! UseCase: レーティングルーム
//!
//! ## 責務
//!
//! - `vote_update`: 現在の曲への投票を保存し、送信者の情報を付けてブロードキャスト
//! - `next_song`: メンバー全員がまだ評価していない曲を無作為に選んで切り替える
//! - 参加時: 現在の曲があれば `song_change` を本人にだけ送る
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 未評価曲の優先（誰も評価していない曲 → 一部のメンバーだけが評価した曲）
//! - 投票の保存とブロードキャスト内容
//!
//! ### どのような状況を想定しているか
//! - 正常系：次の曲の選択、投票
//! - 異常系：現在の曲がない状態での投票、候補が尽きた状態での next_song

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use super::{
    error::DispatchError,
    support::{choose, envelope, load_record, song_change_envelope, stamped_vote},
};
use crate::{
    domain::{
        DisplayName, RandomSource, RoomId, RoomKind, RoomRecord, RoomRecordStore, Song,
        SongCatalog, SongId, UserId, Vote,
    },
    infrastructure::{
        dto::websocket::{MessageKind, VoteUpdateData},
        room_manager::RoomManager,
    },
};

/// レーティングルームのハンドラ
pub struct RatingRoomHandler {
    catalog: Arc<dyn SongCatalog>,
    store: Arc<dyn RoomRecordStore>,
    room_manager: Arc<RoomManager>,
    random: Arc<RandomSource>,
}

impl RatingRoomHandler {
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

    /// 参加したユーザーに現在の曲を送る
    pub async fn on_join(&self, user_id: &UserId, record: &RoomRecord) -> Result<(), DispatchError> {
        let Some(song_id) = record.current_song_id else {
            return Ok(());
        };
        let song = self.catalog.get_song(song_id).await?;
        let envelope =
            song_change_envelope(&*self.catalog, &self.room_manager, &record.room_id, &song)
                .await?;
        self.room_manager.send_to_user(user_id, &envelope).await?;
        Ok(())
    }

    /// 投票を保存してブロードキャスト
    ///
    /// 対象の曲は next_song と同じルームロックの中で読み直したレコードから決める。
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 配信できたメンバー数
    pub async fn vote(
        &self,
        user_id: &UserId,
        display_name: &DisplayName,
        room_id: &RoomId,
        data: VoteUpdateData,
    ) -> Result<usize, DispatchError> {
        let lock = self.room_manager.room_lock(room_id).await;
        let _guard = lock.lock().await;

        let record = load_record(&*self.store, room_id).await?;
        let song_id = record
            .current_song_id
            .ok_or_else(|| DispatchError::NoCurrentSong(room_id.to_string()))?;
        let payload = stamped_vote(user_id, display_name, data)?;
        let vote = Vote::new(
            user_id.clone(),
            display_name.clone(),
            song_id,
            payload.rating,
            payload.comment.clone(),
        )?;
        self.catalog.upsert_vote(vote).await?;
        tracing::debug!(
            "'{}' rated song {} with {} in room '{}'",
            user_id,
            song_id,
            payload.rating,
            room_id
        );

        let envelope = envelope(MessageKind::VoteUpdate, &payload, self.room_manager.now())?;
        Ok(self.room_manager.broadcast_to_room(room_id, &envelope).await?)
    }

    /// 次の曲へ進める
    ///
    /// ルームロックの中でレコードを読み直し、選んだ曲を保存してからブロードキャストする。
    pub async fn next_song(&self, room_id: &RoomId) -> Result<SongId, DispatchError> {
        let lock = self.room_manager.room_lock(room_id).await;
        let _guard = lock.lock().await;

        let mut record = load_record(&*self.store, room_id).await?;
        let members: Vec<UserId> = self
            .room_manager
            .members(room_id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();

        let candidates = self
            .catalog
            .list_candidate_songs(&record.settings.song_filter(RoomKind::Rating))
            .await?;
        let candidate_ids: Vec<SongId> = candidates.iter().map(|s| s.id).collect();
        let votes = self.catalog.votes_for_songs(&candidate_ids).await?;
        let rated = member_rating_counts(&votes, &members);

        let song = pick_next_unrated(
            &self.random,
            &candidates,
            &rated,
            members.len(),
            record.current_song_id,
        )
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
        tracing::info!("Room '{}' moved to song {} ({})", room_id, song.id, song.title);

        let envelope =
            song_change_envelope(&*self.catalog, &self.room_manager, room_id, &song).await?;
        self.room_manager.broadcast_to_room(room_id, &envelope).await?;
        Ok(song.id)
    }
}

/// How many of `members` rated each song.
fn member_rating_counts(votes: &[Vote], members: &[UserId]) -> HashMap<SongId, usize> {
    let members: HashSet<&UserId> = members.iter().collect();
    let mut counts: HashMap<SongId, usize> = HashMap::new();
    for vote in votes.iter().filter(|v| members.contains(&v.user_id)) {
        *counts.entry(vote.song_id).or_default() += 1;
    }
    counts
}

/// Songs no member rated come first, then songs only some members rated.
/// The current song is avoided while another song qualifies.
fn pick_next_unrated<'a>(
    random: &RandomSource,
    candidates: &'a [Song],
    rated: &HashMap<SongId, usize>,
    member_count: usize,
    current: Option<SongId>,
) -> Option<&'a Song> {
    let count_of = |song: &Song| rated.get(&song.id).copied().unwrap_or(0);
    let untouched: Vec<&Song> = candidates.iter().filter(|s| count_of(s) == 0).collect();
    let partial: Vec<&Song> = candidates
        .iter()
        .filter(|s| count_of(s) < member_count.max(1))
        .collect();

    for tier in [untouched, partial] {
        let fresh: Vec<&Song> = tier
            .iter()
            .copied()
            .filter(|s| Some(s.id) != current)
            .collect();
        let pool = if fresh.is_empty() { tier } else { fresh };
        if let Some(song) = choose(random, &pool) {
            return Some(*song);
        }
    }
    None
}
