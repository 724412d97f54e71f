//! UseCase: トーナメントルーム
//!
//! ## 責務
//!
//! - 参加時に `tournament_state` を本人へ送る
//! - `start_tournament` / `start_match` / `pick_winner` による進行
//! - `vote_update` は保存せず、送信者情報を付けてブロードキャストのみ
//!
//! ブラケットを変更する処理はすべてルームロックの中で
//! 「レコード読込 → ツリー復元 → 変更 → 保存 → 状態ブロードキャスト」を行う。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 全員のピックが揃った時点での勝者決定と次ラウンドへの進出
//! - 評価・コイントスによるタイブレーク（カタログは mockall でモック）
//! - 決勝の決着でトーナメントが完了すること
//!
//! ### どのような状況を想定しているか
//! - 正常系：開始、試合開始、ピック、決勝
//! - 異常系：前ラウンド未決着の試合の開始、試合に含まれない曲へのピック

use std::{collections::HashMap, sync::Arc};

use super::{
    error::DispatchError,
    support::{envelope, load_record, stamped_vote},
};
use crate::{
    domain::{
        BracketError, DisplayName, MatchId, Resolution, RoomId, RoomRecord, RoomRecordStore,
        SongCatalog, SongId, TieBreaker, TournamentStatus, TreeState, UserId,
    },
    infrastructure::{
        dto::{
            conversion,
            websocket::{
                Envelope, MessageKind, PickWinnerData, StartMatchData, TournamentStateData,
                VoteUpdateData,
            },
        },
        room_manager::RoomManager,
    },
};

/// 1 回目の試合
const FIRST_MATCH: (u32, u32) = (1, 1);

/// トーナメントルームのハンドラ
pub struct TournamentHandler {
    catalog: Arc<dyn SongCatalog>,
    store: Arc<dyn RoomRecordStore>,
    room_manager: Arc<RoomManager>,
    /// 票数も評価も同じときのコイントス
    tie_breaker: Arc<dyn TieBreaker>,
}

/// `pick_winner` の結果
#[derive(Debug, Clone, PartialEq)]
pub struct PickOutcome {
    pub picks: usize,
    pub resolution: Option<Resolution>,
    pub tournament_completed: bool,
}

impl TournamentHandler {
    pub fn new(
        catalog: Arc<dyn SongCatalog>,
        store: Arc<dyn RoomRecordStore>,
        room_manager: Arc<RoomManager>,
        tie_breaker: Arc<dyn TieBreaker>,
    ) -> Self {
        Self {
            catalog,
            store,
            room_manager,
            tie_breaker,
        }
    }

    pub async fn on_join(&self, user_id: &UserId, record: &RoomRecord) -> Result<(), DispatchError> {
        let tree = decode_tree(record)?;
        let envelope = self.state_envelope(record, &tree).await?;
        self.room_manager.send_to_user(user_id, &envelope).await?;
        Ok(())
    }

    /// トーナメントを開始し、1 回戦第 1 試合を開く
    ///
    /// 開始済みなら状態を再配信するだけ。
    pub async fn start_tournament(&self, room_id: &RoomId) -> Result<(), DispatchError> {
        let lock = self.room_manager.room_lock(room_id).await;
        let _guard = lock.lock().await;

        let mut record = load_record(&*self.store, room_id).await?;
        let mut tree = decode_tree(&record)?;
        if record.tournament_status == TournamentStatus::Setup {
            let first = MatchId::new(FIRST_MATCH.0, FIRST_MATCH.1)?;
            tree.start_match(&first)?;
            record.tournament_status = TournamentStatus::InProgress;
            record.current_match_id = Some(first);
            self.persist(&mut record, &tree).await?;
            tracing::info!("Tournament in room '{}' started", room_id);
        } else {
            tracing::debug!(
                "Tournament in room '{}' already {:?}, re-sending state",
                room_id,
                record.tournament_status
            );
        }
        self.broadcast_state(&record, &tree).await
    }

    /// 試合を現在の試合にして開く
    pub async fn start_match(
        &self,
        room_id: &RoomId,
        data: StartMatchData,
    ) -> Result<(), DispatchError> {
        let match_id: MatchId = data.match_id.parse()?;

        let lock = self.room_manager.room_lock(room_id).await;
        let _guard = lock.lock().await;

        let mut record = load_record(&*self.store, room_id).await?;
        let mut tree = decode_tree(&record)?;
        tree.start_match(&match_id)?;
        record.current_match_id = Some(match_id);
        if record.tournament_status == TournamentStatus::Setup {
            record.tournament_status = TournamentStatus::InProgress;
        }
        self.persist(&mut record, &tree).await?;
        tracing::info!("Match {} started in room '{}'", match_id, room_id);

        self.broadcast_state(&record, &tree).await
    }

    /// ピックを記録し、ライブメンバー全員が選んだら試合を決着させる
    ///
    /// # Arguments
    ///
    /// * `user_id` / `display_name` - ピックしたユーザー
    /// * `room_id` - ルーム
    /// * `data` - 試合 ID と選んだ曲 ID
    ///
    /// # Returns
    ///
    /// * `Ok(PickOutcome)` - ピック数と、決着した場合はその結果
    /// * `Err(DispatchError)` - 試合が見つからない・決着済み・曲が試合に含まれない など
    pub async fn pick_winner(
        &self,
        user_id: &UserId,
        display_name: &DisplayName,
        room_id: &RoomId,
        data: PickWinnerData,
    ) -> Result<PickOutcome, DispatchError> {
        let match_id: MatchId = data.match_id.parse()?;
        let song_id = SongId::new(data.song_id);

        let lock = self.room_manager.room_lock(room_id).await;
        let _guard = lock.lock().await;

        let mut record = load_record(&*self.store, room_id).await?;
        let mut tree = decode_tree(&record)?;
        let now = self.room_manager.now();

        let side = tree.side_for_song(&match_id, song_id)?;
        let picks = tree.record_pick(
            &match_id,
            user_id.clone(),
            display_name.clone(),
            side,
            now,
        )?;
        let member_count = self.room_manager.member_count(room_id).await?;
        tracing::debug!(
            "'{}' picked song {} in {} ({}/{} picks)",
            user_id,
            song_id,
            match_id,
            picks,
            member_count
        );

        let resolvable = tree
            .find_match(&match_id)
            .is_some_and(|m| m.is_resolvable(member_count));
        let mut resolution = None;
        if resolvable {
            let ratings = self.current_ratings(&tree, &match_id).await?;
            let resolved =
                tree.resolve_match(&match_id, &ratings, self.tie_breaker.as_ref(), now)?;
            tracing::info!(
                "Match {} in room '{}' won by song {} ({:?})",
                match_id,
                room_id,
                resolved.winner.song_id,
                resolved.reason
            );
            if tree.advance_winner(&match_id)?.is_none() {
                record.tournament_status = TournamentStatus::Completed;
                tracing::info!(
                    "Tournament in room '{}' completed, champion: song {}",
                    room_id,
                    resolved.winner.song_id
                );
            }
            resolution = Some(resolved);
        }

        self.persist(&mut record, &tree).await?;
        self.broadcast_state(&record, &tree).await?;
        Ok(PickOutcome {
            picks,
            resolution,
            tournament_completed: record.tournament_status == TournamentStatus::Completed,
        })
    }

    /// 投票をブロードキャストのみ行う
    pub async fn vote(
        &self,
        user_id: &UserId,
        display_name: &DisplayName,
        room_id: &RoomId,
        data: VoteUpdateData,
    ) -> Result<usize, DispatchError> {
        let payload = stamped_vote(user_id, display_name, data)?;
        let envelope = envelope(MessageKind::VoteUpdate, &payload, self.room_manager.now())?;
        Ok(self.room_manager.broadcast_to_room(room_id, &envelope).await?)
    }

    /// Average ratings of the match's two songs, re-read from the catalog.
    async fn current_ratings(
        &self,
        tree: &TreeState,
        match_id: &MatchId,
    ) -> Result<HashMap<SongId, f64>, DispatchError> {
        let m = tree
            .find_match(match_id)
            .ok_or_else(|| BracketError::MatchNotFound(match_id.to_string()))?;
        let mut ratings = HashMap::new();
        for song in [m.slot_a.song(), m.slot_b.song()].into_iter().flatten() {
            let rating = self
                .catalog
                .get_average_rating(song.song_id)
                .await?
                .unwrap_or(0.0);
            ratings.insert(song.song_id, rating);
        }
        Ok(ratings)
    }

    async fn persist(&self, record: &mut RoomRecord, tree: &TreeState) -> Result<(), DispatchError> {
        record.tree_blob = Some(tree.to_json()?);
        record.last_active_at = self.room_manager.now();
        self.store.save(record.clone()).await?;
        Ok(())
    }

    async fn state_envelope(
        &self,
        record: &RoomRecord,
        tree: &TreeState,
    ) -> Result<Envelope, DispatchError> {
        let video_sync_enabled = self
            .room_manager
            .get_room(&record.room_id)
            .await
            .map_or(record.settings.video_sync_enabled, |room| {
                room.video_sync_enabled
            });
        let votes = self.catalog.votes_for_songs(&tree.song_ids()).await?;
        let payload = TournamentStateData {
            tree_state: tree.clone(),
            status: record.tournament_status,
            current_match_id: record.current_match_id.map(|id| id.to_string()),
            video_sync_enabled,
            existing_votes: conversion::votes_by_song(&votes),
        };
        envelope(MessageKind::TournamentState, &payload, self.room_manager.now())
    }

    async fn broadcast_state(
        &self,
        record: &RoomRecord,
        tree: &TreeState,
    ) -> Result<(), DispatchError> {
        let envelope = self.state_envelope(record, tree).await?;
        self.room_manager
            .broadcast_to_room(&record.room_id, &envelope)
            .await?;
        Ok(())
    }
}

fn decode_tree(record: &RoomRecord) -> Result<TreeState, DispatchError> {
    let blob = record.tree_blob.as_deref().ok_or_else(|| {
        BracketError::InvalidTree(format!("room '{}' has no bracket", record.room_id))
    })?;
    Ok(TreeState::from_json(blob)?)
}
