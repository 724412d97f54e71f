//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 楽曲カタログとルームレコードはどちらも外部ストアの扱いで、
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{
    entity::{RoomKind, RoomRecord, Song, SongFilter, Vote},
    error::RepositoryError,
    value_object::{RoomId, SongId, Timestamp, UserId},
};

/// 楽曲カタログ
///
/// 楽曲・投票・平均評価の読み書きを提供します。
/// UseCase 層はこの trait に依存し、具体的な実装には依存しない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SongCatalog: Send + Sync {
    /// ID から楽曲を取得
    async fn get_song(&self, song_id: SongId) -> Result<Song, RepositoryError>;

    /// フィルタに一致する候補曲を取得（順序は ID 昇順）
    async fn list_candidate_songs(&self, filter: &SongFilter)
    -> Result<Vec<Song>, RepositoryError>;

    /// 現在の平均評価（投票がなければ `None`）
    async fn get_average_rating(&self, song_id: SongId) -> Result<Option<f64>, RepositoryError>;

    /// 指定ユーザーたちがある楽曲に付けた投票
    async fn get_room_members_votes(
        &self,
        song_id: SongId,
        user_ids: &[UserId],
    ) -> Result<Vec<Vote>, RepositoryError>;

    /// 指定ユーザーたちの全投票
    async fn votes_by_users(&self, user_ids: &[UserId]) -> Result<Vec<Vote>, RepositoryError>;

    /// 投票を追加または更新（同じユーザー・楽曲の組は上書き）
    async fn upsert_vote(&self, vote: Vote) -> Result<(), RepositoryError>;

    /// 指定楽曲への全投票
    async fn votes_for_songs(&self, song_ids: &[SongId]) -> Result<Vec<Vote>, RepositoryError>;
}

/// 永続化されたルームレコードのストア
///
/// ブラケットは `RoomRecord::tree_blob` に不透明な文字列として保存される。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRecordStore: Send + Sync {
    /// 新規作成（既存 ID は `RoomAlreadyExists`）
    async fn create(&self, record: RoomRecord) -> Result<(), RepositoryError>;

    /// レコードを取得（存在しなければ `None`）
    async fn load(&self, room_id: &RoomId) -> Result<Option<RoomRecord>, RepositoryError>;

    /// 上書き保存（存在しない ID は `RoomNotFound`）
    async fn save(&self, record: RoomRecord) -> Result<(), RepositoryError>;

    /// 削除（存在しなくてもエラーにしない）
    async fn delete(&self, room_id: &RoomId) -> Result<(), RepositoryError>;

    /// `last_active_at` を更新（存在しない ID は `RoomNotFound`）
    async fn touch(&self, room_id: &RoomId, now: Timestamp) -> Result<(), RepositoryError>;

    /// `cutoff` より前から非アクティブな指定種別のレコードを削除し、削除した ID を返す
    async fn delete_inactive(
        &self,
        kind: RoomKind,
        cutoff: Timestamp,
    ) -> Result<Vec<RoomId>, RepositoryError>;
}
