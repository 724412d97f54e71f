//! UseCase 層のエラー定義

use thiserror::Error;

use super::song_selection::SelectionError;
use crate::{
    domain::{
        BracketError, MessagePushError, RepositoryError, RoomError, RoomKind, ValueObjectError,
    },
    infrastructure::dto::websocket::{ErrorData, MessageKind, ProtocolError},
};

/// ルーム作成時のエラー
#[derive(Debug, Error)]
pub enum CreateRoomError {
    #[error(transparent)]
    InvalidInput(#[from] ValueObjectError),

    #[error(transparent)]
    Bracket(#[from] BracketError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("could not allocate a unique room id")]
    RoomIdExhausted,
}

/// ルーム参加時のエラー
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 受信フレームの処理エラー
///
/// `RoomGone` だけがクライアントへの通知対象で、それ以外はログに残して破棄する。
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("user '{0}' is not in a room")]
    NotInRoom(String),

    #[error("room '{0}' no longer exists")]
    RoomGone(String),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Bracket(#[from] BracketError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    InvalidPayload(#[from] ValueObjectError),

    #[error(transparent)]
    Push(#[from] MessagePushError),

    #[error("room '{0}' has no current song")]
    NoCurrentSong(String),

    #[error("no song available for room '{0}'")]
    NoSongAvailable(String),

    #[error("{kind} is not handled in {room_kind} rooms")]
    Unsupported { kind: MessageKind, room_kind: RoomKind },

    #[error("{0} is sent by the server only")]
    ServerOnly(MessageKind),
}

impl DispatchError {
    /// Error frame to show the client, if this error warrants one.
    pub fn client_notice(&self) -> Option<ErrorData> {
        match self {
            DispatchError::RoomGone(_) => Some(ErrorData {
                message: "This room no longer exists. The page will reload.".to_string(),
                reload: true,
            }),
            _ => None,
        }
    }
}
