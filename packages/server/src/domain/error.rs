//! Domain error types.

use thiserror::Error;

/// Validation errors raised while constructing value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    UserIdEmpty,

    #[error("user id must be at most {0} characters")]
    UserIdTooLong(usize),

    #[error("display name must not be empty")]
    DisplayNameEmpty,

    #[error("display name must be at most {0} characters")]
    DisplayNameTooLong(usize),

    #[error("invalid room id '{0}'")]
    InvalidRoomId(String),

    #[error("invalid match id '{0}'")]
    InvalidMatchId(String),

    #[error("rating must be between 1 and 10, got {0}")]
    InvalidRating(i64),

    #[error("unknown room kind '{0}'")]
    UnknownRoomKind(String),
}

/// Errors raised by the live room view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// The room is absent from the live registry. Clients should reload.
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("user '{0}' is not in a room")]
    NotInRoom(String),

    #[error("user '{0}' is not the creator of this room")]
    NotRoomCreator(String),

    #[error("failed to encode frame for room '{0}': {1}")]
    Encode(String, String),
}

/// Errors raised by the bracket engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BracketError {
    #[error("match '{0}' not found")]
    MatchNotFound(String),

    #[error("not enough songs for the bracket (found {found}, need {needed})")]
    InsufficientCandidates { needed: usize, found: usize },

    #[error("bracket size {0} is not one of 8, 16, 32, 64, 128")]
    InvalidBracketSize(usize),

    #[error("match '{0}' is already completed")]
    MatchCompleted(String),

    #[error("match '{0}' is still waiting for its feeding matches")]
    SlotsNotReady(String),

    #[error("song {song_id} is not part of match '{match_id}'")]
    InvalidPick { match_id: String, song_id: u32 },

    #[error("bracket state could not be decoded: {0}")]
    InvalidTree(String),
}

/// Errors raised while pushing frames to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    /// The connection's writer is gone. Not retried; the reader loop prunes it.
    #[error("failed to write to connection: {0}")]
    ChannelWriteFailure(String),

    #[error("client '{0}' not found")]
    ClientNotFound(String),
}

/// Errors raised by external store collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("room record '{0}' not found")]
    RoomNotFound(String),

    #[error("room record '{0}' already exists")]
    RoomAlreadyExists(String),

    #[error("song {0} not found")]
    SongNotFound(u32),

    #[error("storage error: {0}")]
    Storage(String),
}
