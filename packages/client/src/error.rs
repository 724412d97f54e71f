//! Error types for the SyncRate client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server has no room with this id
    #[error("Room '{0}' does not exist")]
    RoomNotFound(String),

    /// The server rejected the room id, user id or display name
    #[error("Server rejected the connection parameters: {0}")]
    InvalidParameters(String),

    /// The room was closed while we were in it
    #[error("Room closed: {0}")]
    RoomClosed(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}
