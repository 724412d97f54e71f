//! Utilities shared by the SyncRate server and client.

pub mod logger;
pub mod time;
