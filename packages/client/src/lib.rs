//! Terminal client for SyncRate rooms.
//!
//! Joins a room over WebSocket, prints what the room broadcasts and turns
//! slash commands into protocol frames.

pub mod command;
mod domain;
pub mod error;
mod formatter;
mod runner;
mod session;
mod ui;

pub use runner::run_client;
pub use session::SessionTarget;
