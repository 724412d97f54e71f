//! SyncRate room coordination server.
//!
//! Users join rating, radio and tournament rooms over WebSocket. This crate
//! provides the connection registry, the room manager with fan-out, the room
//! session protocol and the tournament bracket engine.

// layers
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
