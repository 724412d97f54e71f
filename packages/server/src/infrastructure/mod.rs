//! Infrastructure layer: protocol DTOs, the live room manager and the
//! in-memory reference stores.

pub mod dto;
pub mod repository;
pub mod room_manager;
