//! InMemory Repository 実装

pub mod catalog;
pub mod room_store;

pub use catalog::InMemorySongCatalog;
pub use room_store::InMemoryRoomRecordStore;
