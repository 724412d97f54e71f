//! Repository 実装
//!
//! ドメイン層が定義する trait の具体的な実装を提供します。
//!
//! - `inmemory`: プロセス内のインメモリ実装

pub mod inmemory;

pub use inmemory::{InMemoryRoomRecordStore, InMemorySongCatalog};
