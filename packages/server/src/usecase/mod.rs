//! UseCase 層
//!
//! ルームの作成・参加・退出、受信フレームの振り分け、ルーム種別ごとの処理、
//! レコードの掃除を提供します。Domain 層の trait と Room Manager に依存し、
//! UI 層から呼ばれる。

pub mod cleanup;
pub mod create_room;
pub mod dispatch;
pub mod error;
pub mod join_room;
pub mod leave_room;
pub mod radio;
pub mod rating;
pub mod room_handlers;
pub mod song_selection;
mod support;
pub mod tournament;

#[cfg(test)]
pub(crate) mod test_support;

pub use cleanup::SweepRecordsUseCase;
pub use create_room::{CreateRoomCommand, CreateRoomUseCase, DEFAULT_TREE_SIZE};
pub use dispatch::DispatchMessageUseCase;
pub use error::{CreateRoomError, DispatchError, JoinError};
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use radio::RadioRoomHandler;
pub use rating::RatingRoomHandler;
pub use room_handlers::RoomHandlers;
pub use song_selection::{SelectionError, TournamentSongSelector};
pub use tournament::{PickOutcome, TournamentHandler};
