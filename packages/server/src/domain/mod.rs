//! Domain layer: value objects, entities, the bracket engine and the
//! interfaces the outer layers implement.

pub mod bracket;
pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod tie_break;
pub mod value_object;
pub mod youtube;

pub use bracket::{
    BracketSize, Match, MatchSong, MatchStatus, Pick, Resolution, ResolutionReason, Round, Slot,
    SlotSide, TreeState, decide_winner,
};
pub use entity::{
    CoverPolicy, Member, PlaybackState, Room, RoomKind, RoomRecord, RoomSettings, Song,
    SongFilter, TournamentStatus, Vote,
};
pub use error::{BracketError, MessagePushError, RepositoryError, RoomError, ValueObjectError};
pub use message_pusher::{OutboundFrame, PusherChannel};
pub use repository::{RoomRecordStore, SongCatalog};
pub use tie_break::{FixedTieBreaker, RandomSource, TieBreaker};
pub use value_object::{
    DisplayName, MatchId, RoomId, RoomIdFactory, SongId, Timestamp, UserId,
};
