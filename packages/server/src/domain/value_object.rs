//! Value objects shared by every layer of the server.

use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::ValueObjectError;

/// Maximum length of an externally assigned user id.
pub const MAX_USER_ID_LENGTH: usize = 64;
/// Maximum length of a display name.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 64;
/// Length of a room code.
pub const ROOM_ID_LENGTH: usize = 6;
/// Characters a room code is drawn from.
pub const ROOM_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Opaque user identity handed to us by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::UserIdEmpty);
        }
        if trimmed.chars().count() > MAX_USER_ID_LENGTH {
            return Err(ValueObjectError::UserIdTooLong(MAX_USER_ID_LENGTH));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name shown to other room members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::DisplayNameEmpty);
        }
        if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
            return Err(ValueObjectError::DisplayNameTooLong(
                MAX_DISPLAY_NAME_LENGTH,
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short room code such as `AB12CD`.
///
/// Codes are case-insensitive on input and always stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let normalized = value.trim().to_ascii_uppercase();
        if normalized.len() != ROOM_ID_LENGTH
            || !normalized.bytes().all(|b| ROOM_ID_CHARSET.contains(&b))
        {
            return Err(ValueObjectError::InvalidRoomId(value));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates room codes.
pub struct RoomIdFactory;

impl RoomIdFactory {
    /// Generate a random room code using the thread-local generator.
    pub fn generate() -> RoomId {
        Self::generate_with(&mut rand::rng())
    }

    /// Generate a room code from the given random source.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> RoomId {
        let code: String = (0..ROOM_ID_LENGTH)
            .map(|_| ROOM_ID_CHARSET[rng.random_range(0..ROOM_ID_CHARSET.len())] as char)
            .collect();
        RoomId(code)
    }
}

/// Bracket match identifier, `r{round}m{position}` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchId {
    round: u32,
    position: u32,
}

impl MatchId {
    pub fn new(round: u32, position: u32) -> Result<Self, ValueObjectError> {
        if round == 0 || position == 0 {
            return Err(ValueObjectError::InvalidMatchId(format!(
                "r{}m{}",
                round, position
            )));
        }
        Ok(Self { round, position })
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    /// The match in the next round that this match's winner feeds into.
    pub fn next(&self) -> MatchId {
        MatchId {
            round: self.round + 1,
            position: self.position.div_ceil(2),
        }
    }
}

impl FromStr for MatchId {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueObjectError::InvalidMatchId(s.to_string());
        let rest = s.strip_prefix('r').ok_or_else(invalid)?;
        let (round, position) = rest.split_once('m').ok_or_else(invalid)?;
        let round = round.parse::<u32>().map_err(|_| invalid())?;
        let position = position.parse::<u32>().map_err(|_| invalid())?;
        Self::new(round, position).map_err(|_| invalid())
    }
}

impl TryFrom<String> for MatchId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MatchId> for String {
    fn from(value: MatchId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}m{}", self.round, self.position)
    }
}

/// Catalog identity of a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(u32);

impl SongId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UTC Unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed between `self` and a later `now`, zero if `now` is earlier.
    pub fn elapsed_until(&self, now: Timestamp) -> i64 {
        (now.0 - self.0).max(0)
    }
}
