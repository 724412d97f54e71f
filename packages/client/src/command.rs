//! Slash commands typed at the prompt, turned into protocol envelopes.

use serde_json::json;
use syncrate_server::infrastructure::dto::websocket::{
    Envelope, MessageKind, NavigateMatchData, PickWinnerData, RoomSettingsData, StartMatchData,
    VideoSyncData, VoteUpdateData,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type /help for the list of commands")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Plain text is not sent. Commands start with '/'")]
    NotACommand,
}

/// A parsed line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NextSong,
    Vote { rating: i64, comment: String },
    Sync { time: f64, is_playing: bool },
    Settings { video_sync_enabled: bool },
    StartTournament,
    StartMatch { match_id: String },
    Pick { match_id: String, song_id: u32 },
    Navigate { match_id: String },
    Refresh,
    Leave,
    Help,
}

const VOTE_USAGE: &str = "/vote <1-10> [comment]";
const SYNC_USAGE: &str = "/sync <seconds> [play|pause]";
const SETTINGS_USAGE: &str = "/settings <on|off>";
const MATCH_USAGE: &str = "/match <match_id>";
const PICK_USAGE: &str = "/pick <match_id> <song_id>";
const NAV_USAGE: &str = "/nav <match_id>";

pub const HELP: &str = "\
Commands:
  /next                         play another song (rating and radio rooms)
  /vote <1-10> [comment]        rate the current song
  /sync <seconds> [play|pause]  share the playback position
  /settings <on|off>            toggle video sync (room creator)
  /start                        start the tournament
  /match <match_id>             open a match, e.g. r1m1
  /pick <match_id> <song_id>    pick the winner of a match
  /nav <match_id>               show everyone a match
  /refresh                      ask for the room state again
  /leave                        leave the room and exit
  /help                         show this list
";

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Err(CommandError::NotACommand);
        };
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();

        match name {
            "next" => Ok(Command::NextSong),
            "vote" => {
                let rating = parts
                    .next()
                    .and_then(|r| r.parse::<i64>().ok())
                    .filter(|r| (1..=10).contains(r))
                    .ok_or(CommandError::Usage(VOTE_USAGE))?;
                let comment = parts.collect::<Vec<_>>().join(" ");
                Ok(Command::Vote { rating, comment })
            }
            "sync" => {
                let time = parts
                    .next()
                    .and_then(|t| t.parse::<f64>().ok())
                    .filter(|t| t.is_finite() && *t >= 0.0)
                    .ok_or(CommandError::Usage(SYNC_USAGE))?;
                let is_playing = match parts.next() {
                    None | Some("play") => true,
                    Some("pause") => false,
                    Some(_) => return Err(CommandError::Usage(SYNC_USAGE)),
                };
                Ok(Command::Sync { time, is_playing })
            }
            "settings" => match parts.next() {
                Some("on") => Ok(Command::Settings {
                    video_sync_enabled: true,
                }),
                Some("off") => Ok(Command::Settings {
                    video_sync_enabled: false,
                }),
                _ => Err(CommandError::Usage(SETTINGS_USAGE)),
            },
            "start" => Ok(Command::StartTournament),
            "match" => parts
                .next()
                .map(|id| Command::StartMatch {
                    match_id: id.to_string(),
                })
                .ok_or(CommandError::Usage(MATCH_USAGE)),
            "pick" => {
                let match_id = parts.next().ok_or(CommandError::Usage(PICK_USAGE))?;
                let song_id = parts
                    .next()
                    .and_then(|s| s.parse::<u32>().ok())
                    .ok_or(CommandError::Usage(PICK_USAGE))?;
                Ok(Command::Pick {
                    match_id: match_id.to_string(),
                    song_id,
                })
            }
            "nav" => parts
                .next()
                .map(|id| Command::Navigate {
                    match_id: id.to_string(),
                })
                .ok_or(CommandError::Usage(NAV_USAGE)),
            "refresh" => Ok(Command::Refresh),
            "leave" | "quit" | "exit" => Ok(Command::Leave),
            "help" => Ok(Command::Help),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    /// The frame to send, or `None` for commands handled locally.
    ///
    /// Identity fields are left empty; the server fills them from the connection.
    pub fn to_envelope(&self, timestamp: i64) -> Option<Envelope> {
        let (kind, data) = match self {
            Command::NextSong => (MessageKind::NextSong, json!({})),
            Command::Vote { rating, comment } => (
                MessageKind::VoteUpdate,
                serde_json::to_value(VoteUpdateData {
                    user_id: String::new(),
                    username: String::new(),
                    rating: *rating,
                    comment: comment.clone(),
                })
                .ok()?,
            ),
            Command::Sync { time, is_playing } => (
                MessageKind::VideoSync,
                serde_json::to_value(VideoSyncData {
                    time: *time,
                    is_playing: *is_playing,
                })
                .ok()?,
            ),
            Command::Settings { video_sync_enabled } => (
                MessageKind::RoomSettings,
                serde_json::to_value(RoomSettingsData {
                    video_sync_enabled: *video_sync_enabled,
                })
                .ok()?,
            ),
            Command::StartTournament => (MessageKind::StartTournament, json!({})),
            Command::StartMatch { match_id } => (
                MessageKind::StartMatch,
                serde_json::to_value(StartMatchData {
                    match_id: match_id.clone(),
                })
                .ok()?,
            ),
            Command::Pick { match_id, song_id } => (
                MessageKind::PickWinner,
                serde_json::to_value(PickWinnerData {
                    match_id: match_id.clone(),
                    song_id: *song_id,
                })
                .ok()?,
            ),
            Command::Navigate { match_id } => (
                MessageKind::NavigateMatch,
                serde_json::to_value(NavigateMatchData {
                    match_id: match_id.clone(),
                })
                .ok()?,
            ),
            Command::Refresh => (MessageKind::JoinRoom, json!({})),
            Command::Leave => (MessageKind::LeaveRoom, json!({})),
            Command::Help => return None,
        };
        Some(Envelope::new(kind, data, timestamp))
    }
}
