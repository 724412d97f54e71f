//! Message formatting utilities for client display.

use syncrate_server::{
    domain::{Match, MatchStatus, Slot, TournamentStatus},
    infrastructure::dto::websocket::{
        Envelope, ErrorData, MessageKind, NavigateMatchData, RoomSettingsData, SongChangeData,
        TournamentStateData, UserUpdateData, VideoSyncData, VoteUpdateData,
    },
};
use syncrate_shared::time::timestamp_to_rfc3339;

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Render a received frame. Payloads that do not decode fall back to the raw text.
    pub fn format_envelope(envelope: &Envelope, raw: &str, me: &str) -> String {
        let formatted = match envelope.kind {
            MessageKind::UserListUpdate => envelope
                .payload::<UserUpdateData>()
                .map(|data| Self::format_user_update(&data, me)),
            MessageKind::SongChange => envelope
                .payload::<SongChangeData>()
                .map(|data| Self::format_song_change(&data)),
            MessageKind::VoteUpdate => envelope
                .payload::<VoteUpdateData>()
                .map(|data| Self::format_vote(&data, envelope.timestamp)),
            MessageKind::VideoSync => envelope
                .payload::<VideoSyncData>()
                .map(|data| Self::format_video_sync(&data)),
            MessageKind::RoomSettings => envelope
                .payload::<RoomSettingsData>()
                .map(|data| Self::format_room_settings(&data)),
            MessageKind::TournamentState => envelope
                .payload::<TournamentStateData>()
                .map(|data| Self::format_tournament_state(&data)),
            MessageKind::NavigateMatch => envelope
                .payload::<NavigateMatchData>()
                .map(|data| format!("\n> Now showing match {}\n", data.match_id)),
            MessageKind::Error => envelope
                .payload::<ErrorData>()
                .map(|data| Self::format_error(&data)),
            _ => return Self::format_raw_message(raw),
        };
        formatted.unwrap_or_else(|_| Self::format_raw_message(raw))
    }

    /// Format the member list, marking the current user
    ///
    /// # Arguments
    ///
    /// * `data` - The `user_update` payload
    /// * `me` - The current user's id (to mark as "me")
    pub fn format_user_update(data: &UserUpdateData, me: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        output.push_str("Members:\n");

        if data.users.is_empty() {
            output.push_str("(No members)\n");
        } else {
            for user in &data.users {
                let me_suffix = if user.id == me { " (me)" } else { "" };
                output.push_str(&format!("{}{} [{}]\n", user.username, me_suffix, user.id));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    pub fn format_song_change(data: &SongChangeData) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        output.push_str(&format!("Now playing: #{} {}\n", data.song_id, data.song_title_original));
        if !data.song_title_english.is_empty() {
            output.push_str(&format!("  ({})\n", data.song_title_english));
        }
        if !data.artists.is_empty() {
            output.push_str(&format!("  by {}\n", data.artists.join(", ")));
        }
        if data.is_cover {
            output.push_str("  [cover]\n");
        }
        if !data.embed_url.is_empty() {
            output.push_str(&format!("  {}\n", data.embed_url));
        }
        if !data.existing_votes.is_empty() {
            output.push_str("Votes so far:\n");
            for vote in &data.existing_votes {
                output.push_str(&format!("  {} rated {}/10\n", vote.username, vote.rating));
            }
        }
        output.push_str(RULE);
        output.push('\n');
        output
    }

    pub fn format_vote(data: &VoteUpdateData, sent_at: i64) -> String {
        let comment = if data.comment.is_empty() {
            String::new()
        } else {
            format!(" \"{}\"", data.comment)
        };
        format!(
            "\n* {} rated {}/10{} at {}\n",
            data.username,
            data.rating,
            comment,
            timestamp_to_rfc3339(sent_at)
        )
    }

    pub fn format_video_sync(data: &VideoSyncData) -> String {
        let state = if data.is_playing { "playing" } else { "paused" };
        format!("\n~ playback {} at {:.1}s\n", state, data.time)
    }

    pub fn format_room_settings(data: &RoomSettingsData) -> String {
        let state = if data.video_sync_enabled { "on" } else { "off" };
        format!("\n# video sync is {}\n", state)
    }

    /// Summarize the bracket: progress, the current match and the champion if any
    pub fn format_tournament_state(data: &TournamentStateData) -> String {
        let matches: Vec<&Match> = data
            .tree_state
            .rounds
            .iter()
            .flat_map(|r| r.matches.iter())
            .collect();
        let completed = matches.iter().filter(|m| m.is_completed()).count();

        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        let status = match data.status {
            TournamentStatus::Setup => "setup",
            TournamentStatus::InProgress => "in progress",
            TournamentStatus::Completed => "completed",
        };
        output.push_str(&format!(
            "Tournament {} ({}/{} matches decided)\n",
            status,
            completed,
            matches.len()
        ));

        let current = data.current_match_id.as_deref().and_then(|id| {
            matches
                .iter()
                .find(|m| m.match_id.to_string() == id)
                .copied()
        });
        if let Some(m) = current {
            output.push_str(&Self::format_match(m));
        }

        if data.status == TournamentStatus::Completed
            && let Some(champion) = data.tree_state.champion()
        {
            output.push_str(&format!("Champion: #{} {}\n", champion.song_id, champion.title));
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    fn format_match(m: &Match) -> String {
        let (a, b) = m.tally();
        let status = match m.status {
            MatchStatus::Pending => "pending",
            MatchStatus::InProgress => "in progress",
            MatchStatus::Completed => "decided",
        };
        let mut output = format!("Match {} ({})\n", m.match_id, status);
        output.push_str(&format!("  A: {} [{} picks]\n", Self::format_slot(&m.slot_a), a));
        output.push_str(&format!("  B: {} [{} picks]\n", Self::format_slot(&m.slot_b), b));
        if let Some(winner) = &m.winner {
            output.push_str(&format!("  Winner: #{} {}\n", winner.song_id, winner.title));
        }
        output
    }

    fn format_slot(slot: &Slot) -> String {
        match slot {
            Slot::Song(song) => format!("#{} {} ({:.1})", song.song_id, song.title, song.average_rating),
            Slot::Pending { from_match_id } => format!("winner of {}", from_match_id),
        }
    }

    pub fn format_error(data: &ErrorData) -> String {
        if data.reload {
            format!("\n! {} (the room is gone)\n", data.message)
        } else {
            format!("\n! {}\n", data.message)
        }
    }

    /// Format a confirmation message after sending
    pub fn format_sent_confirmation(kind: MessageKind, sent_at: i64) -> String {
        format!("{} sent at {}\n", kind, timestamp_to_rfc3339(sent_at))
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncrate_server::infrastructure::dto::websocket::UserInfo;

    fn users() -> UserUpdateData {
        UserUpdateData {
            users: vec![
                UserInfo {
                    id: "u1".to_string(),
                    username: "alice".to_string(),
                },
                UserInfo {
                    id: "u2".to_string(),
                    username: "bob".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_format_user_update_marks_me() {
        // テスト項目: メンバー一覧で自分にだけマークが付く
        // given (前提条件):
        let data = users();

        // when (操作):
        let result = MessageFormatter::format_user_update(&data, "u1");

        // then (期待する結果):
        assert!(result.contains("Members:"));
        assert!(result.contains("alice (me) [u1]"));
        assert!(result.contains("bob [u2]"));
        assert!(!result.contains("bob (me)"));
    }

    #[test]
    fn test_format_user_update_with_empty_members() {
        // テスト項目: メンバーが空の場合、適切なメッセージが表示される
        // given (前提条件):
        let data = UserUpdateData { users: vec![] };

        // when (操作):
        let result = MessageFormatter::format_user_update(&data, "u1");

        // then (期待する結果):
        assert!(result.contains("(No members)"));
        assert!(result.contains(RULE));
    }

    #[test]
    fn test_format_song_change_lists_existing_votes() {
        // テスト項目: 曲の切り替えでタイトルと既存の投票が表示される
        // given (前提条件):
        let data = SongChangeData {
            song_id: 7,
            song_title_original: "Snow halation".to_string(),
            song_title_english: String::new(),
            embed_url: "https://www.youtube.com/embed/abc".to_string(),
            thumbnail_url: String::new(),
            source_url: String::new(),
            artists: vec!["μ's".to_string()],
            category: String::new(),
            is_cover: true,
            existing_votes: vec![VoteUpdateData {
                user_id: "u2".to_string(),
                username: "bob".to_string(),
                rating: 9,
                comment: String::new(),
            }],
        };

        // when (操作):
        let result = MessageFormatter::format_song_change(&data);

        // then (期待する結果):
        assert!(result.contains("Now playing: #7 Snow halation"));
        assert!(result.contains("by μ's"));
        assert!(result.contains("[cover]"));
        assert!(result.contains("bob rated 9/10"));
    }

    #[test]
    fn test_format_vote_with_comment() {
        // テスト項目: 投票通知に評価とコメントと時刻が含まれる
        // given (前提条件):
        let data = VoteUpdateData {
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            rating: 8,
            comment: "nice".to_string(),
        };

        // when (操作):
        let result = MessageFormatter::format_vote(&data, 1672498800000);

        // then (期待する結果):
        assert!(result.contains("alice rated 8/10 \"nice\""));
        assert!(result.contains("2022-12-31"));
    }

    #[test]
    fn test_format_error_mentions_closed_room() {
        // テスト項目: reload 付きのエラーはルーム消滅として表示される
        // given (前提条件):
        let data = ErrorData {
            message: "Room no longer exists".to_string(),
            reload: true,
        };

        // when (操作):
        let result = MessageFormatter::format_error(&data);

        // then (期待する結果):
        assert!(result.contains("Room no longer exists"));
        assert!(result.contains("the room is gone"));
    }

    #[test]
    fn test_format_envelope_falls_back_to_raw_text() {
        // テスト項目: ペイロードが壊れていれば生のテキストを表示する
        // given (前提条件):
        let raw = r#"{"type":"vote_update","data":{"rating":"high"},"timestamp":0}"#;
        let envelope = Envelope::decode(raw).unwrap();

        // when (操作):
        let result = MessageFormatter::format_envelope(&envelope, raw, "u1");

        // then (期待する結果):
        assert!(result.contains("Received:"));
        assert!(result.contains("high"));
    }

    #[test]
    fn test_format_video_sync() {
        // テスト項目: 再生同期が状態と位置で表示される
        // given (前提条件):
        let data = VideoSyncData {
            time: 42.25,
            is_playing: false,
        };

        // when (操作):
        let result = MessageFormatter::format_video_sync(&data);

        // then (期待する結果):
        assert!(result.contains("paused at 42.2s") || result.contains("paused at 42.3s"));
    }
}
