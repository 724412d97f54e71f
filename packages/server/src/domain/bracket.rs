//! Single-elimination bracket.
//!
//! A `TreeState` is built once from a shuffled song pool and then mutated
//! match by match. Round 1 always holds concrete songs. Every later match
//! starts with two `Slot::Pending` references to the round before it and is
//! filled in by [`TreeState::advance_winner`] as matches complete.
//!
//! Resolution order for a match:
//!
//! 1. the side with strictly more picks
//! 2. the side with the higher current average rating
//! 3. a coin flip from the injected [`TieBreaker`]

use std::collections::{BTreeSet, HashMap};

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use super::{
    entity::Song,
    error::BracketError,
    tie_break::TieBreaker,
    value_object::{DisplayName, MatchId, SongId, Timestamp, UserId},
    youtube,
};

/// Number of songs in a bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketSize(usize);

impl BracketSize {
    pub const ALLOWED: [usize; 5] = [8, 16, 32, 64, 128];

    pub fn new(size: usize) -> Result<Self, BracketError> {
        if Self::ALLOWED.contains(&size) {
            Ok(Self(size))
        } else {
            Err(BracketError::InvalidBracketSize(size))
        }
    }

    pub fn value(&self) -> usize {
        self.0
    }

    pub fn rounds(&self) -> u32 {
        self.0.trailing_zeros()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotSide {
    A,
    B,
}

/// Snapshot of a song as it appears inside a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSong {
    pub song_id: SongId,
    pub title: String,
    #[serde(default)]
    pub title_english: String,
    #[serde(default)]
    pub artists: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub embed_url: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub is_cover: bool,
    /// Average rating when last refreshed. Resolution refreshes it.
    #[serde(default)]
    pub average_rating: f64,
}

impl MatchSong {
    pub fn from_song(song: &Song, average_rating: f64) -> Self {
        Self {
            song_id: song.id,
            title: song.title.clone(),
            title_english: song.title_english.clone(),
            artists: song.artist_label(),
            thumbnail_url: song.thumbnail_url.clone(),
            source_url: song.source_url.clone(),
            embed_url: youtube::embed_url(&song.source_url),
            category_name: song.category_name.clone().unwrap_or_default(),
            is_cover: song.is_cover,
            average_rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slot {
    Song(MatchSong),
    Pending { from_match_id: MatchId },
}

impl Slot {
    pub fn song(&self) -> Option<&MatchSong> {
        match self {
            Slot::Song(song) => Some(song),
            Slot::Pending { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// One user's choice in a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub side: SlotSide,
    pub picked_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: MatchId,
    pub slot_a: Slot,
    pub slot_b: Slot,
    pub winner: Option<MatchSong>,
    #[serde(default)]
    pub picks: Vec<Pick>,
    pub status: MatchStatus,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

impl Match {
    fn new(match_id: MatchId, slot_a: Slot, slot_b: Slot) -> Self {
        Self {
            match_id,
            slot_a,
            slot_b,
            winner: None,
            picks: Vec::new(),
            status: MatchStatus::Pending,
            completed_at: None,
        }
    }

    pub fn slot(&self, side: SlotSide) -> &Slot {
        match side {
            SlotSide::A => &self.slot_a,
            SlotSide::B => &self.slot_b,
        }
    }

    fn slot_mut(&mut self, side: SlotSide) -> &mut Slot {
        match side {
            SlotSide::A => &mut self.slot_a,
            SlotSide::B => &mut self.slot_b,
        }
    }

    /// Both slots hold concrete songs.
    pub fn is_ready(&self) -> bool {
        self.slot_a.song().is_some() && self.slot_b.song().is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Which side a song sits on, if it is part of this match.
    pub fn side_of_song(&self, song_id: SongId) -> Option<SlotSide> {
        [SlotSide::A, SlotSide::B]
            .into_iter()
            .find(|&side| self.slot(side).song().is_some_and(|s| s.song_id == song_id))
    }

    /// Pick counts for side A and side B.
    pub fn tally(&self) -> (usize, usize) {
        self.picks.iter().fold((0, 0), |(a, b), pick| match pick.side {
            SlotSide::A => (a + 1, b),
            SlotSide::B => (a, b + 1),
        })
    }

    /// Open, concrete and picked by at least `member_count` users.
    pub fn is_resolvable(&self, member_count: usize) -> bool {
        !self.is_completed()
            && self.is_ready()
            && member_count > 0
            && self.picks.len() >= member_count
    }

    fn ensure_open(&self) -> Result<(), BracketError> {
        if self.is_completed() {
            return Err(BracketError::MatchCompleted(self.match_id.to_string()));
        }
        if !self.is_ready() {
            return Err(BracketError::SlotsNotReady(self.match_id.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub round_number: u32,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionReason {
    Picks,
    Rating,
    CoinFlip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub match_id: MatchId,
    pub side: SlotSide,
    pub winner: MatchSong,
    pub reason: ResolutionReason,
}

/// Pick a side from the tally, then ratings, then the tie breaker.
pub fn decide_winner(
    tally: (usize, usize),
    rating_a: f64,
    rating_b: f64,
    tie_breaker: &dyn TieBreaker,
) -> (SlotSide, ResolutionReason) {
    let (picks_a, picks_b) = tally;
    if picks_a != picks_b {
        let side = if picks_a > picks_b {
            SlotSide::A
        } else {
            SlotSide::B
        };
        return (side, ResolutionReason::Picks);
    }
    if rating_a > rating_b {
        return (SlotSide::A, ResolutionReason::Rating);
    }
    if rating_b > rating_a {
        return (SlotSide::B, ResolutionReason::Rating);
    }
    (tie_breaker.coin_flip(), ResolutionReason::CoinFlip)
}

/// The whole bracket. Serialized as the room record's tree blob.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeState {
    pub rounds: Vec<Round>,
}

impl TreeState {
    /// Shuffle `songs`, keep the first `size` and pair them into round 1.
    /// Later rounds are pre-allocated with pending slots.
    pub fn build<R: Rng + ?Sized>(
        mut songs: Vec<MatchSong>,
        size: BracketSize,
        rng: &mut R,
    ) -> Result<Self, BracketError> {
        let needed = size.value();
        if songs.len() < needed {
            return Err(BracketError::InsufficientCandidates {
                needed,
                found: songs.len(),
            });
        }
        songs.shuffle(rng);
        songs.truncate(needed);

        let mut rounds = Vec::with_capacity(size.rounds() as usize);

        let mut first = Vec::with_capacity(needed / 2);
        let mut iter = songs.into_iter();
        let mut position = 1;
        while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
            first.push(Match::new(
                match_id(1, position)?,
                Slot::Song(a),
                Slot::Song(b),
            ));
            position += 1;
        }
        rounds.push(Round {
            round_number: 1,
            matches: first,
        });

        let mut match_count = needed / 4;
        for round in 2..=size.rounds() {
            let mut matches = Vec::with_capacity(match_count);
            for m in 1..=match_count {
                matches.push(Match::new(
                    match_id(round, m)?,
                    Slot::Pending {
                        from_match_id: match_id(round - 1, 2 * m - 1)?,
                    },
                    Slot::Pending {
                        from_match_id: match_id(round - 1, 2 * m)?,
                    },
                ));
            }
            rounds.push(Round {
                round_number: round,
                matches,
            });
            match_count /= 2;
        }

        Ok(Self { rounds })
    }

    pub fn from_json(blob: &str) -> Result<Self, BracketError> {
        serde_json::from_str(blob).map_err(|e| BracketError::InvalidTree(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, BracketError> {
        serde_json::to_string(self).map_err(|e| BracketError::InvalidTree(e.to_string()))
    }

    pub fn total_matches(&self) -> usize {
        self.rounds.iter().map(|r| r.matches.len()).sum()
    }

    pub fn find_match(&self, match_id: &MatchId) -> Option<&Match> {
        self.rounds
            .iter()
            .flat_map(|r| r.matches.iter())
            .find(|m| &m.match_id == match_id)
    }

    pub fn find_match_mut(&mut self, match_id: &MatchId) -> Option<&mut Match> {
        self.rounds
            .iter_mut()
            .flat_map(|r| r.matches.iter_mut())
            .find(|m| &m.match_id == match_id)
    }

    fn require_match_mut(&mut self, match_id: &MatchId) -> Result<&mut Match, BracketError> {
        self.find_match_mut(match_id)
            .ok_or_else(|| BracketError::MatchNotFound(match_id.to_string()))
    }

    /// Open a match for picks. A no-op when it is already in progress.
    pub fn start_match(&mut self, match_id: &MatchId) -> Result<(), BracketError> {
        let m = self.require_match_mut(match_id)?;
        m.ensure_open()?;
        m.status = MatchStatus::InProgress;
        Ok(())
    }

    /// Side holding `song_id` in the given match.
    pub fn side_for_song(
        &self,
        match_id: &MatchId,
        song_id: SongId,
    ) -> Result<SlotSide, BracketError> {
        let m = self
            .find_match(match_id)
            .ok_or_else(|| BracketError::MatchNotFound(match_id.to_string()))?;
        m.side_of_song(song_id).ok_or(BracketError::InvalidPick {
            match_id: match_id.to_string(),
            song_id: song_id.value(),
        })
    }

    /// Record or overwrite a user's pick. Returns the number of picks on the match.
    ///
    /// A pick on a pending match opens it.
    pub fn record_pick(
        &mut self,
        match_id: &MatchId,
        user_id: UserId,
        display_name: DisplayName,
        side: SlotSide,
        now: Timestamp,
    ) -> Result<usize, BracketError> {
        let m = self.require_match_mut(match_id)?;
        m.ensure_open()?;
        m.status = MatchStatus::InProgress;

        match m.picks.iter_mut().find(|p| p.user_id == user_id) {
            Some(existing) => {
                existing.display_name = display_name;
                existing.side = side;
                existing.picked_at = now;
            }
            None => m.picks.push(Pick {
                user_id,
                display_name,
                side,
                picked_at: now,
            }),
        }
        Ok(m.picks.len())
    }

    /// Complete a match. `ratings` holds current average ratings; a song
    /// missing from it counts as 0.
    pub fn resolve_match(
        &mut self,
        match_id: &MatchId,
        ratings: &HashMap<SongId, f64>,
        tie_breaker: &dyn TieBreaker,
        now: Timestamp,
    ) -> Result<Resolution, BracketError> {
        let m = self.require_match_mut(match_id)?;
        m.ensure_open()?;

        for side in [SlotSide::A, SlotSide::B] {
            if let Slot::Song(song) = m.slot_mut(side) {
                song.average_rating = ratings.get(&song.song_id).copied().unwrap_or(0.0);
            }
        }

        let rating_of = |slot: &Slot| slot.song().map_or(0.0, |s| s.average_rating);
        let (side, reason) = decide_winner(
            m.tally(),
            rating_of(&m.slot_a),
            rating_of(&m.slot_b),
            tie_breaker,
        );
        let winner = m
            .slot(side)
            .song()
            .cloned()
            .ok_or_else(|| BracketError::SlotsNotReady(match_id.to_string()))?;

        m.winner = Some(winner.clone());
        m.status = MatchStatus::Completed;
        m.completed_at = Some(now);

        Ok(Resolution {
            match_id: *match_id,
            side,
            winner,
            reason,
        })
    }

    /// Copy a completed match's winner into the match it feeds.
    ///
    /// Odd positions feed slot A, even positions slot B. Returns the target
    /// match, or `None` when the completed match was the final.
    pub fn advance_winner(&mut self, match_id: &MatchId) -> Result<Option<MatchId>, BracketError> {
        let winner = self
            .find_match(match_id)
            .ok_or_else(|| BracketError::MatchNotFound(match_id.to_string()))?
            .winner
            .clone()
            .ok_or_else(|| BracketError::SlotsNotReady(match_id.to_string()))?;

        if match_id.round() as usize >= self.rounds.len() {
            return Ok(None);
        }

        let next_id = match_id.next();
        let side = if match_id.position() % 2 == 1 {
            SlotSide::A
        } else {
            SlotSide::B
        };
        let next = self.require_match_mut(&next_id)?;
        *next.slot_mut(side) = Slot::Song(winner);
        Ok(Some(next_id))
    }

    pub fn final_match(&self) -> Option<&Match> {
        self.rounds.last().and_then(|r| r.matches.first())
    }

    pub fn is_complete(&self) -> bool {
        self.final_match().is_some_and(Match::is_completed)
    }

    pub fn champion(&self) -> Option<&MatchSong> {
        self.final_match().and_then(|m| m.winner.as_ref())
    }

    /// Every concrete song in the bracket, without duplicates.
    pub fn song_ids(&self) -> Vec<SongId> {
        let ids: BTreeSet<SongId> = self
            .rounds
            .iter()
            .flat_map(|r| r.matches.iter())
            .flat_map(|m| [m.slot_a.song(), m.slot_b.song()])
            .flatten()
            .map(|s| s.song_id)
            .collect();
        ids.into_iter().collect()
    }
}

fn match_id(round: u32, position: usize) -> Result<MatchId, BracketError> {
    let position = u32::try_from(position)
        .map_err(|_| BracketError::InvalidTree(format!("position {position} out of range")))?;
    MatchId::new(round, position).map_err(|e| BracketError::InvalidTree(e.to_string()))
}
