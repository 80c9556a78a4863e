//! Match data models and the match state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{EntityKind, LeagueError, LeagueResult};
use crate::player::PlayerId;
use crate::tournament::{BracketSlot, TournamentId};

/// Match ID type
pub type MatchId = Uuid;

/// Match state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    InProgress,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            other => Err(format!("unknown match status: {other}")),
        }
    }
}

/// A two-player match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round: u32,
    pub match_number: u32,
    pub player1_id: Option<PlayerId>,
    pub player2_id: Option<PlayerId>,
    pub player1_score: u32,
    pub player2_score: u32,
    pub winner_id: Option<PlayerId>,
    pub status: MatchStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl Match {
    /// Create a pending match with no players
    pub fn new(tournament_id: TournamentId, round: u32, match_number: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            round,
            match_number,
            player1_id: None,
            player2_id: None,
            player1_score: 0,
            player2_score: 0,
            winner_id: None,
            status: MatchStatus::Pending,
            started_at: None,
            completed_at: None,
            created_at: now,
            version: 0,
        }
    }

    /// Create a pending match from a generated bracket slot
    pub fn from_slot(tournament_id: TournamentId, slot: &BracketSlot, now: DateTime<Utc>) -> Self {
        let mut m = Self::new(tournament_id, slot.round, slot.match_number, now);
        if let Some((p1, p2)) = slot.players {
            m.player1_id = Some(p1);
            m.player2_id = Some(p2);
        }
        m
    }

    /// Both participants, if assigned
    pub fn participants(&self) -> Option<(PlayerId, PlayerId)> {
        self.player1_id.zip(self.player2_id)
    }

    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.player1_id == Some(player_id) || self.player2_id == Some(player_id)
    }

    /// Assign both players. Only allowed while `pending`.
    pub fn set_players(&mut self, player1_id: PlayerId, player2_id: PlayerId) -> LeagueResult<()> {
        if self.status != MatchStatus::Pending {
            return Err(LeagueError::AlreadyStarted(EntityKind::Match));
        }
        if player1_id == player2_id {
            return Err(LeagueError::validation(
                "match players",
                "a player cannot play against themselves",
            ));
        }

        self.player1_id = Some(player1_id);
        self.player2_id = Some(player2_id);
        Ok(())
    }

    /// Transition `pending → in_progress`
    pub fn start(&mut self, now: DateTime<Utc>) -> LeagueResult<()> {
        if self.participants().is_none() {
            return Err(LeagueError::MissingPlayers);
        }
        if self.status != MatchStatus::Pending {
            return Err(LeagueError::AlreadyStarted(EntityKind::Match));
        }

        self.status = MatchStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// Replace the running score
    pub fn update_score(&mut self, player1_score: u32, player2_score: u32) -> LeagueResult<()> {
        if self.status != MatchStatus::InProgress {
            return Err(LeagueError::NotInProgress);
        }

        self.player1_score = player1_score;
        self.player2_score = player2_score;
        Ok(())
    }

    /// Transition `in_progress → completed`, fixing the winner
    ///
    /// # Errors
    ///
    /// * `LeagueError::NotInProgress` - Match is pending or already completed
    /// * `LeagueError::MissingPlayers` - A participant is unset
    /// * `LeagueError::InvalidWinner` - Winner is not a participant
    pub fn complete(&mut self, winner_id: PlayerId, now: DateTime<Utc>) -> LeagueResult<()> {
        if self.status != MatchStatus::InProgress {
            return Err(LeagueError::NotInProgress);
        }
        let (p1, p2) = self.participants().ok_or(LeagueError::MissingPlayers)?;
        if winner_id != p1 && winner_id != p2 {
            return Err(LeagueError::InvalidWinner(winner_id));
        }

        self.winner_id = Some(winner_id);
        self.status = MatchStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    /// The other participant. `Ok(None)` means the opponent slot is still empty.
    pub fn opponent_of(&self, player_id: PlayerId) -> LeagueResult<Option<PlayerId>> {
        if self.player1_id == Some(player_id) {
            return Ok(self.player2_id);
        }
        if self.player2_id == Some(player_id) {
            return Ok(self.player1_id);
        }
        Err(LeagueError::PlayerNotInMatch(player_id))
    }

    /// Losing participant of a completed match
    pub fn loser(&self) -> Option<PlayerId> {
        let winner = self.winner_id?;
        self.opponent_of(winner).ok().flatten()
    }
}
