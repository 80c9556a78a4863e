//! Tournament data models and the tournament state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{EntityKind, LeagueError, LeagueResult, require_name};
use crate::league::{League, LeagueId};
use crate::player::PlayerId;

/// Tournament ID type
pub type TournamentId = Uuid;

/// Tournament type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentType {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
}

impl TournamentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentType::SingleElimination => "single_elimination",
            TournamentType::DoubleElimination => "double_elimination",
            TournamentType::RoundRobin => "round_robin",
        }
    }

    /// Whether players are knocked out (as opposed to playing everyone)
    pub fn is_elimination(&self) -> bool {
        !matches!(self, TournamentType::RoundRobin)
    }
}

impl fmt::Display for TournamentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_elimination" => Ok(TournamentType::SingleElimination),
            "double_elimination" => Ok(TournamentType::DoubleElimination),
            "round_robin" => Ok(TournamentType::RoundRobin),
            other => Err(format!("unknown tournament type: {other}")),
        }
    }
}

/// Tournament state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting entrants
    Setup,
    /// Bracket generated, matches being played
    InProgress,
    /// Finished; terminal
    Completed,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Setup => "setup",
            TournamentStatus::InProgress => "in_progress",
            TournamentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setup" => Ok(TournamentStatus::Setup),
            "in_progress" => Ok(TournamentStatus::InProgress),
            "completed" => Ok(TournamentStatus::Completed),
            other => Err(format!("unknown tournament status: {other}")),
        }
    }
}

/// Darts game played in each leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    #[serde(rename = "501")]
    X01From501,
    #[serde(rename = "301")]
    X01From301,
    #[serde(rename = "cricket")]
    Cricket,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::X01From501 => "501",
            GameType::X01From301 => "301",
            GameType::Cricket => "cricket",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "501" => Ok(GameType::X01From501),
            "301" => Ok(GameType::X01From301),
            "cricket" => Ok(GameType::Cricket),
            other => Err(format!("unknown game type: {other}")),
        }
    }
}

/// Per-match game format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameFormat {
    pub game_type: GameType,
    pub legs_per_match: u32,
    pub sets_per_match: u32,
}

impl GameFormat {
    fn validate(&self) -> LeagueResult<()> {
        if self.legs_per_match == 0 {
            return Err(LeagueError::validation("legs per match", "must be at least 1"));
        }
        if self.sets_per_match == 0 {
            return Err(LeagueError::validation("sets per match", "must be at least 1"));
        }
        Ok(())
    }
}

impl Default for GameFormat {
    fn default() -> Self {
        Self {
            game_type: GameType::X01From501,
            legs_per_match: 3,
            sets_per_match: 1,
        }
    }
}

/// Optional tournament parameters supplied at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentSettings {
    pub description: Option<String>,
    pub tournament_type: TournamentType,
    pub format: GameFormat,
    pub max_players: Option<u32>,
    /// Entry fee in cents
    pub entry_fee: Option<i64>,
    /// Prize pool in cents
    pub prize_pool: Option<i64>,
    pub scheduled_date: Option<DateTime<Utc>>,
}

impl TournamentSettings {
    pub fn new(tournament_type: TournamentType) -> Self {
        Self {
            description: None,
            tournament_type,
            format: GameFormat::default(),
            max_players: None,
            entry_fee: None,
            prize_pool: None,
            scheduled_date: None,
        }
    }

    pub fn single_elimination() -> Self {
        Self::new(TournamentType::SingleElimination)
    }

    pub fn round_robin() -> Self {
        Self::new(TournamentType::RoundRobin)
    }

    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = Some(max_players);
        self
    }

    pub fn with_format(mut self, format: GameFormat) -> Self {
        self.format = format;
        self
    }
}

/// A tournament within a league
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub league_id: LeagueId,
    pub name: String,
    pub description: Option<String>,
    pub tournament_type: TournamentType,
    pub status: TournamentStatus,
    pub format: GameFormat,
    /// Sequential per league, starting at 1
    pub tournament_number: u32,
    pub max_players: Option<u32>,
    pub entry_fee: Option<i64>,
    pub prize_pool: Option<i64>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set once the placements have been credited to the league standings
    pub results_applied_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Tournament {
    /// Create a tournament inside `league`
    ///
    /// # Errors
    ///
    /// * `LeagueError::LeagueNotAcceptingTournaments` - League is completed
    /// * `LeagueError::Validation` - Empty name or invalid game format
    pub fn new(
        league: &League,
        name: impl Into<String>,
        settings: TournamentSettings,
        tournament_number: u32,
        now: DateTime<Utc>,
    ) -> LeagueResult<Self> {
        if !league.can_add_tournaments() {
            return Err(LeagueError::LeagueNotAcceptingTournaments {
                league_id: league.id,
                status: league.status,
            });
        }

        let name = name.into();
        require_name("tournament name", &name)?;
        settings.format.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            league_id: league.id,
            name,
            description: settings.description,
            tournament_type: settings.tournament_type,
            status: TournamentStatus::Setup,
            format: settings.format,
            tournament_number,
            max_players: settings.max_players,
            entry_fee: settings.entry_fee,
            prize_pool: settings.prize_pool,
            scheduled_date: settings.scheduled_date,
            created_at: now,
            started_at: None,
            completed_at: None,
            results_applied_at: None,
            version: 0,
        })
    }

    pub fn can_add_players(&self) -> bool {
        self.status == TournamentStatus::Setup
    }

    /// Fails with `AlreadyStarted` once the tournament has left `setup`
    pub fn ensure_accepting_players(&self) -> LeagueResult<()> {
        if !self.can_add_players() {
            return Err(LeagueError::AlreadyStarted(EntityKind::Tournament));
        }
        Ok(())
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == TournamentStatus::InProgress
    }

    /// Transition `setup → in_progress`
    pub fn start(&mut self, now: DateTime<Utc>) -> LeagueResult<()> {
        if self.status != TournamentStatus::Setup {
            return Err(LeagueError::AlreadyStarted(EntityKind::Tournament));
        }

        self.status = TournamentStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// Undo a start whose bracket could not be stored
    pub(crate) fn revert_start(&mut self) {
        self.status = TournamentStatus::Setup;
        self.started_at = None;
    }

    /// Transition any non-terminal status to `completed`
    pub fn complete(&mut self, now: DateTime<Utc>) -> LeagueResult<()> {
        if self.status == TournamentStatus::Completed {
            return Err(LeagueError::AlreadyCompleted(EntityKind::Tournament));
        }

        self.status = TournamentStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Record that placements were credited to the standings
    pub fn mark_results_applied(&mut self, now: DateTime<Utc>) -> LeagueResult<()> {
        if self.status != TournamentStatus::Completed {
            return Err(LeagueError::TournamentNotCompleted(self.id));
        }
        if self.results_applied_at.is_some() {
            return Err(LeagueError::ResultsAlreadyApplied(self.id));
        }

        self.results_applied_at = Some(now);
        Ok(())
    }
}

/// Tournament entrant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentEntry {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    /// Bracket priority, 1 = top seed
    pub seed: Option<u32>,
    pub joined_at: DateTime<Utc>,
}
