//! League data models and the league state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{EntityKind, LeagueError, LeagueResult, require_name};
use crate::standings::Placement;

/// League ID type
pub type LeagueId = Uuid;

/// League status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeagueStatus {
    /// Enrolling players and scheduling tournaments
    Setup,
    /// Season underway
    Active,
    /// Season over; terminal
    Completed,
}

impl LeagueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeagueStatus::Setup => "setup",
            LeagueStatus::Active => "active",
            LeagueStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for LeagueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeagueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setup" => Ok(LeagueStatus::Setup),
            "active" => Ok(LeagueStatus::Active),
            "completed" => Ok(LeagueStatus::Completed),
            other => Err(format!("unknown league status: {other}")),
        }
    }
}

/// Points awarded per tournament placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsSchedule {
    pub win: i32,
    pub runner_up: i32,
    pub semi_final: i32,
}

impl PointsSchedule {
    /// Create a schedule, rejecting negative values
    pub fn new(win: i32, runner_up: i32, semi_final: i32) -> LeagueResult<Self> {
        if win < 0 || runner_up < 0 || semi_final < 0 {
            return Err(LeagueError::validation(
                "points schedule",
                format!("points must be non-negative, got {win}/{runner_up}/{semi_final}"),
            ));
        }
        Ok(Self {
            win,
            runner_up,
            semi_final,
        })
    }

    pub fn points_for(&self, placement: Placement) -> i32 {
        match placement {
            Placement::Winner => self.win,
            Placement::RunnerUp => self.runner_up,
            Placement::SemiFinalist => self.semi_final,
        }
    }
}

impl Default for PointsSchedule {
    fn default() -> Self {
        Self {
            win: 3,
            runner_up: 2,
            semi_final: 1,
        }
    }
}

/// A league season
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    pub name: String,
    pub description: Option<String>,
    pub season: Option<String>,
    pub status: LeagueStatus,
    pub points_for_win: i32,
    pub points_for_runner_up: i32,
    pub points_for_semi_final: i32,
    pub max_players: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl League {
    /// Create a league in `setup` with the default 3/2/1 points schedule
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        season: Option<String>,
        now: DateTime<Utc>,
    ) -> LeagueResult<Self> {
        let name = name.into();
        require_name("league name", &name)?;
        let points = PointsSchedule::default();

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description,
            season,
            status: LeagueStatus::Setup,
            points_for_win: points.win,
            points_for_runner_up: points.runner_up,
            points_for_semi_final: points.semi_final,
            max_players: None,
            start_date: None,
            end_date: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn with_points(mut self, points: PointsSchedule) -> Self {
        self.points_for_win = points.win;
        self.points_for_runner_up = points.runner_up;
        self.points_for_semi_final = points.semi_final;
        self
    }

    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = Some(max_players);
        self
    }

    pub fn points_schedule(&self) -> PointsSchedule {
        PointsSchedule {
            win: self.points_for_win,
            runner_up: self.points_for_runner_up,
            semi_final: self.points_for_semi_final,
        }
    }

    /// Transition `setup → active`
    pub fn start(&mut self, now: DateTime<Utc>) -> LeagueResult<()> {
        if self.status != LeagueStatus::Setup {
            return Err(LeagueError::AlreadyStarted(EntityKind::League));
        }

        self.status = LeagueStatus::Active;
        self.start_date = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Transition any non-terminal status to `completed`
    pub fn complete(&mut self, now: DateTime<Utc>) -> LeagueResult<()> {
        if self.status == LeagueStatus::Completed {
            return Err(LeagueError::AlreadyCompleted(EntityKind::League));
        }

        self.status = LeagueStatus::Completed;
        self.end_date = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn can_add_tournaments(&self) -> bool {
        matches!(self.status, LeagueStatus::Setup | LeagueStatus::Active)
    }
}
