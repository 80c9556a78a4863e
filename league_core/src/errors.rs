//! Domain error types shared by every aggregate.

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::db::StoreError;
use crate::league::LeagueStatus;

/// Entity kinds referenced by error payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    League,
    Tournament,
    Match,
    Standing,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Player => write!(f, "player"),
            EntityKind::League => write!(f, "league"),
            EntityKind::Tournament => write!(f, "tournament"),
            EntityKind::Match => write!(f, "match"),
            EntityKind::Standing => write!(f, "standing"),
        }
    }
}

/// Coarse classification of a [`LeagueError`], for callers that only care
/// about the category of failure (e.g. mapping to a status code).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidWinner,
    MissingPlayers,
    PlayerNotInMatch,
    Validation,
    Duplicate,
    ConcurrentModification,
    Storage,
}

/// League domain errors
#[derive(Debug, Error)]
pub enum LeagueError {
    /// Referenced entity does not exist
    #[error("{entity} not found: {key}")]
    NotFound { entity: EntityKind, key: String },

    #[error("{0} has already started")]
    AlreadyStarted(EntityKind),

    #[error("{0} is already completed")]
    AlreadyCompleted(EntityKind),

    #[error("match is not in progress")]
    NotInProgress,

    #[error("league {league_id} is not accepting tournaments (status: {status})")]
    LeagueNotAcceptingTournaments {
        league_id: Uuid,
        status: LeagueStatus,
    },

    #[error("tournament {0} is not completed")]
    TournamentNotCompleted(Uuid),

    #[error("results for tournament {0} have already been applied")]
    ResultsAlreadyApplied(Uuid),

    #[error("winner {0} is not one of the match participants")]
    InvalidWinner(Uuid),

    #[error("match requires both players to be set")]
    MissingPlayers,

    #[error("player {0} is not participating in this match")]
    PlayerNotInMatch(Uuid),

    /// A required field is empty or out of range
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{entity} is full: maximum {max} players")]
    CapacityReached { entity: EntityKind, max: u32 },

    #[error("player {player_id} is not enrolled in league {league_id}")]
    PlayerNotInLeague { league_id: Uuid, player_id: Uuid },

    #[error("email already registered: {0}")]
    EmailTaken(String),

    #[error("need at least {needed} players, have {current}")]
    NotEnoughPlayers { needed: usize, current: usize },

    #[error("player {player_id} is already enrolled in league {league_id}")]
    AlreadyEnrolled { league_id: Uuid, player_id: Uuid },

    /// Scoring key was already applied to the standings
    #[error("duplicate scoring event: {0}")]
    DuplicateScoringEvent(String),

    /// Other records still point at the entity
    #[error("{entity} {key} is still referenced by {by}")]
    InUse {
        entity: EntityKind,
        key: String,
        by: &'static str,
    },

    /// Optimistic version check failed; reload and retry
    #[error("{entity} {key} was modified concurrently")]
    ConcurrentModification { entity: EntityKind, key: String },

    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),
}

impl LeagueError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LeagueError::NotFound { .. } => ErrorKind::NotFound,
            LeagueError::AlreadyStarted(_)
            | LeagueError::AlreadyCompleted(_)
            | LeagueError::NotInProgress
            | LeagueError::LeagueNotAcceptingTournaments { .. }
            | LeagueError::TournamentNotCompleted(_)
            | LeagueError::ResultsAlreadyApplied(_)
            | LeagueError::InUse { .. } => ErrorKind::InvalidState,
            LeagueError::InvalidWinner(_) => ErrorKind::InvalidWinner,
            LeagueError::MissingPlayers => ErrorKind::MissingPlayers,
            LeagueError::PlayerNotInMatch(_) => ErrorKind::PlayerNotInMatch,
            LeagueError::Validation { .. }
            | LeagueError::CapacityReached { .. }
            | LeagueError::PlayerNotInLeague { .. }
            | LeagueError::EmailTaken(_)
            | LeagueError::NotEnoughPlayers { .. } => ErrorKind::Validation,
            LeagueError::AlreadyEnrolled { .. } | LeagueError::DuplicateScoringEvent(_) => {
                ErrorKind::Duplicate
            }
            LeagueError::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            LeagueError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            LeagueError::Storage(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Translate a storage failure for the given entity into a domain error
    pub fn from_store(err: StoreError, entity: EntityKind, key: impl ToString) -> Self {
        match err {
            StoreError::NotFound => LeagueError::NotFound {
                entity,
                key: key.to_string(),
            },
            StoreError::Conflict => LeagueError::ConcurrentModification {
                entity,
                key: key.to_string(),
            },
            StoreError::Referenced(by) => LeagueError::InUse {
                entity,
                key: key.to_string(),
                by,
            },
            other => LeagueError::Storage(other),
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        LeagueError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for league operations
pub type LeagueResult<T> = Result<T, LeagueError>;

/// Maps port results into domain results for a known entity
pub(crate) trait StoreResultExt<T> {
    fn for_entity(self, entity: EntityKind, key: impl ToString) -> LeagueResult<T>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn for_entity(self, entity: EntityKind, key: impl ToString) -> LeagueResult<T> {
        self.map_err(|err| LeagueError::from_store(err, entity, key))
    }
}

/// Reject empty (or whitespace-only) names
pub(crate) fn require_name(field: &'static str, name: &str) -> LeagueResult<()> {
    if name.trim().is_empty() {
        return Err(LeagueError::validation(field, "cannot be empty"));
    }
    Ok(())
}
