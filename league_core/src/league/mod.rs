//! Leagues: seasons that group tournaments and own the standings.

pub mod manager;
pub mod models;

pub use manager::{LeagueManager, NewLeague};
pub use models::{League, LeagueId, LeagueStatus, PointsSchedule};
