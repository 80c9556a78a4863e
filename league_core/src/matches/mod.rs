//! Matches: two-player contests inside a tournament.

pub mod manager;
pub mod models;

pub use manager::MatchManager;
pub use models::{Match, MatchId, MatchStatus};
