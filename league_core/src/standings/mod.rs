//! League standings: per-player points and positions within a league.

pub mod aggregator;
pub mod models;

pub use aggregator::StandingsAggregator;
pub use models::{
    LeagueStanding, Placement, PositionUpdate, StandingDelta, TournamentPlacements,
    rank_standings,
};
