//! Repository trait definitions for testability and dependency injection.
//!
//! These are the storage ports the managers consume. Every method reports a
//! missing row as [`StoreError::NotFound`](super::StoreError::NotFound);
//! `update` methods perform an optimistic version check and return the new
//! version, or [`StoreError::Conflict`](super::StoreError::Conflict) when the
//! stored version moved on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::errors::StoreResult;
use crate::league::{League, LeagueId};
use crate::matches::{Match, MatchId};
use crate::player::{Player, PlayerId};
use crate::standings::{LeagueStanding, PositionUpdate, StandingDelta};
use crate::tournament::{Tournament, TournamentEntry, TournamentId};

/// Trait for player repository operations
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Insert a new player. A taken email yields `Duplicate`.
    async fn create(&self, player: &Player) -> StoreResult<()>;

    async fn get_by_id(&self, id: PlayerId) -> StoreResult<Player>;

    async fn get_by_email(&self, email: &str) -> StoreResult<Player>;

    /// Players ordered by creation time
    async fn list(&self, limit: u32, offset: u32) -> StoreResult<Vec<Player>>;

    /// Persist `player` if its version is current; returns the new version
    async fn update(&self, player: &Player) -> StoreResult<i64>;

    async fn delete(&self, id: PlayerId) -> StoreResult<()>;

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool>;
}

/// Trait for league repository operations
#[async_trait]
pub trait LeagueRepository: Send + Sync {
    async fn create(&self, league: &League) -> StoreResult<()>;

    async fn get_by_id(&self, id: LeagueId) -> StoreResult<League>;

    /// Leagues ordered by creation time
    async fn list(&self) -> StoreResult<Vec<League>>;

    async fn update(&self, league: &League) -> StoreResult<i64>;

    /// Enrol a player. An existing membership yields `Duplicate`.
    async fn add_player(
        &self,
        league_id: LeagueId,
        player_id: PlayerId,
        joined_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn remove_player(&self, league_id: LeagueId, player_id: PlayerId) -> StoreResult<()>;

    async fn is_player_in_league(&self, league_id: LeagueId, player_id: PlayerId)
    -> StoreResult<bool>;

    async fn player_count(&self, league_id: LeagueId) -> StoreResult<u32>;
}

/// Trait for tournament repository operations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Insert a tournament. A taken `(league_id, tournament_number)` yields `Conflict`.
    async fn create(&self, tournament: &Tournament) -> StoreResult<()>;

    async fn get_by_id(&self, id: TournamentId) -> StoreResult<Tournament>;

    /// Tournaments of a league ordered by number
    async fn list_by_league(&self, league_id: LeagueId) -> StoreResult<Vec<Tournament>>;

    async fn update(&self, tournament: &Tournament) -> StoreResult<i64>;

    /// Highest existing number in the league plus one
    async fn next_tournament_number(&self, league_id: LeagueId) -> StoreResult<u32>;

    /// Enrol an entrant. An existing entry yields `Duplicate`.
    async fn add_player(&self, entry: &TournamentEntry) -> StoreResult<()>;

    async fn remove_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<()>;

    async fn is_player_in_tournament(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool>;

    /// Entrants in enrolment order
    async fn list_players(&self, tournament_id: TournamentId) -> StoreResult<Vec<TournamentEntry>>;

    async fn player_count(&self, tournament_id: TournamentId) -> StoreResult<u32>;
}

/// Trait for match repository operations
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn create(&self, m: &Match) -> StoreResult<()>;

    /// Insert all matches or none
    async fn create_many(&self, matches: &[Match]) -> StoreResult<()>;

    async fn get_by_id(&self, id: MatchId) -> StoreResult<Match>;

    async fn update(&self, m: &Match) -> StoreResult<i64>;

    /// Matches of a tournament ordered by round, then match number
    async fn get_by_tournament_id(&self, tournament_id: TournamentId) -> StoreResult<Vec<Match>>;

    /// Matches `player_id` is assigned to in any tournament, oldest first
    async fn get_by_player_id(
        &self,
        player_id: PlayerId,
        limit: u32,
        offset: u32,
    ) -> StoreResult<Vec<Match>>;
}

/// Trait for league standings repository operations
#[async_trait]
pub trait StandingsRepository: Send + Sync {
    /// Insert a standing row. An existing `(league, player)` row yields `Duplicate`.
    async fn create(&self, standing: &LeagueStanding) -> StoreResult<()>;

    async fn get(&self, league_id: LeagueId, player_id: PlayerId) -> StoreResult<LeagueStanding>;

    /// Rows ordered by total points descending, ties by enrolment order
    async fn get_league_standings(&self, league_id: LeagueId) -> StoreResult<Vec<LeagueStanding>>;

    /// Rows in enrolment order
    async fn list_by_enrollment(&self, league_id: LeagueId) -> StoreResult<Vec<LeagueStanding>>;

    /// Apply `delta` once per `scoring_key`; a repeated key yields `Duplicate`
    async fn add_points(
        &self,
        league_id: LeagueId,
        delta: &StandingDelta,
        scoring_key: &str,
    ) -> StoreResult<LeagueStanding>;

    /// Store a computed ordering for the whole league
    async fn recalculate_positions(
        &self,
        league_id: LeagueId,
        updates: &[PositionUpdate],
    ) -> StoreResult<()>;

    async fn delete(&self, league_id: LeagueId, player_id: PlayerId) -> StoreResult<()>;
}
