//! League standings aggregation.
//!
//! Standings change in two ways: enrolment creates a zeroed row, and applying
//! a completed tournament credits its placements. Every credit is stored under
//! a scoring key, so replaying a tournament never double-counts.

use std::collections::HashSet;
use std::sync::Arc;

use super::models::{LeagueStanding, StandingDelta, TournamentPlacements, rank_standings};
use crate::clock::Clock;
use crate::db::{
    LeagueRepository, MatchRepository, StandingsRepository, StoreError, TournamentRepository,
};
use crate::errors::{EntityKind, LeagueError, LeagueResult, StoreResultExt};
use crate::league::LeagueId;
use crate::player::PlayerId;
use crate::tournament::{TournamentId, TournamentStatus};

/// Maintains one standing row per enrolled player
#[derive(Clone)]
pub struct StandingsAggregator {
    standings: Arc<dyn StandingsRepository>,
    leagues: Arc<dyn LeagueRepository>,
    tournaments: Arc<dyn TournamentRepository>,
    matches: Arc<dyn MatchRepository>,
    clock: Arc<dyn Clock>,
}

impl StandingsAggregator {
    pub fn new(
        standings: Arc<dyn StandingsRepository>,
        leagues: Arc<dyn LeagueRepository>,
        tournaments: Arc<dyn TournamentRepository>,
        matches: Arc<dyn MatchRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            standings,
            leagues,
            tournaments,
            matches,
            clock,
        }
    }

    /// Create a zeroed standing row
    ///
    /// # Errors
    ///
    /// * `LeagueError::AlreadyEnrolled` - The row already exists
    pub async fn enroll(&self, league_id: LeagueId, player_id: PlayerId) -> LeagueResult<LeagueStanding> {
        let standing = LeagueStanding::new(league_id, player_id, self.clock.now());
        match self.standings.create(&standing).await {
            Ok(()) => Ok(standing),
            Err(StoreError::Duplicate(_)) => Err(LeagueError::AlreadyEnrolled {
                league_id,
                player_id,
            }),
            Err(e) => Err(LeagueError::from_store(e, EntityKind::League, league_id)),
        }
    }

    /// Remove a player's standing row
    pub async fn remove(&self, league_id: LeagueId, player_id: PlayerId) -> LeagueResult<()> {
        self.standings
            .delete(league_id, player_id)
            .await
            .for_entity(EntityKind::Standing, format!("{league_id}:{player_id}"))
    }

    /// Credit `points` to a player once per `scoring_key`
    ///
    /// # Errors
    ///
    /// * `LeagueError::DuplicateScoringEvent` - The key was already applied
    /// * `LeagueError::NotFound` - The player has no standing in the league
    pub async fn add_points(
        &self,
        league_id: LeagueId,
        player_id: PlayerId,
        points: i32,
        scoring_key: &str,
    ) -> LeagueResult<LeagueStanding> {
        self.apply_delta(league_id, &StandingDelta::points(player_id, points), scoring_key)
            .await
    }

    async fn apply_delta(
        &self,
        league_id: LeagueId,
        delta: &StandingDelta,
        scoring_key: &str,
    ) -> LeagueResult<LeagueStanding> {
        match self.standings.add_points(league_id, delta, scoring_key).await {
            Ok(standing) => Ok(standing),
            Err(StoreError::Duplicate(key)) => Err(LeagueError::DuplicateScoringEvent(key)),
            Err(e) => Err(LeagueError::from_store(
                e,
                EntityKind::Standing,
                format!("{league_id}:{}", delta.player_id),
            )),
        }
    }

    /// Re-rank a league and return the standings in their new order
    pub async fn recalculate_positions(&self, league_id: LeagueId) -> LeagueResult<Vec<LeagueStanding>> {
        let rows = self
            .standings
            .list_by_enrollment(league_id)
            .await
            .map_err(LeagueError::Storage)?;
        let updates = rank_standings(&rows);

        self.standings
            .recalculate_positions(league_id, &updates)
            .await
            .for_entity(EntityKind::League, league_id)?;

        // Reorder the loaded rows instead of reading them back
        let mut ranked = Vec::with_capacity(rows.len());
        for update in &updates {
            if let Some(row) = rows.iter().find(|s| s.player_id == update.player_id) {
                let mut row = row.clone();
                row.current_position = update.current_position;
                row.previous_position = update.previous_position;
                ranked.push(row);
            }
        }

        log::debug!("Recalculated {} positions in league {league_id}", ranked.len());
        Ok(ranked)
    }

    /// Ranked standings of a league
    pub async fn standings(&self, league_id: LeagueId) -> LeagueResult<Vec<LeagueStanding>> {
        self.standings
            .get_league_standings(league_id)
            .await
            .map_err(LeagueError::Storage)
    }

    /// Credit a completed tournament's placements to its league
    ///
    /// Every entrant gets a tournament played; placed players also get the
    /// league's points for their placement. Positions are recalculated
    /// afterwards.
    ///
    /// # Errors
    ///
    /// * `LeagueError::TournamentNotCompleted` - Tournament still running
    /// * `LeagueError::ResultsAlreadyApplied` - Already credited
    /// * `LeagueError::Validation` - Placements cannot be derived from the matches
    pub async fn apply_tournament_result(
        &self,
        tournament_id: TournamentId,
    ) -> LeagueResult<Vec<LeagueStanding>> {
        let mut tournament = self
            .tournaments
            .get_by_id(tournament_id)
            .await
            .for_entity(EntityKind::Tournament, tournament_id)?;
        if tournament.status != TournamentStatus::Completed {
            return Err(LeagueError::TournamentNotCompleted(tournament_id));
        }
        if tournament.results_applied_at.is_some() {
            return Err(LeagueError::ResultsAlreadyApplied(tournament_id));
        }

        let league = self
            .leagues
            .get_by_id(tournament.league_id)
            .await
            .for_entity(EntityKind::League, tournament.league_id)?;
        let matches = self
            .matches
            .get_by_tournament_id(tournament_id)
            .await
            .map_err(LeagueError::Storage)?;
        let placements = TournamentPlacements::from_matches(tournament.tournament_type, &matches)?;

        let entrants = self
            .tournaments
            .list_players(tournament_id)
            .await
            .map_err(LeagueError::Storage)?;
        let mut credited = HashSet::new();
        let players = entrants
            .iter()
            .map(|e| e.player_id)
            .chain(placements.placed_players())
            .filter(|p| credited.insert(*p))
            .collect::<Vec<_>>();

        // Entrants who left the league since have no row to credit
        let mut on_table = Vec::with_capacity(players.len());
        for player_id in players {
            match self.standings.get(league.id, player_id).await {
                Ok(_) => on_table.push(player_id),
                Err(StoreError::NotFound) => log::warn!(
                    "Player {player_id} has no standing in league {}, not credited for tournament {tournament_id}",
                    league.id
                ),
                Err(e) => return Err(LeagueError::Storage(e)),
            }
        }

        let schedule = league.points_schedule();
        for player_id in on_table {
            let delta =
                StandingDelta::for_tournament(player_id, placements.placement_of(player_id), &schedule);
            let key = format!("{tournament_id}:{player_id}");
            match self.apply_delta(league.id, &delta, &key).await {
                Ok(_) => {}
                // A previous attempt stopped part-way; this player is already credited
                Err(LeagueError::DuplicateScoringEvent(_)) => {
                    log::debug!("Scoring event {key} already applied, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        tournament.mark_results_applied(self.clock.now())?;
        self.tournaments
            .update(&tournament)
            .await
            .for_entity(EntityKind::Tournament, tournament_id)?;

        log::info!(
            "Applied results of tournament {tournament_id} to league {} (winner: {:?})",
            league.id,
            placements.winner
        );
        self.recalculate_positions(league.id).await
    }
}
