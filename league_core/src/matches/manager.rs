//! Match manager: player assignment, scoring and completion.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::models::{Match, MatchId};
use crate::clock::Clock;
use crate::db::{MatchRepository, PlayerRepository, TournamentRepository};
use crate::errors::{EntityKind, LeagueError, LeagueResult, StoreResultExt};
use crate::player::PlayerId;
use crate::tournament::TournamentId;

/// Match manager
#[derive(Clone)]
pub struct MatchManager {
    matches: Arc<dyn MatchRepository>,
    tournaments: Arc<dyn TournamentRepository>,
    players: Arc<dyn PlayerRepository>,
    clock: Arc<dyn Clock>,
}

impl MatchManager {
    pub fn new(
        matches: Arc<dyn MatchRepository>,
        tournaments: Arc<dyn TournamentRepository>,
        players: Arc<dyn PlayerRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            matches,
            tournaments,
            players,
            clock,
        }
    }

    /// Create a pending match outside bracket generation
    pub async fn create_match(
        &self,
        tournament_id: TournamentId,
        round: u32,
        match_number: u32,
    ) -> LeagueResult<Match> {
        self.ensure_tournament(tournament_id).await?;

        let m = Match::new(tournament_id, round, match_number, self.clock.now());
        self.matches
            .create(&m)
            .await
            .for_entity(EntityKind::Match, m.id)?;

        log::debug!("Created match {} (round {round}, #{match_number})", m.id);
        Ok(m)
    }

    pub async fn get_match(&self, id: MatchId) -> LeagueResult<Match> {
        self.matches
            .get_by_id(id)
            .await
            .for_entity(EntityKind::Match, id)
    }

    /// Matches of a tournament ordered by round and match number
    pub async fn list_tournament_matches(&self, tournament_id: TournamentId) -> LeagueResult<Vec<Match>> {
        self.ensure_tournament(tournament_id).await?;
        self.matches
            .get_by_tournament_id(tournament_id)
            .await
            .map_err(LeagueError::Storage)
    }

    /// A player's matches across every tournament, oldest first
    ///
    /// # Errors
    ///
    /// * `LeagueError::NotFound` - Player does not exist
    pub async fn list_player_matches(
        &self,
        player_id: PlayerId,
        limit: u32,
        offset: u32,
    ) -> LeagueResult<Vec<Match>> {
        self.players
            .get_by_id(player_id)
            .await
            .for_entity(EntityKind::Player, player_id)?;
        self.matches
            .get_by_player_id(player_id, limit, offset)
            .await
            .map_err(LeagueError::Storage)
    }

    pub async fn assign_players(
        &self,
        id: MatchId,
        player1_id: PlayerId,
        player2_id: PlayerId,
    ) -> LeagueResult<Match> {
        self.mutate(id, |m, _| m.set_players(player1_id, player2_id))
            .await
    }

    pub async fn start_match(&self, id: MatchId) -> LeagueResult<Match> {
        let m = self.mutate(id, |m, now| m.start(now)).await?;
        log::info!("Match {id} started");
        Ok(m)
    }

    /// Assign both players and start in one step
    pub async fn start_match_with_players(
        &self,
        id: MatchId,
        player1_id: PlayerId,
        player2_id: PlayerId,
    ) -> LeagueResult<Match> {
        let m = self
            .mutate(id, |m, now| {
                m.set_players(player1_id, player2_id)?;
                m.start(now)
            })
            .await?;
        log::info!("Match {id} started: {player1_id} vs {player2_id}");
        Ok(m)
    }

    /// Overwrite the running score
    pub async fn update_score(
        &self,
        id: MatchId,
        player1_score: u32,
        player2_score: u32,
    ) -> LeagueResult<Match> {
        self.mutate(id, |m, _| m.update_score(player1_score, player2_score))
            .await
    }

    /// Finish a match with `winner_id`
    ///
    /// Standings are not touched; they are credited per tournament through
    /// `StandingsAggregator::apply_tournament_result`.
    pub async fn complete_match(&self, id: MatchId, winner_id: PlayerId) -> LeagueResult<Match> {
        let m = self.mutate(id, |m, now| m.complete(winner_id, now)).await?;
        log::info!("Match {id} won by {winner_id}");
        Ok(m)
    }

    /// The opponent of `player_id`, `None` if their slot is still empty
    pub async fn get_opponent(&self, id: MatchId, player_id: PlayerId) -> LeagueResult<Option<PlayerId>> {
        self.get_match(id).await?.opponent_of(player_id)
    }

    /// Load, apply a transition and save. A failed transition stores nothing.
    async fn mutate<F>(&self, id: MatchId, apply: F) -> LeagueResult<Match>
    where
        F: FnOnce(&mut Match, DateTime<Utc>) -> LeagueResult<()>,
    {
        let mut m = self.get_match(id).await?;
        apply(&mut m, self.clock.now())?;
        m.version = self
            .matches
            .update(&m)
            .await
            .for_entity(EntityKind::Match, id)?;
        Ok(m)
    }

    async fn ensure_tournament(&self, tournament_id: TournamentId) -> LeagueResult<()> {
        self.tournaments
            .get_by_id(tournament_id)
            .await
            .for_entity(EntityKind::Tournament, tournament_id)?;
        Ok(())
    }
}
