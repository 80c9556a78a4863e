//! Wiring of every manager over one set of repositories.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::db::Repositories;
use crate::league::LeagueManager;
use crate::matches::MatchManager;
use crate::player::PlayerManager;
use crate::standings::StandingsAggregator;
use crate::tournament::{BracketGenerator, TournamentManager};

/// All league use cases sharing the same storage and clock
#[derive(Clone)]
pub struct LeagueServices {
    pub players: PlayerManager,
    pub leagues: LeagueManager,
    pub tournaments: TournamentManager,
    pub matches: MatchManager,
    pub standings: StandingsAggregator,
}

impl LeagueServices {
    /// Managers over `repos` using the wall clock
    pub fn new(repos: Repositories) -> Self {
        Self::with_clock(repos, Arc::new(SystemClock))
    }

    pub fn with_clock(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        let standings = StandingsAggregator::new(
            repos.standings.clone(),
            repos.leagues.clone(),
            repos.tournaments.clone(),
            repos.matches.clone(),
            clock.clone(),
        );

        Self {
            players: PlayerManager::new(repos.players.clone(), clock.clone()),
            leagues: LeagueManager::new(
                repos.leagues.clone(),
                repos.players.clone(),
                standings.clone(),
                clock.clone(),
            ),
            tournaments: TournamentManager::new(
                repos.tournaments.clone(),
                repos.leagues.clone(),
                repos.players.clone(),
                repos.matches.clone(),
                clock.clone(),
            ),
            matches: MatchManager::new(
                repos.matches,
                repos.tournaments,
                repos.players.clone(),
                clock,
            ),
            standings,
        }
    }

    /// Generate brackets with `bracket` instead of the placeholder
    pub fn with_bracket(mut self, bracket: Arc<dyn BracketGenerator>) -> Self {
        self.tournaments = self.tournaments.with_bracket(bracket);
        self
    }

    /// Managers over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Repositories::in_memory())
    }
}
