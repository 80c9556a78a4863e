//! Tournament manager for creating tournaments, enrolling entrants and
//! generating brackets.

use std::sync::Arc;

use super::bracket::{BracketGenerator, PlaceholderBracket};
use super::models::{Tournament, TournamentEntry, TournamentId, TournamentSettings};
use crate::clock::Clock;
use crate::db::{
    LeagueRepository, MatchRepository, PlayerRepository, StoreError, TournamentRepository,
};
use crate::errors::{EntityKind, LeagueError, LeagueResult, StoreResultExt};
use crate::league::LeagueId;
use crate::matches::{Match, MatchStatus};
use crate::player::PlayerId;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    tournaments: Arc<dyn TournamentRepository>,
    leagues: Arc<dyn LeagueRepository>,
    players: Arc<dyn PlayerRepository>,
    matches: Arc<dyn MatchRepository>,
    bracket: Arc<dyn BracketGenerator>,
    clock: Arc<dyn Clock>,
}

impl TournamentManager {
    /// Create a new tournament manager using [`PlaceholderBracket`]
    ///
    /// Use [`TournamentManager::with_bracket`] with
    /// [`SeededBracket`](super::SeededBracket) to pair entrants on start.
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        leagues: Arc<dyn LeagueRepository>,
        players: Arc<dyn PlayerRepository>,
        matches: Arc<dyn MatchRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tournaments,
            leagues,
            players,
            matches,
            bracket: Arc::new(PlaceholderBracket),
            clock,
        }
    }

    /// Replace the bracket strategy
    pub fn with_bracket(mut self, bracket: Arc<dyn BracketGenerator>) -> Self {
        self.bracket = bracket;
        self
    }

    /// Create a tournament with the next free number in the league
    ///
    /// # Errors
    ///
    /// * `LeagueError::NotFound` - League does not exist
    /// * `LeagueError::LeagueNotAcceptingTournaments` - League is completed
    /// * `LeagueError::ConcurrentModification` - Another tournament took the number first
    pub async fn create_tournament(
        &self,
        league_id: LeagueId,
        name: impl Into<String>,
        settings: TournamentSettings,
    ) -> LeagueResult<Tournament> {
        let league = self
            .leagues
            .get_by_id(league_id)
            .await
            .for_entity(EntityKind::League, league_id)?;
        let number = self
            .tournaments
            .next_tournament_number(league_id)
            .await
            .map_err(LeagueError::Storage)?;

        let tournament = Tournament::new(&league, name, settings, number, self.clock.now())?;
        match self.tournaments.create(&tournament).await {
            Ok(()) => {}
            Err(StoreError::Conflict | StoreError::Duplicate(_)) => {
                return Err(LeagueError::ConcurrentModification {
                    entity: EntityKind::Tournament,
                    key: format!("{league_id}#{number}"),
                });
            }
            Err(e) => return Err(LeagueError::from_store(e, EntityKind::League, league_id)),
        }

        log::info!(
            "Created tournament {} #{number} ({}) in league {league_id}",
            tournament.id,
            tournament.tournament_type
        );
        Ok(tournament)
    }

    pub async fn get_tournament(&self, id: TournamentId) -> LeagueResult<Tournament> {
        self.tournaments
            .get_by_id(id)
            .await
            .for_entity(EntityKind::Tournament, id)
    }

    /// Tournaments of a league ordered by number
    pub async fn list_league_tournaments(&self, league_id: LeagueId) -> LeagueResult<Vec<Tournament>> {
        self.leagues
            .get_by_id(league_id)
            .await
            .for_entity(EntityKind::League, league_id)?;
        self.tournaments
            .list_by_league(league_id)
            .await
            .map_err(LeagueError::Storage)
    }

    /// Enrol a league member into a tournament that is still in setup
    ///
    /// Adding a player who is already entered is a no-op.
    ///
    /// # Errors
    ///
    /// * `LeagueError::AlreadyStarted` - Tournament left setup
    /// * `LeagueError::PlayerNotInLeague` - Player is not enrolled in the tournament's league
    /// * `LeagueError::CapacityReached` - Tournament is at `max_players`
    pub async fn add_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        seed: Option<u32>,
    ) -> LeagueResult<()> {
        let tournament = self.get_tournament(tournament_id).await?;
        tournament.ensure_accepting_players()?;

        self.players
            .get_by_id(player_id)
            .await
            .for_entity(EntityKind::Player, player_id)?;
        let in_league = self
            .leagues
            .is_player_in_league(tournament.league_id, player_id)
            .await
            .map_err(LeagueError::Storage)?;
        if !in_league {
            return Err(LeagueError::PlayerNotInLeague {
                league_id: tournament.league_id,
                player_id,
            });
        }

        let entered = self
            .tournaments
            .is_player_in_tournament(tournament_id, player_id)
            .await
            .map_err(LeagueError::Storage)?;
        if entered {
            log::debug!("Player {player_id} already entered in tournament {tournament_id}");
            return Ok(());
        }

        if let Some(max) = tournament.max_players {
            let count = self
                .tournaments
                .player_count(tournament_id)
                .await
                .map_err(LeagueError::Storage)?;
            if count >= max {
                return Err(LeagueError::CapacityReached {
                    entity: EntityKind::Tournament,
                    max,
                });
            }
        }

        let entry = TournamentEntry {
            tournament_id,
            player_id,
            seed,
            joined_at: self.clock.now(),
        };
        match self.tournaments.add_player(&entry).await {
            Ok(()) | Err(StoreError::Duplicate(_)) => {}
            Err(e) => return Err(LeagueError::from_store(e, EntityKind::Tournament, tournament_id)),
        }

        log::info!("Player {player_id} entered tournament {tournament_id}");
        Ok(())
    }

    /// Withdraw a player while the tournament is in setup
    pub async fn remove_player(&self, tournament_id: TournamentId, player_id: PlayerId) -> LeagueResult<()> {
        let tournament = self.get_tournament(tournament_id).await?;
        tournament.ensure_accepting_players()?;

        self.tournaments
            .remove_player(tournament_id, player_id)
            .await
            .for_entity(EntityKind::Player, player_id)?;
        log::info!("Player {player_id} withdrew from tournament {tournament_id}");
        Ok(())
    }

    /// Entrants in enrolment order
    pub async fn list_players(&self, tournament_id: TournamentId) -> LeagueResult<Vec<TournamentEntry>> {
        self.get_tournament(tournament_id).await?;
        self.tournaments
            .list_players(tournament_id)
            .await
            .map_err(LeagueError::Storage)
    }

    /// Start a tournament and create its bracket
    ///
    /// The bracket is generated before anything is stored, so a generation
    /// failure leaves the tournament in setup. If storing the matches fails
    /// the tournament is moved back to setup. Matches that already exist are
    /// kept and no new ones are generated.
    ///
    /// Returns the started tournament and its matches.
    pub async fn start_tournament(&self, id: TournamentId) -> LeagueResult<(Tournament, Vec<Match>)> {
        let mut tournament = self.get_tournament(id).await?;
        let now = self.clock.now();
        tournament.start(now)?;

        let existing = self
            .matches
            .get_by_tournament_id(id)
            .await
            .map_err(LeagueError::Storage)?;
        let bracket: Vec<Match> = if existing.is_empty() {
            let entrants = self
                .tournaments
                .list_players(id)
                .await
                .map_err(LeagueError::Storage)?;
            self.bracket
                .generate(&tournament, &entrants)?
                .iter()
                .map(|slot| Match::from_slot(id, slot, now))
                .collect()
        } else {
            log::debug!(
                "Tournament {id} already has {} matches, skipping bracket generation",
                existing.len()
            );
            Vec::new()
        };

        self.save(&mut tournament).await?;

        if !bracket.is_empty() {
            if let Err(e) = self.matches.create_many(&bracket).await {
                log::warn!("Storing bracket for tournament {id} failed, reverting start: {e}");
                tournament.revert_start();
                if let Err(revert) = self.save(&mut tournament).await {
                    log::error!("Could not revert start of tournament {id}: {revert}");
                }
                return Err(LeagueError::from_store(e, EntityKind::Tournament, id));
            }
        }

        log::info!(
            "Tournament {id} started with {} matches",
            existing.len() + bracket.len()
        );
        let matches = if bracket.is_empty() { existing } else { bracket };
        Ok((tournament, matches))
    }

    /// Finish a tournament
    ///
    /// Unfinished matches do not block completion; they are only logged.
    pub async fn complete_tournament(&self, id: TournamentId) -> LeagueResult<Tournament> {
        let mut tournament = self.get_tournament(id).await?;
        tournament.complete(self.clock.now())?;

        let unfinished = self
            .matches
            .get_by_tournament_id(id)
            .await
            .map_err(LeagueError::Storage)?
            .iter()
            .filter(|m| m.status != MatchStatus::Completed)
            .count();
        if unfinished > 0 {
            log::warn!("Completing tournament {id} with {unfinished} unfinished matches");
        }

        self.save(&mut tournament).await?;
        log::info!("Tournament {id} completed");
        Ok(tournament)
    }

    async fn save(&self, tournament: &mut Tournament) -> LeagueResult<()> {
        tournament.version = self
            .tournaments
            .update(tournament)
            .await
            .for_entity(EntityKind::Tournament, tournament.id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::league::NewLeague;
    use crate::player::PlayerProfile;
    use crate::services::LeagueServices;
    use crate::tournament::{SeededBracket, TournamentStatus};

    async fn league_with_players(services: &LeagueServices, n: usize) -> (LeagueId, Vec<PlayerId>) {
        let league = services
            .leagues
            .create_league(NewLeague::named("L"))
            .await
            .unwrap();
        let mut ids = Vec::new();
        for i in 0..n {
            let p = services
                .players
                .create_player(PlayerProfile::named(format!("P{i}")))
                .await
                .unwrap();
            services.leagues.add_player(league.id, p.id).await.unwrap();
            ids.push(p.id);
        }
        (league.id, ids)
    }

    #[tokio::test]
    async fn test_numbers_are_sequential() {
        let services = LeagueServices::in_memory();
        let (league_id, _) = league_with_players(&services, 0).await;

        for expected in 1..=3 {
            let t = services
                .tournaments
                .create_tournament(league_id, format!("T{expected}"), TournamentSettings::round_robin())
                .await
                .unwrap();
            assert_eq!(t.tournament_number, expected);
        }
        let listed = services.tournaments.list_league_tournaments(league_id).await.unwrap();
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn test_add_player_rules() {
        let services = LeagueServices::in_memory();
        let (league_id, players) = league_with_players(&services, 3).await;
        let t = services
            .tournaments
            .create_tournament(
                league_id,
                "Cup",
                TournamentSettings::single_elimination().with_max_players(2),
            )
            .await
            .unwrap();

        services.tournaments.add_player(t.id, players[0], Some(1)).await.unwrap();
        services.tournaments.add_player(t.id, players[0], None).await.unwrap();
        assert_eq!(services.tournaments.list_players(t.id).await.unwrap().len(), 1);

        services.tournaments.add_player(t.id, players[1], None).await.unwrap();
        let err = services
            .tournaments
            .add_player(t.id, players[2], None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeagueError::CapacityReached { max: 2, .. }));

        let outsider = services
            .players
            .create_player(PlayerProfile::named("Outsider"))
            .await
            .unwrap();
        let err = services
            .tournaments
            .add_player(t.id, outsider.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeagueError::PlayerNotInLeague { .. }));
    }

    #[tokio::test]
    async fn test_start_generates_bracket_once() {
        let services = LeagueServices::in_memory();
        let (league_id, players) = league_with_players(&services, 4).await;
        let t = services
            .tournaments
            .create_tournament(league_id, "Cup", TournamentSettings::single_elimination())
            .await
            .unwrap();
        for p in &players {
            services.tournaments.add_player(t.id, *p, None).await.unwrap();
        }

        let (started, matches) = services.tournaments.start_tournament(t.id).await.unwrap();
        assert_eq!(started.status, TournamentStatus::InProgress);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.round == 1 && m.participants().is_none()));

        let err = services.tournaments.start_tournament(t.id).await.unwrap_err();
        assert!(matches!(err, LeagueError::AlreadyStarted(EntityKind::Tournament)));
        assert_eq!(services.matches.list_tournament_matches(t.id).await.unwrap().len(), 2);

        let err = services
            .tournaments
            .add_player(t.id, players[0], None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeagueError::AlreadyStarted(_)));
        let err = services
            .tournaments
            .remove_player(t.id, players[0])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_default_start_needs_no_entrants() {
        let services = LeagueServices::in_memory();
        let (league_id, _) = league_with_players(&services, 0).await;
        for settings in [
            TournamentSettings::single_elimination(),
            TournamentSettings::round_robin(),
        ] {
            let t = services
                .tournaments
                .create_tournament(league_id, "Open", settings)
                .await
                .unwrap();
            let (started, matches) = services.tournaments.start_tournament(t.id).await.unwrap();
            assert_eq!(started.status, TournamentStatus::InProgress);
            assert_eq!(matches.len(), 2);
            assert!(matches.iter().all(|m| {
                m.round == 1 && m.status == MatchStatus::Pending && m.participants().is_none()
            }));
        }
    }

    #[tokio::test]
    async fn test_seeded_generation_failure_leaves_setup() {
        let services = LeagueServices::in_memory();
        let (league_id, players) = league_with_players(&services, 1).await;
        let manager = services
            .tournaments
            .clone()
            .with_bracket(Arc::new(SeededBracket));
        let t = manager
            .create_tournament(league_id, "Cup", TournamentSettings::single_elimination())
            .await
            .unwrap();
        manager.add_player(t.id, players[0], None).await.unwrap();

        let err = manager.start_tournament(t.id).await.unwrap_err();
        assert!(matches!(err, LeagueError::NotEnoughPlayers { current: 1, .. }));
        let stored = manager.get_tournament(t.id).await.unwrap();
        assert_eq!(stored.status, TournamentStatus::Setup);
    }

    #[tokio::test]
    async fn test_seeded_bracket_pairs_entrants() {
        let services = LeagueServices::in_memory();
        let (league_id, players) = league_with_players(&services, 4).await;
        let manager = services
            .tournaments
            .clone()
            .with_bracket(Arc::new(SeededBracket));
        let t = manager
            .create_tournament(league_id, "Seeded", TournamentSettings::single_elimination())
            .await
            .unwrap();
        for p in &players {
            manager.add_player(t.id, *p, None).await.unwrap();
        }

        let (_, matches) = manager.start_tournament(t.id).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.participants().is_some()));
    }

    #[tokio::test]
    async fn test_list_tournaments_of_unknown_league() {
        let services = LeagueServices::in_memory();
        let err = services
            .tournaments
            .list_league_tournaments(uuid::Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, LeagueError::NotFound { entity: EntityKind::League, .. }));
    }

    #[tokio::test]
    async fn test_complete_tournament() {
        let services = LeagueServices::in_memory();
        let (league_id, _) = league_with_players(&services, 0).await;
        let t = services
            .tournaments
            .create_tournament(league_id, "Cup", TournamentSettings::round_robin())
            .await
            .unwrap();

        let done = services.tournaments.complete_tournament(t.id).await.unwrap();
        assert_eq!(done.status, TournamentStatus::Completed);
        assert!(done.completed_at.is_some());
        let err = services.tournaments.complete_tournament(t.id).await.unwrap_err();
        assert!(matches!(err, LeagueError::AlreadyCompleted(EntityKind::Tournament)));
    }
}
