//! League manager: season lifecycle and enrolment.

use std::sync::Arc;

use super::models::{League, LeagueId, PointsSchedule};
use crate::clock::Clock;
use crate::db::{LeagueRepository, PlayerRepository, StoreError};
use crate::errors::{EntityKind, LeagueError, LeagueResult, StoreResultExt};
use crate::player::PlayerId;
use crate::standings::{LeagueStanding, StandingsAggregator};

/// Parameters for a new league
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewLeague {
    pub name: String,
    pub description: Option<String>,
    pub season: Option<String>,
    /// Defaults to 3/2/1
    pub points: Option<PointsSchedule>,
    pub max_players: Option<u32>,
}

impl NewLeague {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// League manager
#[derive(Clone)]
pub struct LeagueManager {
    leagues: Arc<dyn LeagueRepository>,
    players: Arc<dyn PlayerRepository>,
    standings: StandingsAggregator,
    clock: Arc<dyn Clock>,
}

impl LeagueManager {
    pub fn new(
        leagues: Arc<dyn LeagueRepository>,
        players: Arc<dyn PlayerRepository>,
        standings: StandingsAggregator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            leagues,
            players,
            standings,
            clock,
        }
    }

    pub async fn create_league(&self, params: NewLeague) -> LeagueResult<League> {
        let mut league = League::new(params.name, params.description, params.season, self.clock.now())?;
        if let Some(points) = params.points {
            league = league.with_points(points);
        }
        if let Some(max) = params.max_players {
            league = league.with_max_players(max);
        }

        self.leagues
            .create(&league)
            .await
            .for_entity(EntityKind::League, league.id)?;
        log::info!("Created league {} ({})", league.id, league.name);
        Ok(league)
    }

    pub async fn get_league(&self, id: LeagueId) -> LeagueResult<League> {
        self.leagues
            .get_by_id(id)
            .await
            .for_entity(EntityKind::League, id)
    }

    pub async fn list_leagues(&self) -> LeagueResult<Vec<League>> {
        self.leagues.list().await.map_err(LeagueError::Storage)
    }

    /// Move a league from `setup` to `active`
    pub async fn start_league(&self, id: LeagueId) -> LeagueResult<League> {
        let mut league = self.get_league(id).await?;
        league.start(self.clock.now())?;
        self.save(&mut league).await?;

        log::info!("League {id} started");
        Ok(league)
    }

    /// Move a league to `completed`
    pub async fn complete_league(&self, id: LeagueId) -> LeagueResult<League> {
        let mut league = self.get_league(id).await?;
        league.complete(self.clock.now())?;
        self.save(&mut league).await?;

        log::info!("League {id} completed");
        Ok(league)
    }

    /// Enrol a player and create their standing row
    ///
    /// Enrolling an already enrolled player is a no-op returning the existing
    /// standing.
    ///
    /// # Errors
    ///
    /// * `LeagueError::AlreadyCompleted` - League is completed
    /// * `LeagueError::NotFound` - League or player does not exist
    /// * `LeagueError::CapacityReached` - League is at `max_players`
    pub async fn add_player(&self, league_id: LeagueId, player_id: PlayerId) -> LeagueResult<LeagueStanding> {
        let league = self.get_league(league_id).await?;
        if !league.can_add_tournaments() {
            return Err(LeagueError::AlreadyCompleted(EntityKind::League));
        }
        self.players
            .get_by_id(player_id)
            .await
            .for_entity(EntityKind::Player, player_id)?;

        if self.is_player_in_league(league_id, player_id).await? {
            log::debug!("Player {player_id} already enrolled in league {league_id}");
            return self.existing_standing(league_id, player_id).await;
        }

        if let Some(max) = league.max_players {
            let count = self
                .leagues
                .player_count(league_id)
                .await
                .map_err(LeagueError::Storage)?;
            if count >= max {
                return Err(LeagueError::CapacityReached {
                    entity: EntityKind::League,
                    max,
                });
            }
        }

        match self
            .leagues
            .add_player(league_id, player_id, self.clock.now())
            .await
        {
            // Duplicate: lost a race with a concurrent enrolment of the same
            // player; the standing below is created by whichever call gets there first
            Ok(()) | Err(StoreError::Duplicate(_)) => {}
            Err(e) => return Err(LeagueError::from_store(e, EntityKind::League, league_id)),
        }

        let standing = match self.standings.enroll(league_id, player_id).await {
            Ok(standing) => standing,
            Err(LeagueError::AlreadyEnrolled { .. }) => {
                self.existing_standing(league_id, player_id).await?
            }
            Err(e) => return Err(e),
        };

        log::info!("Player {player_id} joined league {league_id}");
        Ok(standing)
    }

    /// Remove a player from a league along with their standing
    pub async fn remove_player(&self, league_id: LeagueId, player_id: PlayerId) -> LeagueResult<()> {
        self.leagues
            .remove_player(league_id, player_id)
            .await
            .for_entity(EntityKind::Player, player_id)?;

        match self.standings.remove(league_id, player_id).await {
            Ok(()) | Err(LeagueError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        log::info!("Player {player_id} left league {league_id}");
        Ok(())
    }

    pub async fn is_player_in_league(&self, league_id: LeagueId, player_id: PlayerId) -> LeagueResult<bool> {
        self.leagues
            .is_player_in_league(league_id, player_id)
            .await
            .map_err(LeagueError::Storage)
    }

    /// Ranked standings of a league
    pub async fn get_standings(&self, league_id: LeagueId) -> LeagueResult<Vec<LeagueStanding>> {
        self.get_league(league_id).await?;
        self.standings.standings(league_id).await
    }

    async fn existing_standing(&self, league_id: LeagueId, player_id: PlayerId) -> LeagueResult<LeagueStanding> {
        let rows = self.standings.standings(league_id).await?;
        rows.into_iter()
            .find(|s| s.player_id == player_id)
            .ok_or_else(|| LeagueError::NotFound {
                entity: EntityKind::Standing,
                key: format!("{league_id}:{player_id}"),
            })
    }

    async fn save(&self, league: &mut League) -> LeagueResult<()> {
        league.version = self
            .leagues
            .update(league)
            .await
            .for_entity(EntityKind::League, league.id)?;
        Ok(())
    }
}
