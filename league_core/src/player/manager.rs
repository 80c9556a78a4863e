//! Player registration and profile management.

use std::sync::Arc;

use super::models::{Player, PlayerId, PlayerProfile};
use crate::clock::Clock;
use crate::db::{PlayerRepository, StoreError};
use crate::errors::{EntityKind, LeagueError, LeagueResult, StoreResultExt};

/// Player manager
#[derive(Clone)]
pub struct PlayerManager {
    players: Arc<dyn PlayerRepository>,
    clock: Arc<dyn Clock>,
}

impl PlayerManager {
    /// Create a new player manager
    pub fn new(players: Arc<dyn PlayerRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { players, clock }
    }

    /// Register a player
    ///
    /// # Errors
    ///
    /// * `LeagueError::Validation` - Empty name
    /// * `LeagueError::EmailTaken` - Another player uses the email
    pub async fn create_player(&self, profile: PlayerProfile) -> LeagueResult<Player> {
        if let Some(email) = profile.email.as_deref() {
            self.ensure_email_free(email).await?;
        }

        let player = Player::new(profile, self.clock.now())?;
        self.players
            .create(&player)
            .await
            .map_err(|e| email_error(e, &player))?;

        log::info!("Registered player {} ({})", player.id, player.name);
        Ok(player)
    }

    pub async fn get_player(&self, id: PlayerId) -> LeagueResult<Player> {
        self.players
            .get_by_id(id)
            .await
            .for_entity(EntityKind::Player, id)
    }

    pub async fn find_by_email(&self, email: &str) -> LeagueResult<Player> {
        self.players
            .get_by_email(email)
            .await
            .for_entity(EntityKind::Player, email)
    }

    /// Players in registration order
    pub async fn list_players(&self, limit: u32, offset: u32) -> LeagueResult<Vec<Player>> {
        self.players
            .list(limit, offset)
            .await
            .map_err(LeagueError::Storage)
    }

    /// Replace a player's profile
    pub async fn update_player(&self, id: PlayerId, profile: PlayerProfile) -> LeagueResult<Player> {
        let mut player = self.get_player(id).await?;

        if let Some(email) = profile.email.as_deref() {
            if player.email.as_deref() != Some(email) {
                self.ensure_email_free(email).await?;
            }
        }

        player.update_profile(profile, self.clock.now())?;
        player.version = self
            .players
            .update(&player)
            .await
            .map_err(|e| email_error(e, &player))?;

        log::debug!("Updated player {}", player.id);
        Ok(player)
    }

    pub async fn delete_player(&self, id: PlayerId) -> LeagueResult<()> {
        self.players
            .delete(id)
            .await
            .for_entity(EntityKind::Player, id)?;
        log::info!("Deleted player {id}");
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str) -> LeagueResult<()> {
        let taken = self
            .players
            .exists_by_email(email)
            .await
            .map_err(LeagueError::Storage)?;
        if taken {
            return Err(LeagueError::EmailTaken(email.to_string()));
        }
        Ok(())
    }
}

/// A uniqueness failure on a player row means the email raced another registration
fn email_error(err: StoreError, player: &Player) -> LeagueError {
    match (err, player.email.as_deref()) {
        (StoreError::Duplicate(_), Some(email)) => LeagueError::EmailTaken(email.to_string()),
        (err, _) => LeagueError::from_store(err, EntityKind::Player, player.id),
    }
}
