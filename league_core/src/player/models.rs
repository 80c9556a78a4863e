//! Player data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LeagueResult, require_name};

/// Player ID type
pub type PlayerId = Uuid;

/// Profile fields supplied on registration and on update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
}

impl PlayerProfile {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }
}

/// Registered player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped by every stored update
    pub version: i64,
}

impl Player {
    /// Register a new player
    ///
    /// # Errors
    ///
    /// * `LeagueError::Validation` - Name is empty
    pub fn new(profile: PlayerProfile, now: DateTime<Utc>) -> LeagueResult<Self> {
        require_name("player name", &profile.name)?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: profile.name,
            email: profile.email,
            nickname: profile.nickname,
            avatar_url: profile.avatar_url,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Replace the profile fields. Absent optional fields clear the stored value.
    pub fn update_profile(&mut self, profile: PlayerProfile, now: DateTime<Utc>) -> LeagueResult<()> {
        require_name("player name", &profile.name)?;

        self.name = profile.name;
        self.email = profile.email;
        self.nickname = profile.nickname;
        self.avatar_url = profile.avatar_url;
        self.updated_at = now;
        Ok(())
    }

    /// Nickname if set and non-empty, otherwise the name
    pub fn display_name(&self) -> &str {
        match self.nickname.as_deref() {
            Some(nickname) if !nickname.is_empty() => nickname,
            _ => &self.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LeagueError;

    #[test]
    fn test_new_player_requires_name() {
        let err = Player::new(PlayerProfile::named(""), Utc::now()).unwrap_err();
        assert!(matches!(err, LeagueError::Validation { .. }));
    }

    #[test]
    fn test_display_name_prefers_nickname() {
        let now = Utc::now();
        let mut player =
            Player::new(PlayerProfile::named("Phil Taylor").with_nickname("The Power"), now)
                .unwrap();
        assert_eq!(player.display_name(), "The Power");

        player.nickname = Some(String::new());
        assert_eq!(player.display_name(), "Phil Taylor");

        player.nickname = None;
        assert_eq!(player.display_name(), "Phil Taylor");
    }

    #[test]
    fn test_update_profile_keeps_state_on_error() {
        let now = Utc::now();
        let mut player = Player::new(PlayerProfile::named("Anna"), now).unwrap();
        let before = player.clone();

        assert!(player.update_profile(PlayerProfile::named(" "), now).is_err());
        assert_eq!(player, before);

        let later = now + chrono::Duration::seconds(5);
        player
            .update_profile(PlayerProfile::named("Anna B").with_email("a@b.c"), later)
            .unwrap();
        assert_eq!(player.name, "Anna B");
        assert_eq!(player.email.as_deref(), Some("a@b.c"));
        assert_eq!(player.updated_at, later);
        assert_eq!(player.created_at, now);
    }
}
