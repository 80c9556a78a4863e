//! Admin configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use league_core::db::config::parse_or;
use league_core::db::{ConfigError, DatabaseConfig};
use league_core::league::PointsSchedule;

/// Points for a tournament win when `LEAGUE_POINTS_FOR_WIN` is unset
pub const DEFAULT_POINTS_FOR_WIN: i32 = 3;
/// Points for a runner-up when `LEAGUE_POINTS_FOR_RUNNER_UP` is unset
pub const DEFAULT_POINTS_FOR_RUNNER_UP: i32 = 2;
/// Points for a semi-final when `LEAGUE_POINTS_FOR_SEMI_FINAL` is unset
pub const DEFAULT_POINTS_FOR_SEMI_FINAL: i32 = 1;

/// Complete admin configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Points schedule for leagues created without `--points`
    pub default_points: PointsSchedule,
}

impl AdminConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(database_url_override: Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(database_url_override, |key| std::env::var(key).ok())
    }

    /// Same as [`AdminConfig::from_env`], reading variables through `lookup`
    pub fn from_lookup<F>(database_url_override: Option<String>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig::from_lookup(|key| {
            if key == "DATABASE_URL" {
                database_url_override.clone().or_else(|| lookup(key))
            } else {
                lookup(key)
            }
        })?;

        let default_points = PointsSchedule {
            win: parse_or(&lookup, "LEAGUE_POINTS_FOR_WIN", DEFAULT_POINTS_FOR_WIN)?,
            runner_up: parse_or(&lookup, "LEAGUE_POINTS_FOR_RUNNER_UP", DEFAULT_POINTS_FOR_RUNNER_UP)?,
            semi_final: parse_or(&lookup, "LEAGUE_POINTS_FOR_SEMI_FINAL", DEFAULT_POINTS_FOR_SEMI_FINAL)?,
        };

        let config = Self {
            database,
            default_points,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;

        let points = [
            ("LEAGUE_POINTS_FOR_WIN", self.default_points.win),
            ("LEAGUE_POINTS_FOR_RUNNER_UP", self.default_points.runner_up),
            ("LEAGUE_POINTS_FOR_SEMI_FINAL", self.default_points.semi_final),
        ];
        for (var, value) in points {
            if value < 0 {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("Must not be negative, got {value}"),
                });
            }
        }

        if self.default_points.runner_up > self.default_points.win {
            return Err(ConfigError::Invalid {
                var: "LEAGUE_POINTS_FOR_RUNNER_UP".to_string(),
                reason: format!(
                    "Cannot exceed points for a win ({})",
                    self.default_points.win
                ),
            });
        }

        Ok(())
    }
}
