//! Storage layer: repository ports and their adapters.
//!
//! The managers only see the traits in [`repository`]. Two adapters implement
//! them: [`InMemoryStore`] for tests and embedders, and [`PgStore`] over a
//! PostgreSQL pool managed by [`Database`].

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod errors;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod timeouts;

pub use config::{ConfigError, DatabaseConfig};
pub use errors::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use repository::{
    LeagueRepository, MatchRepository, PlayerRepository, StandingsRepository,
    TournamentRepository,
};

/// Schema applied by [`Database::apply_schema`]
pub const SCHEMA_SQL: &str = include_str!("../../migrations/0001_schema.sql");

/// Owned PostgreSQL pool for the league tables
///
/// Cloning shares the pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    let secs = Duration::from_secs;
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(secs(config.connection_timeout_secs))
        .idle_timeout(secs(config.idle_timeout_secs))
        .max_lifetime(secs(config.max_lifetime_secs))
}

impl Database {
    /// Open a pool sized by `config`
    ///
    /// ```no_run
    /// use league_core::db::{Database, DatabaseConfig, Repositories};
    ///
    /// # async fn open() -> Result<Repositories, Box<dyn std::error::Error>> {
    /// let db = Database::new(&DatabaseConfig::from_env()?).await?;
    /// db.apply_schema().await?;
    /// Ok(Repositories::postgres(db.pool().clone()))
    /// # }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = pool_options(config).connect(&config.database_url).await?;
        log::debug!(
            "League database pool open ({} to {} connections)",
            config.min_connections,
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create any missing league tables and indexes
    pub async fn apply_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        log::info!("League schema applied");
        Ok(())
    }

    /// Round trip a trivial query
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }

    /// Wait for checked-out connections and shut the pool down
    pub async fn close(self) {
        self.pool.close().await;
        log::debug!("League database pool closed");
    }
}

/// One handle per repository port
#[derive(Clone)]
pub struct Repositories {
    pub players: Arc<dyn PlayerRepository>,
    pub leagues: Arc<dyn LeagueRepository>,
    pub tournaments: Arc<dyn TournamentRepository>,
    pub matches: Arc<dyn MatchRepository>,
    pub standings: Arc<dyn StandingsRepository>,
}

impl Repositories {
    /// All ports backed by one shared [`InMemoryStore`]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }

    /// All ports backed by PostgreSQL
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PlayerRepository
            + LeagueRepository
            + TournamentRepository
            + MatchRepository
            + StandingsRepository
            + 'static,
    {
        Self {
            players: store.clone(),
            leagues: store.clone(),
            tournaments: store.clone(),
            matches: store.clone(),
            standings: store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defines_every_table() {
        for table in [
            "players",
            "leagues",
            "league_players",
            "tournaments",
            "tournament_players",
            "matches",
            "league_standings",
            "standing_events",
        ] {
            assert!(
                SCHEMA_SQL.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
                "missing table {table}"
            );
        }
        assert!(SCHEMA_SQL.contains("UNIQUE (league_id, tournament_number)"));
    }
}
