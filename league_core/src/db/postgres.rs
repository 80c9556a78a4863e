//! PostgreSQL implementation of every repository port.
//!
//! Queries are built at runtime with `sqlx::query` and decoded with
//! `try_get`, so the crate builds without a live database. Unsigned counters
//! are stored as `BIGINT` and checked on the way back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use super::errors::{StoreError, StoreResult};
use super::repository::{
    LeagueRepository, MatchRepository, PlayerRepository, StandingsRepository,
    TournamentRepository,
};
use super::timeouts::{QueryError, bounded_statement, bounded_transaction};
use crate::league::{League, LeagueId};
use crate::matches::{Match, MatchId};
use crate::player::{Player, PlayerId};
use crate::standings::{LeagueStanding, PositionUpdate, StandingDelta};
use crate::tournament::{GameFormat, Tournament, TournamentEntry, TournamentId};

const PLAYER_COLUMNS: &str = "id, name, email, nickname, avatar_url, created_at, updated_at, version";

const LEAGUE_COLUMNS: &str = "id, name, description, season, status, points_for_win, \
     points_for_runner_up, points_for_semi_final, max_players, start_date, end_date, \
     created_at, updated_at, version";

const TOURNAMENT_COLUMNS: &str = "id, league_id, name, description, tournament_type, status, \
     game_type, legs_per_match, sets_per_match, tournament_number, max_players, entry_fee, \
     prize_pool, scheduled_date, created_at, started_at, completed_at, results_applied_at, version";

const MATCH_COLUMNS: &str = "id, tournament_id, round, match_number, player1_id, player2_id, \
     player1_score, player2_score, winner_id, status, started_at, completed_at, created_at, version";

const STANDING_COLUMNS: &str = "league_id, player_id, total_points, tournaments_played, \
     tournaments_won, finals_reached, semi_finals_reached, current_position, previous_position, \
     enrolled_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// After a versioned update matched no row, tell a missing row from a stale version
    async fn missing_or_conflict(&self, table: &str, id: uuid::Uuid) -> StoreResult<i64> {
        let sql = format!("SELECT 1 FROM {table} WHERE id = $1");
        let exists = bounded_statement(sqlx::query(&sql).bind(id).fetch_optional(&self.pool))
            .await?
            .is_some();
        if exists {
            Err(StoreError::Conflict)
        } else {
            Err(StoreError::NotFound)
        }
    }
}

/// Outcome of a transaction that may bail out without an sqlx error
enum TxOutcome<T> {
    Done(T),
    Missing,
    DuplicateKey,
}

/// Map constraint violations onto port errors
fn classify(err: QueryError, on_unique: impl FnOnce() -> StoreError) -> StoreError {
    match err {
        QueryError::Sql(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            on_unique()
        }
        QueryError::Sql(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
            StoreError::NotFound
        }
        other => other.into(),
    }
}

fn to_u32(value: i64, column: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn get_u32(row: &PgRow, column: &str) -> StoreResult<u32> {
    to_u32(row.try_get(column)?, column)
}

fn get_opt_u32(row: &PgRow, column: &str) -> StoreResult<Option<u32>> {
    row.try_get::<Option<i64>, _>(column)?
        .map(|v| to_u32(v, column))
        .transpose()
}

fn get_enum<T: FromStr<Err = String>>(row: &PgRow, column: &str) -> StoreResult<T> {
    row.try_get::<String, _>(column)?
        .parse()
        .map_err(StoreError::Corrupt)
}

fn player_from_row(row: &PgRow) -> StoreResult<Player> {
    Ok(Player {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        nickname: row.try_get("nickname")?,
        avatar_url: row.try_get("avatar_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: row.try_get("version")?,
    })
}

fn league_from_row(row: &PgRow) -> StoreResult<League> {
    Ok(League {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        season: row.try_get("season")?,
        status: get_enum(row, "status")?,
        points_for_win: row.try_get("points_for_win")?,
        points_for_runner_up: row.try_get("points_for_runner_up")?,
        points_for_semi_final: row.try_get("points_for_semi_final")?,
        max_players: get_opt_u32(row, "max_players")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: row.try_get("version")?,
    })
}

fn tournament_from_row(row: &PgRow) -> StoreResult<Tournament> {
    Ok(Tournament {
        id: row.try_get("id")?,
        league_id: row.try_get("league_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        tournament_type: get_enum(row, "tournament_type")?,
        status: get_enum(row, "status")?,
        format: GameFormat {
            game_type: get_enum(row, "game_type")?,
            legs_per_match: get_u32(row, "legs_per_match")?,
            sets_per_match: get_u32(row, "sets_per_match")?,
        },
        tournament_number: get_u32(row, "tournament_number")?,
        max_players: get_opt_u32(row, "max_players")?,
        entry_fee: row.try_get("entry_fee")?,
        prize_pool: row.try_get("prize_pool")?,
        scheduled_date: row.try_get("scheduled_date")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        results_applied_at: row.try_get("results_applied_at")?,
        version: row.try_get("version")?,
    })
}

fn entry_from_row(row: &PgRow) -> StoreResult<TournamentEntry> {
    Ok(TournamentEntry {
        tournament_id: row.try_get("tournament_id")?,
        player_id: row.try_get("player_id")?,
        seed: get_opt_u32(row, "seed")?,
        joined_at: row.try_get("joined_at")?,
    })
}

fn match_from_row(row: &PgRow) -> StoreResult<Match> {
    Ok(Match {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        round: get_u32(row, "round")?,
        match_number: get_u32(row, "match_number")?,
        player1_id: row.try_get("player1_id")?,
        player2_id: row.try_get("player2_id")?,
        player1_score: get_u32(row, "player1_score")?,
        player2_score: get_u32(row, "player2_score")?,
        winner_id: row.try_get("winner_id")?,
        status: get_enum(row, "status")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        created_at: row.try_get("created_at")?,
        version: row.try_get("version")?,
    })
}

fn standing_from_row(row: &PgRow) -> StoreResult<LeagueStanding> {
    Ok(LeagueStanding {
        league_id: row.try_get("league_id")?,
        player_id: row.try_get("player_id")?,
        total_points: row.try_get("total_points")?,
        tournaments_played: get_u32(row, "tournaments_played")?,
        tournaments_won: get_u32(row, "tournaments_won")?,
        finals_reached: get_u32(row, "finals_reached")?,
        semi_finals_reached: get_u32(row, "semi_finals_reached")?,
        current_position: get_u32(row, "current_position")?,
        previous_position: get_u32(row, "previous_position")?,
        enrolled_at: row.try_get("enrolled_at")?,
    })
}

fn count_from_row(row: &PgRow) -> StoreResult<u32> {
    get_u32(row, "count")
}

#[async_trait]
impl PlayerRepository for PgStore {
    async fn create(&self, player: &Player) -> StoreResult<()> {
        bounded_statement(
            sqlx::query(
                r#"
                INSERT INTO players (id, name, email, nickname, avatar_url, created_at, updated_at, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(player.id)
            .bind(&player.name)
            .bind(&player.email)
            .bind(&player.nickname)
            .bind(&player.avatar_url)
            .bind(player.created_at)
            .bind(player.updated_at)
            .bind(player.version)
            .execute(&self.pool),
        )
        .await
        .map_err(|e| {
            classify(e, || {
                StoreError::Duplicate(player.email.clone().unwrap_or_else(|| player.id.to_string()))
            })
        })?;
        Ok(())
    }

    async fn get_by_id(&self, id: PlayerId) -> StoreResult<Player> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1");
        let row = bounded_statement(sqlx::query(&sql).bind(id).fetch_optional(&self.pool))
            .await?
            .ok_or(StoreError::NotFound)?;
        player_from_row(&row)
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Player> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE email = $1");
        let row = bounded_statement(sqlx::query(&sql).bind(email).fetch_optional(&self.pool))
            .await?
            .ok_or(StoreError::NotFound)?;
        player_from_row(&row)
    }

    async fn list(&self, limit: u32, offset: u32) -> StoreResult<Vec<Player>> {
        let sql = format!(
            "SELECT {PLAYER_COLUMNS} FROM players ORDER BY created_at, id LIMIT $1 OFFSET $2"
        );
        let rows = bounded_statement(
            sqlx::query(&sql)
                .bind(i64::from(limit))
                .bind(i64::from(offset))
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(player_from_row).collect()
    }

    async fn update(&self, player: &Player) -> StoreResult<i64> {
        let row = bounded_statement(
            sqlx::query(
                r#"
                UPDATE players
                SET name = $3, email = $4, nickname = $5, avatar_url = $6, updated_at = $7,
                    version = version + 1
                WHERE id = $1 AND version = $2
                RETURNING version
                "#,
            )
            .bind(player.id)
            .bind(player.version)
            .bind(&player.name)
            .bind(&player.email)
            .bind(&player.nickname)
            .bind(&player.avatar_url)
            .bind(player.updated_at)
            .fetch_optional(&self.pool),
        )
        .await
        .map_err(|e| {
            classify(e, || {
                StoreError::Duplicate(player.email.clone().unwrap_or_default())
            })
        })?;

        match row {
            Some(row) => Ok(row.try_get("version")?),
            None => self.missing_or_conflict("players", player.id).await,
        }
    }

    async fn delete(&self, id: PlayerId) -> StoreResult<()> {
        let result = bounded_statement(
            sqlx::query("DELETE FROM players WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await
        .map_err(|e| match e {
            // Memberships cascade; only match rows can still point here
            QueryError::Sql(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                StoreError::Referenced("matches")
            }
            other => other.into(),
        })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        let row = bounded_statement(
            sqlx::query("SELECT EXISTS(SELECT 1 FROM players WHERE email = $1) AS taken")
                .bind(email)
                .fetch_one(&self.pool),
        )
        .await?;
        Ok(row.try_get("taken")?)
    }
}

#[async_trait]
impl LeagueRepository for PgStore {
    async fn create(&self, league: &League) -> StoreResult<()> {
        bounded_statement(
            sqlx::query(
                r#"
                INSERT INTO leagues (id, name, description, season, status, points_for_win,
                    points_for_runner_up, points_for_semi_final, max_players, start_date,
                    end_date, created_at, updated_at, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(league.id)
            .bind(&league.name)
            .bind(&league.description)
            .bind(&league.season)
            .bind(league.status.as_str())
            .bind(league.points_for_win)
            .bind(league.points_for_runner_up)
            .bind(league.points_for_semi_final)
            .bind(league.max_players.map(i64::from))
            .bind(league.start_date)
            .bind(league.end_date)
            .bind(league.created_at)
            .bind(league.updated_at)
            .bind(league.version)
            .execute(&self.pool),
        )
        .await
        .map_err(|e| classify(e, || StoreError::Duplicate(league.id.to_string())))?;
        Ok(())
    }

    async fn get_by_id(&self, id: LeagueId) -> StoreResult<League> {
        let sql = format!("SELECT {LEAGUE_COLUMNS} FROM leagues WHERE id = $1");
        let row = bounded_statement(sqlx::query(&sql).bind(id).fetch_optional(&self.pool))
            .await?
            .ok_or(StoreError::NotFound)?;
        league_from_row(&row)
    }

    async fn list(&self) -> StoreResult<Vec<League>> {
        let sql = format!("SELECT {LEAGUE_COLUMNS} FROM leagues ORDER BY created_at, id");
        let rows = bounded_statement(sqlx::query(&sql).fetch_all(&self.pool)).await?;
        rows.iter().map(league_from_row).collect()
    }

    async fn update(&self, league: &League) -> StoreResult<i64> {
        let row = bounded_statement(
            sqlx::query(
                r#"
                UPDATE leagues
                SET name = $3, description = $4, season = $5, status = $6, points_for_win = $7,
                    points_for_runner_up = $8, points_for_semi_final = $9, max_players = $10,
                    start_date = $11, end_date = $12, updated_at = $13, version = version + 1
                WHERE id = $1 AND version = $2
                RETURNING version
                "#,
            )
            .bind(league.id)
            .bind(league.version)
            .bind(&league.name)
            .bind(&league.description)
            .bind(&league.season)
            .bind(league.status.as_str())
            .bind(league.points_for_win)
            .bind(league.points_for_runner_up)
            .bind(league.points_for_semi_final)
            .bind(league.max_players.map(i64::from))
            .bind(league.start_date)
            .bind(league.end_date)
            .bind(league.updated_at)
            .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(row) => Ok(row.try_get("version")?),
            None => self.missing_or_conflict("leagues", league.id).await,
        }
    }

    async fn add_player(
        &self,
        league_id: LeagueId,
        player_id: PlayerId,
        joined_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        bounded_statement(
            sqlx::query(
                "INSERT INTO league_players (league_id, player_id, joined_at) VALUES ($1, $2, $3)",
            )
            .bind(league_id)
            .bind(player_id)
            .bind(joined_at)
            .execute(&self.pool),
        )
        .await
        .map_err(|e| classify(e, || StoreError::Duplicate(format!("{league_id}:{player_id}"))))?;
        Ok(())
    }

    async fn remove_player(&self, league_id: LeagueId, player_id: PlayerId) -> StoreResult<()> {
        let result = bounded_statement(
            sqlx::query("DELETE FROM league_players WHERE league_id = $1 AND player_id = $2")
                .bind(league_id)
                .bind(player_id)
                .execute(&self.pool),
        )
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn is_player_in_league(
        &self,
        league_id: LeagueId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        let row = bounded_statement(
            sqlx::query(
                "SELECT EXISTS(SELECT 1 FROM league_players WHERE league_id = $1 AND player_id = $2) AS member",
            )
            .bind(league_id)
            .bind(player_id)
            .fetch_one(&self.pool),
        )
        .await?;
        Ok(row.try_get("member")?)
    }

    async fn player_count(&self, league_id: LeagueId) -> StoreResult<u32> {
        let row = bounded_statement(
            sqlx::query("SELECT COUNT(*) AS count FROM league_players WHERE league_id = $1")
                .bind(league_id)
                .fetch_one(&self.pool),
        )
        .await?;
        count_from_row(&row)
    }
}

#[async_trait]
impl TournamentRepository for PgStore {
    async fn create(&self, tournament: &Tournament) -> StoreResult<()> {
        bounded_statement(
            sqlx::query(
                r#"
                INSERT INTO tournaments (id, league_id, name, description, tournament_type, status,
                    game_type, legs_per_match, sets_per_match, tournament_number, max_players,
                    entry_fee, prize_pool, scheduled_date, created_at, started_at, completed_at,
                    results_applied_at, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19)
                "#,
            )
            .bind(tournament.id)
            .bind(tournament.league_id)
            .bind(&tournament.name)
            .bind(&tournament.description)
            .bind(tournament.tournament_type.as_str())
            .bind(tournament.status.as_str())
            .bind(tournament.format.game_type.as_str())
            .bind(i64::from(tournament.format.legs_per_match))
            .bind(i64::from(tournament.format.sets_per_match))
            .bind(i64::from(tournament.tournament_number))
            .bind(tournament.max_players.map(i64::from))
            .bind(tournament.entry_fee)
            .bind(tournament.prize_pool)
            .bind(tournament.scheduled_date)
            .bind(tournament.created_at)
            .bind(tournament.started_at)
            .bind(tournament.completed_at)
            .bind(tournament.results_applied_at)
            .bind(tournament.version)
            .execute(&self.pool),
        )
        .await
        .map_err(|e| classify(e, || StoreError::Conflict))?;
        Ok(())
    }

    async fn get_by_id(&self, id: TournamentId) -> StoreResult<Tournament> {
        let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1");
        let row = bounded_statement(sqlx::query(&sql).bind(id).fetch_optional(&self.pool))
            .await?
            .ok_or(StoreError::NotFound)?;
        tournament_from_row(&row)
    }

    async fn list_by_league(&self, league_id: LeagueId) -> StoreResult<Vec<Tournament>> {
        let sql = format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE league_id = $1 ORDER BY tournament_number"
        );
        let rows =
            bounded_statement(sqlx::query(&sql).bind(league_id).fetch_all(&self.pool)).await?;
        rows.iter().map(tournament_from_row).collect()
    }

    async fn update(&self, tournament: &Tournament) -> StoreResult<i64> {
        let row = bounded_statement(
            sqlx::query(
                r#"
                UPDATE tournaments
                SET name = $3, description = $4, status = $5, game_type = $6, legs_per_match = $7,
                    sets_per_match = $8, max_players = $9, entry_fee = $10, prize_pool = $11,
                    scheduled_date = $12, started_at = $13, completed_at = $14,
                    results_applied_at = $15, version = version + 1
                WHERE id = $1 AND version = $2
                RETURNING version
                "#,
            )
            .bind(tournament.id)
            .bind(tournament.version)
            .bind(&tournament.name)
            .bind(&tournament.description)
            .bind(tournament.status.as_str())
            .bind(tournament.format.game_type.as_str())
            .bind(i64::from(tournament.format.legs_per_match))
            .bind(i64::from(tournament.format.sets_per_match))
            .bind(tournament.max_players.map(i64::from))
            .bind(tournament.entry_fee)
            .bind(tournament.prize_pool)
            .bind(tournament.scheduled_date)
            .bind(tournament.started_at)
            .bind(tournament.completed_at)
            .bind(tournament.results_applied_at)
            .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(row) => Ok(row.try_get("version")?),
            None => self.missing_or_conflict("tournaments", tournament.id).await,
        }
    }

    async fn next_tournament_number(&self, league_id: LeagueId) -> StoreResult<u32> {
        let row = bounded_statement(
            sqlx::query(
                "SELECT COALESCE(MAX(tournament_number), 0) + 1 AS next FROM tournaments WHERE league_id = $1",
            )
            .bind(league_id)
            .fetch_one(&self.pool),
        )
        .await?;
        get_u32(&row, "next")
    }

    async fn add_player(&self, entry: &TournamentEntry) -> StoreResult<()> {
        bounded_statement(
            sqlx::query(
                "INSERT INTO tournament_players (tournament_id, player_id, seed, joined_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(entry.tournament_id)
            .bind(entry.player_id)
            .bind(entry.seed.map(i64::from))
            .bind(entry.joined_at)
            .execute(&self.pool),
        )
        .await
        .map_err(|e| {
            classify(e, || {
                StoreError::Duplicate(format!("{}:{}", entry.tournament_id, entry.player_id))
            })
        })?;
        Ok(())
    }

    async fn remove_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<()> {
        let result = bounded_statement(
            sqlx::query(
                "DELETE FROM tournament_players WHERE tournament_id = $1 AND player_id = $2",
            )
            .bind(tournament_id)
            .bind(player_id)
            .execute(&self.pool),
        )
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn is_player_in_tournament(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        let row = bounded_statement(
            sqlx::query(
                "SELECT EXISTS(SELECT 1 FROM tournament_players WHERE tournament_id = $1 AND player_id = $2) AS entered",
            )
            .bind(tournament_id)
            .bind(player_id)
            .fetch_one(&self.pool),
        )
        .await?;
        Ok(row.try_get("entered")?)
    }

    async fn list_players(&self, tournament_id: TournamentId) -> StoreResult<Vec<TournamentEntry>> {
        let rows = bounded_statement(
            sqlx::query(
                "SELECT tournament_id, player_id, seed, joined_at FROM tournament_players WHERE tournament_id = $1 ORDER BY seq",
            )
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn player_count(&self, tournament_id: TournamentId) -> StoreResult<u32> {
        let row = bounded_statement(
            sqlx::query("SELECT COUNT(*) AS count FROM tournament_players WHERE tournament_id = $1")
                .bind(tournament_id)
                .fetch_one(&self.pool),
        )
        .await?;
        count_from_row(&row)
    }
}

const INSERT_MATCH: &str = r#"
    INSERT INTO matches (id, tournament_id, round, match_number, player1_id, player2_id,
        player1_score, player2_score, winner_id, status, started_at, completed_at, created_at,
        version)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
"#;

fn bind_match<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    m: &'q Match,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(m.id)
        .bind(m.tournament_id)
        .bind(i64::from(m.round))
        .bind(i64::from(m.match_number))
        .bind(m.player1_id)
        .bind(m.player2_id)
        .bind(i64::from(m.player1_score))
        .bind(i64::from(m.player2_score))
        .bind(m.winner_id)
        .bind(m.status.as_str())
        .bind(m.started_at)
        .bind(m.completed_at)
        .bind(m.created_at)
        .bind(m.version)
}

#[async_trait]
impl MatchRepository for PgStore {
    async fn create(&self, m: &Match) -> StoreResult<()> {
        bounded_statement(bind_match(sqlx::query(INSERT_MATCH), m).execute(&self.pool))
            .await
            .map_err(|e| classify(e, || StoreError::Duplicate(m.id.to_string())))?;
        Ok(())
    }

    async fn create_many(&self, matches: &[Match]) -> StoreResult<()> {
        bounded_transaction(async {
            let mut tx = self.pool.begin().await?;
            for m in matches {
                bind_match(sqlx::query(INSERT_MATCH), m)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await
        })
        .await
        .map_err(|e| classify(e, || StoreError::Duplicate("match".to_string())))
    }

    async fn get_by_id(&self, id: MatchId) -> StoreResult<Match> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1");
        let row = bounded_statement(sqlx::query(&sql).bind(id).fetch_optional(&self.pool))
            .await?
            .ok_or(StoreError::NotFound)?;
        match_from_row(&row)
    }

    async fn update(&self, m: &Match) -> StoreResult<i64> {
        let row = bounded_statement(
            sqlx::query(
                r#"
                UPDATE matches
                SET player1_id = $3, player2_id = $4, player1_score = $5, player2_score = $6,
                    winner_id = $7, status = $8, started_at = $9, completed_at = $10,
                    version = version + 1
                WHERE id = $1 AND version = $2
                RETURNING version
                "#,
            )
            .bind(m.id)
            .bind(m.version)
            .bind(m.player1_id)
            .bind(m.player2_id)
            .bind(i64::from(m.player1_score))
            .bind(i64::from(m.player2_score))
            .bind(m.winner_id)
            .bind(m.status.as_str())
            .bind(m.started_at)
            .bind(m.completed_at)
            .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(row) => Ok(row.try_get("version")?),
            None => self.missing_or_conflict("matches", m.id).await,
        }
    }

    async fn get_by_tournament_id(&self, tournament_id: TournamentId) -> StoreResult<Vec<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1 ORDER BY round, match_number"
        );
        let rows = bounded_statement(sqlx::query(&sql).bind(tournament_id).fetch_all(&self.pool))
            .await?;
        rows.iter().map(match_from_row).collect()
    }

    async fn get_by_player_id(
        &self,
        player_id: PlayerId,
        limit: u32,
        offset: u32,
    ) -> StoreResult<Vec<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE player1_id = $1 OR player2_id = $1 \
             ORDER BY created_at, round, match_number, id LIMIT $2 OFFSET $3"
        );
        let rows = bounded_statement(
            sqlx::query(&sql)
                .bind(player_id)
                .bind(i64::from(limit))
                .bind(i64::from(offset))
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(match_from_row).collect()
    }
}

#[async_trait]
impl StandingsRepository for PgStore {
    async fn create(&self, standing: &LeagueStanding) -> StoreResult<()> {
        bounded_statement(
            sqlx::query(
                r#"
                INSERT INTO league_standings (league_id, player_id, total_points,
                    tournaments_played, tournaments_won, finals_reached, semi_finals_reached,
                    current_position, previous_position, enrolled_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(standing.league_id)
            .bind(standing.player_id)
            .bind(standing.total_points)
            .bind(i64::from(standing.tournaments_played))
            .bind(i64::from(standing.tournaments_won))
            .bind(i64::from(standing.finals_reached))
            .bind(i64::from(standing.semi_finals_reached))
            .bind(i64::from(standing.current_position))
            .bind(i64::from(standing.previous_position))
            .bind(standing.enrolled_at)
            .execute(&self.pool),
        )
        .await
        .map_err(|e| {
            classify(e, || {
                StoreError::Duplicate(format!("{}:{}", standing.league_id, standing.player_id))
            })
        })?;
        Ok(())
    }

    async fn get(&self, league_id: LeagueId, player_id: PlayerId) -> StoreResult<LeagueStanding> {
        let sql = format!(
            "SELECT {STANDING_COLUMNS} FROM league_standings WHERE league_id = $1 AND player_id = $2"
        );
        let row = bounded_statement(
            sqlx::query(&sql)
                .bind(league_id)
                .bind(player_id)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(StoreError::NotFound)?;
        standing_from_row(&row)
    }

    async fn get_league_standings(&self, league_id: LeagueId) -> StoreResult<Vec<LeagueStanding>> {
        let sql = format!(
            "SELECT {STANDING_COLUMNS} FROM league_standings WHERE league_id = $1 ORDER BY total_points DESC, seq"
        );
        let rows =
            bounded_statement(sqlx::query(&sql).bind(league_id).fetch_all(&self.pool)).await?;
        rows.iter().map(standing_from_row).collect()
    }

    async fn list_by_enrollment(&self, league_id: LeagueId) -> StoreResult<Vec<LeagueStanding>> {
        let sql = format!(
            "SELECT {STANDING_COLUMNS} FROM league_standings WHERE league_id = $1 ORDER BY seq"
        );
        let rows =
            bounded_statement(sqlx::query(&sql).bind(league_id).fetch_all(&self.pool)).await?;
        rows.iter().map(standing_from_row).collect()
    }

    async fn add_points(
        &self,
        league_id: LeagueId,
        delta: &StandingDelta,
        scoring_key: &str,
    ) -> StoreResult<LeagueStanding> {
        let update_sql = format!(
            r#"
            UPDATE league_standings
            SET total_points = total_points + $3,
                tournaments_played = tournaments_played + $4,
                tournaments_won = tournaments_won + $5,
                finals_reached = finals_reached + $6,
                semi_finals_reached = semi_finals_reached + $7
            WHERE league_id = $1 AND player_id = $2
            RETURNING {STANDING_COLUMNS}
            "#
        );

        let outcome = bounded_transaction(async {
            let mut tx = self.pool.begin().await?;

            let recorded = sqlx::query(
                r#"
                INSERT INTO standing_events (league_id, scoring_key, player_id, points)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (league_id, scoring_key) DO NOTHING
                "#,
            )
            .bind(league_id)
            .bind(scoring_key)
            .bind(delta.player_id)
            .bind(delta.points)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if recorded == 0 {
                return Ok::<_, sqlx::Error>(TxOutcome::DuplicateKey);
            }

            let row = sqlx::query(&update_sql)
                .bind(league_id)
                .bind(delta.player_id)
                .bind(delta.points)
                .bind(i64::from(delta.tournaments_played))
                .bind(i64::from(delta.tournaments_won))
                .bind(i64::from(delta.finals_reached))
                .bind(i64::from(delta.semi_finals_reached))
                .fetch_optional(&mut *tx)
                .await?;

            match row {
                // Dropping the transaction rolls back the event row
                None => Ok::<_, sqlx::Error>(TxOutcome::Missing),
                Some(row) => {
                    tx.commit().await?;
                    Ok(TxOutcome::Done(row))
                }
            }
        })
        .await?;

        match outcome {
            TxOutcome::Done(row) => standing_from_row(&row),
            TxOutcome::Missing => Err(StoreError::NotFound),
            TxOutcome::DuplicateKey => Err(StoreError::Duplicate(scoring_key.to_string())),
        }
    }

    async fn recalculate_positions(
        &self,
        league_id: LeagueId,
        updates: &[PositionUpdate],
    ) -> StoreResult<()> {
        let outcome = bounded_transaction(async {
            let mut tx = self.pool.begin().await?;
            for update in updates {
                let affected = sqlx::query(
                    r#"
                    UPDATE league_standings
                    SET current_position = $3, previous_position = $4
                    WHERE league_id = $1 AND player_id = $2
                    "#,
                )
                .bind(league_id)
                .bind(update.player_id)
                .bind(i64::from(update.current_position))
                .bind(i64::from(update.previous_position))
                .execute(&mut *tx)
                .await?
                .rows_affected();
                if affected == 0 {
                    return Ok::<_, sqlx::Error>(TxOutcome::Missing);
                }
            }
            tx.commit().await?;
            Ok(TxOutcome::Done(()))
        })
        .await?;

        match outcome {
            TxOutcome::Done(()) => Ok(()),
            TxOutcome::Missing | TxOutcome::DuplicateKey => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, league_id: LeagueId, player_id: PlayerId) -> StoreResult<()> {
        let result = bounded_statement(
            sqlx::query("DELETE FROM league_standings WHERE league_id = $1 AND player_id = $2")
                .bind(league_id)
                .bind(player_id)
                .execute(&self.pool),
        )
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
