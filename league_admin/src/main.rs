//! Operator CLI for a darts league database.
//!
//! Every command connects to PostgreSQL, runs one league operation through the
//! core managers and prints the result as JSON on stdout.

mod commands;
mod config;
mod logging;

use std::time::Instant;

use anyhow::{Context, Error};
use log::info;
use pico_args::Arguments;

use commands::Command;
use config::AdminConfig;
use league_core::LeagueServices;
use league_core::db::{Database, Repositories};

const HELP: &str = "\
Administer darts leagues, tournaments and matches

USAGE:
  league_admin [OPTIONS] <COMMAND> [ARGS]

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

COMMANDS:
  migrate                                        Create the league tables
  player-add --name N [--email E] [--nickname K] [--avatar-url U]
  players [--limit N] [--offset N]
  player-matches [--limit N] [--offset N] PLAYER
  league-create --name N [--season S] [--description D] [--max-players N] [--points W,R,S]
  leagues
  league-start LEAGUE
  league-complete LEAGUE
  league-enroll LEAGUE PLAYER
  standings LEAGUE
  tournament-create --name N [--type single_elimination|double_elimination|round_robin]
                    [--description D] [--max-players N] [--legs N] [--sets N] LEAGUE
  tournament-enroll [--seed N] TOURNAMENT PLAYER
  tournament-start [--seeded] TOURNAMENT         Create round-1 matches (--seeded pairs entrants)
  tournament-complete TOURNAMENT
  tournament-score TOURNAMENT                    Credit placements to the league table
  matches TOURNAMENT
  match-start [--players P1,P2] MATCH
  match-score MATCH SCORE1 SCORE2
  match-complete MATCH WINNER

ENVIRONMENT:
  DATABASE_URL                    PostgreSQL connection string
  DB_MAX_CONNECTIONS              Pool size  [default: 10]
  LEAGUE_POINTS_FOR_WIN           Default points for new leagues  [default: 3]
  LEAGUE_POINTS_FOR_RUNNER_UP     [default: 2]
  LEAGUE_POINTS_FOR_SEMI_FINAL    [default: 1]
  RUST_LOG                        Log filter  [default: info,sqlx=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let config = AdminConfig::from_env(database_url)?;
    let command = Command::parse(pargs)?.with_default_points(config.default_points);

    logging::init();

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to league database")?;
    info!("Connected to league database");

    let started = Instant::now();
    let name = command.name();
    let result = match command {
        Command::Migrate => db
            .apply_schema()
            .await
            .map(|()| serde_json::json!({ "migrated": true }))
            .map_err(Error::from),
        command => {
            let services = LeagueServices::new(Repositories::postgres(db.pool().clone()));
            commands::run(&services, command).await
        }
    };
    logging::log_command(name, started.elapsed(), result.is_ok());

    db.close().await;

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
