//! Tournaments: competitive events inside a league.
//!
//! This module provides:
//! - The tournament state machine (`setup → in_progress → completed`)
//! - Entrant enrolment with optional seeds
//! - Bracket generation when a tournament starts
//!
//! ## Example
//!
//! ```no_run
//! use league_core::league::NewLeague;
//! use league_core::services::LeagueServices;
//! use league_core::tournament::TournamentSettings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let services = LeagueServices::in_memory();
//!     let league = services.leagues.create_league(NewLeague::named("Winter League")).await?;
//!
//!     let cup = services
//!         .tournaments
//!         .create_tournament(league.id, "Opening Cup", TournamentSettings::single_elimination())
//!         .await?;
//!     println!("Created tournament #{}", cup.tournament_number);
//!
//!     Ok(())
//! }
//! ```

pub mod bracket;
pub mod manager;
pub mod models;

pub use bracket::{BracketGenerator, BracketSlot, PlaceholderBracket, SeededBracket};
pub use manager::TournamentManager;
pub use models::{
    GameFormat, GameType, Tournament, TournamentEntry, TournamentId, TournamentSettings,
    TournamentStatus, TournamentType,
};
