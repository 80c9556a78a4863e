//! # League Core
//!
//! Lifecycle and standings engine for darts leagues.
//!
//! A league runs a season of tournaments; each tournament is played as a set
//! of two-player matches. Every aggregate is a small state machine:
//!
//! - **League**: `setup → active → completed`
//! - **Tournament**: `setup → in_progress → completed`, bracket generated on start
//! - **Match**: `pending → in_progress → completed`, winner fixed on completion
//!
//! Completed tournaments are credited to the league table by the
//! [`standings::StandingsAggregator`], once per tournament.
//!
//! ## Core Modules
//!
//! - [`player`], [`league`], [`tournament`], [`matches`], [`standings`]: models
//!   and their managers
//! - [`db`]: repository ports with in-memory and PostgreSQL adapters
//! - [`services`]: all managers wired over one set of repositories
//!
//! ## Example
//!
//! ```
//! use league_core::league::NewLeague;
//! use league_core::services::LeagueServices;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> league_core::LeagueResult<()> {
//! let services = LeagueServices::in_memory();
//! let league = services
//!     .leagues
//!     .create_league(NewLeague::named("Winter League"))
//!     .await?;
//! assert_eq!(league.points_for_win, 3);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod db;
pub mod errors;
pub mod league;
pub mod matches;
pub mod player;
pub mod services;
pub mod standings;
pub mod tournament;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{EntityKind, ErrorKind, LeagueError, LeagueResult};
pub use services::LeagueServices;
