//! Players: identity records shared by every league.

pub mod manager;
pub mod models;

pub use manager::PlayerManager;
pub use models::{Player, PlayerId, PlayerProfile};
