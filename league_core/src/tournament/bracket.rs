//! Bracket generation strategies.
//!
//! A [`BracketGenerator`] turns a tournament and its entrants into the list of
//! matches created when the tournament starts. Generators are pure: the
//! manager persists whatever slots they return.

use serde::{Deserialize, Serialize};

use super::models::{Tournament, TournamentEntry, TournamentType};
use crate::errors::{LeagueError, LeagueResult};
use crate::player::PlayerId;

/// Minimum entrants for a generated bracket
pub const MIN_BRACKET_PLAYERS: usize = 2;

/// One match to create when a tournament starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSlot {
    pub round: u32,
    /// 1-based position within the round
    pub match_number: u32,
    /// Pre-assigned participants, if the strategy pairs players
    pub players: Option<(PlayerId, PlayerId)>,
}

impl BracketSlot {
    pub fn empty(round: u32, match_number: u32) -> Self {
        Self {
            round,
            match_number,
            players: None,
        }
    }

    pub fn paired(round: u32, match_number: u32, player1: PlayerId, player2: PlayerId) -> Self {
        Self {
            round,
            match_number,
            players: Some((player1, player2)),
        }
    }
}

/// Strategy producing the initial matches of a tournament
pub trait BracketGenerator: Send + Sync {
    fn generate(
        &self,
        tournament: &Tournament,
        entrants: &[TournamentEntry],
    ) -> LeagueResult<Vec<BracketSlot>>;
}

/// Two empty round-1 matches regardless of type or entrants.
///
/// Players are assigned to the matches afterwards through the match manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderBracket;

impl BracketGenerator for PlaceholderBracket {
    fn generate(
        &self,
        _tournament: &Tournament,
        _entrants: &[TournamentEntry],
    ) -> LeagueResult<Vec<BracketSlot>> {
        Ok(vec![BracketSlot::empty(1, 1), BracketSlot::empty(1, 2)])
    }
}

/// Seeds and pairs entrants according to the tournament type.
///
/// * Elimination: round 1 of a bracket padded to the next power of two, seed 1
///   meets the lowest seed. Top seeds get byes, and byes produce no match.
///   Double elimination only gets its winners-bracket opening round.
/// * Round robin: the complete all-pairs schedule (circle method).
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededBracket;

impl BracketGenerator for SeededBracket {
    fn generate(
        &self,
        tournament: &Tournament,
        entrants: &[TournamentEntry],
    ) -> LeagueResult<Vec<BracketSlot>> {
        if entrants.len() < MIN_BRACKET_PLAYERS {
            return Err(LeagueError::NotEnoughPlayers {
                needed: MIN_BRACKET_PLAYERS,
                current: entrants.len(),
            });
        }

        let order = seeding_order(entrants);
        let slots = match tournament.tournament_type {
            TournamentType::SingleElimination | TournamentType::DoubleElimination => {
                elimination_round_one(&order)
            }
            TournamentType::RoundRobin => round_robin_schedule(&order),
        };
        Ok(slots)
    }
}

/// Entrants in seeding order: seeded players by seed, then the rest in
/// enrolment order. `entrants` must already be in enrolment order.
pub fn seeding_order(entrants: &[TournamentEntry]) -> Vec<PlayerId> {
    let mut seeded: Vec<&TournamentEntry> = entrants.iter().filter(|e| e.seed.is_some()).collect();
    // Stable, so equal seeds keep enrolment order
    seeded.sort_by_key(|e| e.seed);

    seeded
        .into_iter()
        .chain(entrants.iter().filter(|e| e.seed.is_none()))
        .map(|e| e.player_id)
        .collect()
}

/// Bracket positions for `size` seeds, e.g. 8 → `[1, 8, 4, 5, 2, 7, 3, 6]`.
///
/// `size` must be a power of two.
fn bracket_positions(size: usize) -> Vec<usize> {
    let mut positions = vec![1];
    while positions.len() < size {
        let mirror = positions.len() * 2 + 1;
        positions = positions.iter().flat_map(|&s| [s, mirror - s]).collect();
    }
    positions
}

/// Round-1 pairings for an elimination bracket
pub fn elimination_round_one(order: &[PlayerId]) -> Vec<BracketSlot> {
    let n = order.len();
    let size = n.next_power_of_two();

    let mut slots = Vec::with_capacity(size / 2);
    for pair in bracket_positions(size).chunks(2) {
        let (high, low) = (pair[0], pair[1]);
        if low > n {
            // bye for `high`
            continue;
        }
        let match_number = slots.len() as u32 + 1;
        slots.push(BracketSlot::paired(1, match_number, order[high - 1], order[low - 1]));
    }
    slots
}

/// All-pairs schedule; every player meets every other exactly once.
///
/// With an odd count one player sits out each round.
pub fn round_robin_schedule(order: &[PlayerId]) -> Vec<BracketSlot> {
    let mut ring: Vec<Option<PlayerId>> = order.iter().copied().map(Some).collect();
    if ring.len() % 2 == 1 {
        ring.push(None);
    }
    let n = ring.len();

    let mut slots = Vec::with_capacity(n * (n - 1) / 2);
    for round in 1..n as u32 {
        let mut match_number = 0;
        for i in 0..n / 2 {
            if let (Some(a), Some(b)) = (ring[i], ring[n - 1 - i]) {
                match_number += 1;
                slots.push(BracketSlot::paired(round, match_number, a, b));
            }
        }
        // First position stays fixed
        ring[1..].rotate_right(1);
    }
    slots
}
