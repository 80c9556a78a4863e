//! Standings data models and ranking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{LeagueError, LeagueResult};
use crate::league::{LeagueId, PointsSchedule};
use crate::matches::{Match, MatchStatus};
use crate::player::PlayerId;
use crate::tournament::TournamentType;

/// A player's accumulated record within one league
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueStanding {
    pub league_id: LeagueId,
    pub player_id: PlayerId,
    pub total_points: i32,
    pub tournaments_played: u32,
    pub tournaments_won: u32,
    pub finals_reached: u32,
    pub semi_finals_reached: u32,
    /// 0 until the first ranking
    pub current_position: u32,
    pub previous_position: u32,
    pub enrolled_at: DateTime<Utc>,
}

impl LeagueStanding {
    /// Zeroed row for a newly enrolled player
    pub fn new(league_id: LeagueId, player_id: PlayerId, now: DateTime<Utc>) -> Self {
        Self {
            league_id,
            player_id,
            total_points: 0,
            tournaments_played: 0,
            tournaments_won: 0,
            finals_reached: 0,
            semi_finals_reached: 0,
            current_position: 0,
            previous_position: 0,
            enrolled_at: now,
        }
    }

    /// `current_position - previous_position`; negative means the player climbed
    pub fn position_change(&self) -> i64 {
        i64::from(self.current_position) - i64::from(self.previous_position)
    }

    /// Add a delta to the counters
    pub fn apply(&mut self, delta: &StandingDelta) {
        self.total_points += delta.points;
        self.tournaments_played += delta.tournaments_played;
        self.tournaments_won += delta.tournaments_won;
        self.finals_reached += delta.finals_reached;
        self.semi_finals_reached += delta.semi_finals_reached;
    }
}

/// Finishing place that earns league points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Winner,
    RunnerUp,
    SemiFinalist,
}

/// Additive change to one standing row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingDelta {
    pub player_id: PlayerId,
    pub points: i32,
    pub tournaments_played: u32,
    pub tournaments_won: u32,
    pub finals_reached: u32,
    pub semi_finals_reached: u32,
}

impl StandingDelta {
    /// Bare points adjustment
    pub fn points(player_id: PlayerId, points: i32) -> Self {
        Self {
            player_id,
            points,
            tournaments_played: 0,
            tournaments_won: 0,
            finals_reached: 0,
            semi_finals_reached: 0,
        }
    }

    /// Delta for one entrant of a finished tournament.
    ///
    /// A winner also counts as finalist and semi-finalist, a runner-up as
    /// semi-finalist.
    pub fn for_tournament(
        player_id: PlayerId,
        placement: Option<Placement>,
        schedule: &PointsSchedule,
    ) -> Self {
        let mut delta = Self::points(player_id, 0);
        delta.tournaments_played = 1;

        if let Some(placement) = placement {
            delta.points = schedule.points_for(placement);
            delta.semi_finals_reached = 1;
            if matches!(placement, Placement::Winner | Placement::RunnerUp) {
                delta.finals_reached = 1;
            }
            if placement == Placement::Winner {
                delta.tournaments_won = 1;
            }
        }
        delta
    }
}

/// New position for one standing row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub player_id: PlayerId,
    pub current_position: u32,
    pub previous_position: u32,
}

/// Rank standings by total points, highest first.
///
/// `standings` must be in enrolment order; equal totals keep that order.
/// Each row's old `current_position` moves to `previous_position`.
pub fn rank_standings(standings: &[LeagueStanding]) -> Vec<PositionUpdate> {
    let mut ranked: Vec<&LeagueStanding> = standings.iter().collect();
    ranked.sort_by(|a, b| b.total_points.cmp(&a.total_points));

    ranked
        .into_iter()
        .zip(1u32..)
        .map(|(s, position)| PositionUpdate {
            player_id: s.player_id,
            current_position: position,
            previous_position: s.current_position,
        })
        .collect()
}

/// Point-earning finishers of one tournament
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentPlacements {
    pub winner: Option<PlayerId>,
    pub runner_up: Option<PlayerId>,
    pub semi_finalists: Vec<PlayerId>,
}

impl TournamentPlacements {
    pub fn placement_of(&self, player_id: PlayerId) -> Option<Placement> {
        if self.winner == Some(player_id) {
            Some(Placement::Winner)
        } else if self.runner_up == Some(player_id) {
            Some(Placement::RunnerUp)
        } else if self.semi_finalists.contains(&player_id) {
            Some(Placement::SemiFinalist)
        } else {
            None
        }
    }

    /// All placed players, winner first
    pub fn placed_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.winner
            .into_iter()
            .chain(self.runner_up)
            .chain(self.semi_finalists.iter().copied())
    }

    /// Derive placements from the completed matches of a tournament.
    ///
    /// Elimination: the highest round with completed matches is the final and
    /// must hold exactly one. Its winner and loser are first and second; the
    /// losers of the round before are semi-finalists.
    ///
    /// Round robin: players ordered by match wins, ties by first appearance
    /// in schedule order. Places 1 and 2 map to winner and runner-up, places
    /// 3 and 4 to semi-finalists.
    pub fn from_matches(tournament_type: TournamentType, matches: &[Match]) -> LeagueResult<Self> {
        let mut completed: Vec<&Match> = matches
            .iter()
            .filter(|m| m.status == MatchStatus::Completed && m.winner_id.is_some())
            .collect();
        if completed.is_empty() {
            return Err(LeagueError::validation(
                "tournament results",
                "no completed matches",
            ));
        }
        completed.sort_by_key(|m| (m.round, m.match_number));

        if tournament_type.is_elimination() {
            Self::from_elimination(&completed)
        } else {
            Ok(Self::from_round_robin(&completed))
        }
    }

    fn from_elimination(completed: &[&Match]) -> LeagueResult<Self> {
        let final_round = completed.iter().map(|m| m.round).max().unwrap_or(1);
        let finals: Vec<&&Match> = completed.iter().filter(|m| m.round == final_round).collect();
        if finals.len() != 1 {
            return Err(LeagueError::validation(
                "tournament results",
                format!(
                    "round {final_round} has {} completed matches, expected a single final",
                    finals.len()
                ),
            ));
        }

        let final_match = finals[0];
        let semi_finalists = completed
            .iter()
            .filter(|m| final_round > 1 && m.round == final_round - 1)
            .filter_map(|m| m.loser())
            .collect();

        Ok(Self {
            winner: final_match.winner_id,
            runner_up: final_match.loser(),
            semi_finalists,
        })
    }

    fn from_round_robin(completed: &[&Match]) -> Self {
        let mut first_seen: Vec<PlayerId> = Vec::new();
        let mut wins: HashMap<PlayerId, u32> = HashMap::new();

        for m in completed {
            for player in [m.player1_id, m.player2_id].into_iter().flatten() {
                if !wins.contains_key(&player) {
                    wins.insert(player, 0);
                    first_seen.push(player);
                }
            }
            if let Some(winner) = m.winner_id {
                *wins.entry(winner).or_insert(0) += 1;
            }
        }

        // Stable: ties keep schedule order
        first_seen.sort_by(|a, b| wins[b].cmp(&wins[a]));

        let mut places = first_seen.into_iter();
        Self {
            winner: places.next(),
            runner_up: places.next(),
            semi_finalists: places.take(2).collect(),
        }
    }
}
