//! In-memory implementation of every repository port.
//!
//! Backs the test suites and embedders that do not need PostgreSQL. It
//! enforces the same constraints as the SQL schema: unique emails, unique
//! `(league_id, tournament_number)`, optimistic versions and one-shot
//! scoring keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::{StoreError, StoreResult};
use super::repository::{
    LeagueRepository, MatchRepository, PlayerRepository, StandingsRepository,
    TournamentRepository,
};
use crate::league::{League, LeagueId};
use crate::matches::{Match, MatchId};
use crate::player::{Player, PlayerId};
use crate::standings::{LeagueStanding, PositionUpdate, StandingDelta};
use crate::tournament::{Tournament, TournamentEntry, TournamentId};

#[derive(Default)]
struct State {
    players: HashMap<PlayerId, Player>,
    leagues: HashMap<LeagueId, League>,
    /// Members per league in enrolment order
    league_members: HashMap<LeagueId, Vec<(PlayerId, DateTime<Utc>)>>,
    tournaments: HashMap<TournamentId, Tournament>,
    /// Entrants per tournament in enrolment order
    entries: HashMap<TournamentId, Vec<TournamentEntry>>,
    matches: HashMap<MatchId, Match>,
    /// Standing rows per league in enrolment order
    standings: HashMap<LeagueId, Vec<LeagueStanding>>,
    scoring_keys: HashSet<(LeagueId, String)>,
}

/// Shared in-memory store; clones see the same data
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Bump `stored` to the next version if the caller saw the current one
fn next_version(stored: i64, seen: i64) -> StoreResult<i64> {
    if stored != seen {
        return Err(StoreError::Conflict);
    }
    Ok(stored + 1)
}

fn email_taken(state: &State, email: &str, except: Option<PlayerId>) -> bool {
    state
        .players
        .values()
        .any(|p| p.email.as_deref() == Some(email) && Some(p.id) != except)
}

#[async_trait]
impl PlayerRepository for InMemoryStore {
    async fn create(&self, player: &Player) -> StoreResult<()> {
        let mut state = self.state();
        if state.players.contains_key(&player.id) {
            return Err(StoreError::Duplicate(player.id.to_string()));
        }
        if let Some(email) = player.email.as_deref() {
            if email_taken(&state, email, None) {
                return Err(StoreError::Duplicate(email.to_string()));
            }
        }
        state.players.insert(player.id, player.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: PlayerId) -> StoreResult<Player> {
        self.state()
            .players
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Player> {
        self.state()
            .players
            .values()
            .find(|p| p.email.as_deref() == Some(email))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, limit: u32, offset: u32) -> StoreResult<Vec<Player>> {
        let state = self.state();
        let mut players: Vec<Player> = state.players.values().cloned().collect();
        players.sort_by_key(|p| (p.created_at, p.id));
        Ok(players
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update(&self, player: &Player) -> StoreResult<i64> {
        let mut state = self.state();
        let stored_version = state
            .players
            .get(&player.id)
            .map(|p| p.version)
            .ok_or(StoreError::NotFound)?;
        let version = next_version(stored_version, player.version)?;
        if let Some(email) = player.email.as_deref() {
            if email_taken(&state, email, Some(player.id)) {
                return Err(StoreError::Duplicate(email.to_string()));
            }
        }

        let mut stored = player.clone();
        stored.version = version;
        state.players.insert(player.id, stored);
        Ok(version)
    }

    /// Memberships, entries and standings go with the player; matches block it
    async fn delete(&self, id: PlayerId) -> StoreResult<()> {
        let mut state = self.state();
        if !state.players.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if state
            .matches
            .values()
            .any(|m| m.involves(id) || m.winner_id == Some(id))
        {
            return Err(StoreError::Referenced("matches"));
        }

        state.players.remove(&id);
        for members in state.league_members.values_mut() {
            members.retain(|(player_id, _)| *player_id != id);
        }
        for entries in state.entries.values_mut() {
            entries.retain(|e| e.player_id != id);
        }
        for rows in state.standings.values_mut() {
            rows.retain(|s| s.player_id != id);
        }
        Ok(())
    }

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        Ok(email_taken(&self.state(), email, None))
    }
}

#[async_trait]
impl LeagueRepository for InMemoryStore {
    async fn create(&self, league: &League) -> StoreResult<()> {
        let mut state = self.state();
        if state.leagues.contains_key(&league.id) {
            return Err(StoreError::Duplicate(league.id.to_string()));
        }
        state.leagues.insert(league.id, league.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: LeagueId) -> StoreResult<League> {
        self.state()
            .leagues
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> StoreResult<Vec<League>> {
        let mut leagues: Vec<League> = self.state().leagues.values().cloned().collect();
        leagues.sort_by_key(|l| (l.created_at, l.id));
        Ok(leagues)
    }

    async fn update(&self, league: &League) -> StoreResult<i64> {
        let mut state = self.state();
        let stored = state.leagues.get_mut(&league.id).ok_or(StoreError::NotFound)?;
        let version = next_version(stored.version, league.version)?;
        *stored = league.clone();
        stored.version = version;
        Ok(version)
    }

    async fn add_player(
        &self,
        league_id: LeagueId,
        player_id: PlayerId,
        joined_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.state();
        if !state.leagues.contains_key(&league_id) || !state.players.contains_key(&player_id) {
            return Err(StoreError::NotFound);
        }
        let members = state.league_members.entry(league_id).or_default();
        if members.iter().any(|(p, _)| *p == player_id) {
            return Err(StoreError::Duplicate(format!("{league_id}:{player_id}")));
        }
        members.push((player_id, joined_at));
        Ok(())
    }

    async fn remove_player(&self, league_id: LeagueId, player_id: PlayerId) -> StoreResult<()> {
        let mut state = self.state();
        let members = state
            .league_members
            .get_mut(&league_id)
            .ok_or(StoreError::NotFound)?;
        let before = members.len();
        members.retain(|(p, _)| *p != player_id);
        if members.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn is_player_in_league(
        &self,
        league_id: LeagueId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        Ok(self
            .state()
            .league_members
            .get(&league_id)
            .is_some_and(|members| members.iter().any(|(p, _)| *p == player_id)))
    }

    async fn player_count(&self, league_id: LeagueId) -> StoreResult<u32> {
        let count = self
            .state()
            .league_members
            .get(&league_id)
            .map_or(0, Vec::len);
        Ok(count as u32)
    }
}

#[async_trait]
impl TournamentRepository for InMemoryStore {
    async fn create(&self, tournament: &Tournament) -> StoreResult<()> {
        let mut state = self.state();
        if !state.leagues.contains_key(&tournament.league_id) {
            return Err(StoreError::NotFound);
        }
        if state.tournaments.contains_key(&tournament.id) {
            return Err(StoreError::Duplicate(tournament.id.to_string()));
        }
        let number_taken = state.tournaments.values().any(|t| {
            t.league_id == tournament.league_id
                && t.tournament_number == tournament.tournament_number
        });
        if number_taken {
            return Err(StoreError::Conflict);
        }
        state.tournaments.insert(tournament.id, tournament.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: TournamentId) -> StoreResult<Tournament> {
        self.state()
            .tournaments
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_by_league(&self, league_id: LeagueId) -> StoreResult<Vec<Tournament>> {
        let mut tournaments: Vec<Tournament> = self
            .state()
            .tournaments
            .values()
            .filter(|t| t.league_id == league_id)
            .cloned()
            .collect();
        tournaments.sort_by_key(|t| t.tournament_number);
        Ok(tournaments)
    }

    async fn update(&self, tournament: &Tournament) -> StoreResult<i64> {
        let mut state = self.state();
        let stored = state
            .tournaments
            .get_mut(&tournament.id)
            .ok_or(StoreError::NotFound)?;
        let version = next_version(stored.version, tournament.version)?;
        *stored = tournament.clone();
        stored.version = version;
        Ok(version)
    }

    async fn next_tournament_number(&self, league_id: LeagueId) -> StoreResult<u32> {
        let max = self
            .state()
            .tournaments
            .values()
            .filter(|t| t.league_id == league_id)
            .map(|t| t.tournament_number)
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    async fn add_player(&self, entry: &TournamentEntry) -> StoreResult<()> {
        let mut state = self.state();
        if !state.tournaments.contains_key(&entry.tournament_id)
            || !state.players.contains_key(&entry.player_id)
        {
            return Err(StoreError::NotFound);
        }
        let entries = state.entries.entry(entry.tournament_id).or_default();
        if entries.iter().any(|e| e.player_id == entry.player_id) {
            return Err(StoreError::Duplicate(format!(
                "{}:{}",
                entry.tournament_id, entry.player_id
            )));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn remove_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<()> {
        let mut state = self.state();
        let entries = state
            .entries
            .get_mut(&tournament_id)
            .ok_or(StoreError::NotFound)?;
        let before = entries.len();
        entries.retain(|e| e.player_id != player_id);
        if entries.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn is_player_in_tournament(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        Ok(self
            .state()
            .entries
            .get(&tournament_id)
            .is_some_and(|entries| entries.iter().any(|e| e.player_id == player_id)))
    }

    async fn list_players(&self, tournament_id: TournamentId) -> StoreResult<Vec<TournamentEntry>> {
        Ok(self
            .state()
            .entries
            .get(&tournament_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn player_count(&self, tournament_id: TournamentId) -> StoreResult<u32> {
        let count = self.state().entries.get(&tournament_id).map_or(0, Vec::len);
        Ok(count as u32)
    }
}

#[async_trait]
impl MatchRepository for InMemoryStore {
    async fn create(&self, m: &Match) -> StoreResult<()> {
        self.create_many(std::slice::from_ref(m)).await
    }

    async fn create_many(&self, matches: &[Match]) -> StoreResult<()> {
        let mut state = self.state();
        for m in matches {
            if !state.tournaments.contains_key(&m.tournament_id) {
                return Err(StoreError::NotFound);
            }
            if state.matches.contains_key(&m.id) {
                return Err(StoreError::Duplicate(m.id.to_string()));
            }
        }
        for m in matches {
            state.matches.insert(m.id, m.clone());
        }
        Ok(())
    }

    async fn get_by_id(&self, id: MatchId) -> StoreResult<Match> {
        self.state()
            .matches
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, m: &Match) -> StoreResult<i64> {
        let mut state = self.state();
        let stored = state.matches.get_mut(&m.id).ok_or(StoreError::NotFound)?;
        let version = next_version(stored.version, m.version)?;
        *stored = m.clone();
        stored.version = version;
        Ok(version)
    }

    async fn get_by_tournament_id(&self, tournament_id: TournamentId) -> StoreResult<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .state()
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round, m.match_number));
        Ok(matches)
    }

    async fn get_by_player_id(
        &self,
        player_id: PlayerId,
        limit: u32,
        offset: u32,
    ) -> StoreResult<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .state()
            .matches
            .values()
            .filter(|m| m.involves(player_id))
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.created_at, m.round, m.match_number, m.id));
        Ok(matches
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl StandingsRepository for InMemoryStore {
    async fn create(&self, standing: &LeagueStanding) -> StoreResult<()> {
        let mut state = self.state();
        if !state.leagues.contains_key(&standing.league_id) {
            return Err(StoreError::NotFound);
        }
        let rows = state.standings.entry(standing.league_id).or_default();
        if rows.iter().any(|s| s.player_id == standing.player_id) {
            return Err(StoreError::Duplicate(format!(
                "{}:{}",
                standing.league_id, standing.player_id
            )));
        }
        rows.push(standing.clone());
        Ok(())
    }

    async fn get(&self, league_id: LeagueId, player_id: PlayerId) -> StoreResult<LeagueStanding> {
        self.state()
            .standings
            .get(&league_id)
            .and_then(|rows| rows.iter().find(|s| s.player_id == player_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_league_standings(&self, league_id: LeagueId) -> StoreResult<Vec<LeagueStanding>> {
        let mut rows = self.list_by_enrollment(league_id).await?;
        rows.sort_by(|a, b| b.total_points.cmp(&a.total_points));
        Ok(rows)
    }

    async fn list_by_enrollment(&self, league_id: LeagueId) -> StoreResult<Vec<LeagueStanding>> {
        Ok(self
            .state()
            .standings
            .get(&league_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_points(
        &self,
        league_id: LeagueId,
        delta: &StandingDelta,
        scoring_key: &str,
    ) -> StoreResult<LeagueStanding> {
        let mut state = self.state();
        let key = (league_id, scoring_key.to_string());
        if state.scoring_keys.contains(&key) {
            return Err(StoreError::Duplicate(scoring_key.to_string()));
        }

        let row = state
            .standings
            .get_mut(&league_id)
            .and_then(|rows| rows.iter_mut().find(|s| s.player_id == delta.player_id))
            .ok_or(StoreError::NotFound)?;
        row.apply(delta);
        let updated = row.clone();

        state.scoring_keys.insert(key);
        Ok(updated)
    }

    async fn recalculate_positions(
        &self,
        league_id: LeagueId,
        updates: &[PositionUpdate],
    ) -> StoreResult<()> {
        let mut state = self.state();
        let rows = state
            .standings
            .get_mut(&league_id)
            .ok_or(StoreError::NotFound)?;
        if !updates
            .iter()
            .all(|u| rows.iter().any(|s| s.player_id == u.player_id))
        {
            return Err(StoreError::NotFound);
        }

        for update in updates {
            if let Some(row) = rows.iter_mut().find(|s| s.player_id == update.player_id) {
                row.current_position = update.current_position;
                row.previous_position = update.previous_position;
            }
        }
        Ok(())
    }

    async fn delete(&self, league_id: LeagueId, player_id: PlayerId) -> StoreResult<()> {
        let mut state = self.state();
        let rows = state
            .standings
            .get_mut(&league_id)
            .ok_or(StoreError::NotFound)?;
        let before = rows.len();
        rows.retain(|s| s.player_id != player_id);
        if rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
