//! Admin subcommands and their dispatch onto the league managers.

use std::sync::Arc;

use anyhow::{Context, bail};
use pico_args::Arguments;
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use league_core::LeagueServices;
use league_core::league::{NewLeague, PointsSchedule};
use league_core::player::PlayerProfile;
use league_core::tournament::{SeededBracket, TournamentSettings, TournamentType};

/// Default page size for `players` and `player-matches`
const DEFAULT_PAGE_SIZE: u32 = 50;

/// A parsed admin subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Migrate,
    PlayerAdd {
        profile: PlayerProfile,
    },
    Players {
        limit: u32,
        offset: u32,
    },
    PlayerMatches {
        player_id: Uuid,
        limit: u32,
        offset: u32,
    },
    LeagueCreate {
        league: NewLeague,
    },
    Leagues,
    LeagueStart(Uuid),
    LeagueComplete(Uuid),
    LeagueEnroll {
        league_id: Uuid,
        player_id: Uuid,
    },
    Standings(Uuid),
    TournamentCreate {
        league_id: Uuid,
        name: String,
        settings: TournamentSettings,
    },
    TournamentEnroll {
        tournament_id: Uuid,
        player_id: Uuid,
        seed: Option<u32>,
    },
    TournamentStart {
        tournament_id: Uuid,
        /// Pair entrants instead of creating open slots
        seeded: bool,
    },
    TournamentComplete(Uuid),
    TournamentScore(Uuid),
    Matches(Uuid),
    MatchStart {
        match_id: Uuid,
        players: Option<(Uuid, Uuid)>,
    },
    MatchScore {
        match_id: Uuid,
        player1_score: u32,
        player2_score: u32,
    },
    MatchComplete {
        match_id: Uuid,
        winner_id: Uuid,
    },
}

impl Command {
    /// Parse the subcommand and its arguments
    ///
    /// Unknown or leftover arguments are rejected.
    pub fn parse(mut pargs: Arguments) -> anyhow::Result<Self> {
        let Some(name) = pargs.subcommand()? else {
            bail!("missing command, see --help");
        };

        let command = match name.as_str() {
            "migrate" => Command::Migrate,
            "player-add" => {
                let mut profile = PlayerProfile::named(pargs.value_from_str::<_, String>("--name")?);
                profile.email = pargs.opt_value_from_str("--email")?;
                profile.nickname = pargs.opt_value_from_str("--nickname")?;
                profile.avatar_url = pargs.opt_value_from_str("--avatar-url")?;
                Command::PlayerAdd { profile }
            }
            "players" => Command::Players {
                limit: pargs
                    .opt_value_from_str("--limit")?
                    .unwrap_or(DEFAULT_PAGE_SIZE),
                offset: pargs.opt_value_from_str("--offset")?.unwrap_or(0),
            },
            "player-matches" => {
                let limit = pargs
                    .opt_value_from_str("--limit")?
                    .unwrap_or(DEFAULT_PAGE_SIZE);
                let offset = pargs.opt_value_from_str("--offset")?.unwrap_or(0);
                Command::PlayerMatches {
                    player_id: pargs.free_from_str()?,
                    limit,
                    offset,
                }
            }
            "league-create" => {
                let mut league = NewLeague::named(pargs.value_from_str::<_, String>("--name")?);
                league.description = pargs.opt_value_from_str("--description")?;
                league.season = pargs.opt_value_from_str("--season")?;
                league.max_players = pargs.opt_value_from_str("--max-players")?;
                league.points = pargs.opt_value_from_fn("--points", parse_points)?;
                Command::LeagueCreate { league }
            }
            "leagues" => Command::Leagues,
            "league-start" => Command::LeagueStart(pargs.free_from_str()?),
            "league-complete" => Command::LeagueComplete(pargs.free_from_str()?),
            "league-enroll" => Command::LeagueEnroll {
                league_id: pargs.free_from_str()?,
                player_id: pargs.free_from_str()?,
            },
            "standings" => Command::Standings(pargs.free_from_str()?),
            "tournament-create" => {
                let name: String = pargs.value_from_str("--name")?;
                let tournament_type = pargs
                    .opt_value_from_str::<_, TournamentType>("--type")?
                    .unwrap_or(TournamentType::SingleElimination);
                let mut settings = TournamentSettings::new(tournament_type);
                settings.description = pargs.opt_value_from_str("--description")?;
                settings.max_players = pargs.opt_value_from_str("--max-players")?;
                if let Some(legs) = pargs.opt_value_from_str("--legs")? {
                    settings.format.legs_per_match = legs;
                }
                if let Some(sets) = pargs.opt_value_from_str("--sets")? {
                    settings.format.sets_per_match = sets;
                }
                Command::TournamentCreate {
                    league_id: pargs.free_from_str()?,
                    name,
                    settings,
                }
            }
            "tournament-enroll" => {
                let seed = pargs.opt_value_from_str("--seed")?;
                Command::TournamentEnroll {
                    tournament_id: pargs.free_from_str()?,
                    player_id: pargs.free_from_str()?,
                    seed,
                }
            }
            "tournament-start" => {
                let seeded = pargs.contains("--seeded");
                Command::TournamentStart {
                    tournament_id: pargs.free_from_str()?,
                    seeded,
                }
            }
            "tournament-complete" => Command::TournamentComplete(pargs.free_from_str()?),
            "tournament-score" => Command::TournamentScore(pargs.free_from_str()?),
            "matches" => Command::Matches(pargs.free_from_str()?),
            "match-start" => {
                let players = pargs.opt_value_from_fn("--players", parse_pair)?;
                Command::MatchStart {
                    match_id: pargs.free_from_str()?,
                    players,
                }
            }
            "match-score" => Command::MatchScore {
                match_id: pargs.free_from_str()?,
                player1_score: pargs.free_from_str()?,
                player2_score: pargs.free_from_str()?,
            },
            "match-complete" => Command::MatchComplete {
                match_id: pargs.free_from_str()?,
                winner_id: pargs.free_from_str()?,
            },
            other => bail!("unknown command: {other}"),
        };

        let rest = pargs.finish();
        if !rest.is_empty() {
            bail!("unexpected arguments: {rest:?}");
        }
        Ok(command)
    }

    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Migrate => "migrate",
            Command::PlayerAdd { .. } => "player-add",
            Command::Players { .. } => "players",
            Command::PlayerMatches { .. } => "player-matches",
            Command::LeagueCreate { .. } => "league-create",
            Command::Leagues => "leagues",
            Command::LeagueStart(_) => "league-start",
            Command::LeagueComplete(_) => "league-complete",
            Command::LeagueEnroll { .. } => "league-enroll",
            Command::Standings(_) => "standings",
            Command::TournamentCreate { .. } => "tournament-create",
            Command::TournamentEnroll { .. } => "tournament-enroll",
            Command::TournamentStart { .. } => "tournament-start",
            Command::TournamentComplete(_) => "tournament-complete",
            Command::TournamentScore(_) => "tournament-score",
            Command::Matches(_) => "matches",
            Command::MatchStart { .. } => "match-start",
            Command::MatchScore { .. } => "match-score",
            Command::MatchComplete { .. } => "match-complete",
        }
    }

    /// Fill in defaults that come from configuration
    pub fn with_default_points(mut self, default_points: PointsSchedule) -> Self {
        if let Command::LeagueCreate { league } = &mut self {
            league.points.get_or_insert(default_points);
        }
        self
    }
}

/// Run a command against the managers, returning its JSON result
///
/// `Migrate` is handled by the caller since it needs the raw database.
pub async fn run(services: &LeagueServices, command: Command) -> anyhow::Result<Value> {
    let value = match command {
        Command::Migrate => bail!("migrate must run against the database directly"),
        Command::PlayerAdd { profile } => to_json(services.players.create_player(profile).await?)?,
        Command::Players { limit, offset } => {
            to_json(services.players.list_players(limit, offset).await?)?
        }
        Command::PlayerMatches {
            player_id,
            limit,
            offset,
        } => to_json(
            services
                .matches
                .list_player_matches(player_id, limit, offset)
                .await?)?,
        Command::LeagueCreate { league } => to_json(services.leagues.create_league(league).await?)?,
        Command::Leagues => to_json(services.leagues.list_leagues().await?)?,
        Command::LeagueStart(id) => to_json(services.leagues.start_league(id).await?)?,
        Command::LeagueComplete(id) => to_json(services.leagues.complete_league(id).await?)?,
        Command::LeagueEnroll {
            league_id,
            player_id,
        } => to_json(services.leagues.add_player(league_id, player_id).await?)?,
        Command::Standings(league_id) => to_json(services.leagues.get_standings(league_id).await?)?,
        Command::TournamentCreate {
            league_id,
            name,
            settings,
        } => to_json(
            services
                .tournaments
                .create_tournament(league_id, name, settings)
                .await?)?,
        Command::TournamentEnroll {
            tournament_id,
            player_id,
            seed,
        } => {
            services
                .tournaments
                .add_player(tournament_id, player_id, seed)
                .await?;
            to_json(services.tournaments.list_players(tournament_id).await?)?
        }
        Command::TournamentStart {
            tournament_id,
            seeded,
        } => {
            let tournaments = if seeded {
                services.tournaments.clone().with_bracket(Arc::new(SeededBracket))
            } else {
                services.tournaments.clone()
            };
            let (tournament, bracket) = tournaments.start_tournament(tournament_id).await?;
            json!({ "tournament": to_json(tournament)?, "matches": to_json(bracket)? })
        }
        Command::TournamentComplete(id) => {
            to_json(services.tournaments.complete_tournament(id).await?)?
        }
        Command::TournamentScore(id) => {
            to_json(services.standings.apply_tournament_result(id).await?)?
        }
        Command::Matches(tournament_id) => to_json(
            services
                .matches
                .list_tournament_matches(tournament_id)
                .await?)?,
        Command::MatchStart { match_id, players } => match players {
            Some((p1, p2)) => to_json(
                services
                    .matches
                    .start_match_with_players(match_id, p1, p2)
                    .await?)?,
            None => to_json(services.matches.start_match(match_id).await?)?,
        },
        Command::MatchScore {
            match_id,
            player1_score,
            player2_score,
        } => to_json(
            services
                .matches
                .update_score(match_id, player1_score, player2_score)
                .await?)?,
        Command::MatchComplete {
            match_id,
            winner_id,
        } => to_json(services.matches.complete_match(match_id, winner_id).await?)?,
    };
    Ok(value)
}

fn to_json<T: Serialize>(value: T) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// `WIN,RUNNER_UP,SEMI_FINAL`, e.g. `3,2,1`
fn parse_points(s: &str) -> anyhow::Result<PointsSchedule> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid points schedule: {s}"))?;
    match values.as_slice() {
        [win, runner_up, semi_final] => Ok(PointsSchedule::new(*win, *runner_up, *semi_final)?),
        _ => bail!("points schedule needs three values, got {}", values.len()),
    }
}

/// `PLAYER1,PLAYER2`
fn parse_pair(s: &str) -> anyhow::Result<(Uuid, Uuid)> {
    let Some((a, b)) = s.split_once(',') else {
        bail!("expected two comma separated player ids");
    };
    Ok((a.trim().parse()?, b.trim().parse()?))
}
