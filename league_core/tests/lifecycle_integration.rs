//! Integration tests for the league lifecycle
//!
//! These tests drive a full season over the in-memory store: league setup,
//! enrolment, a seeded knockout tournament, match play and standings.

use chrono::{Duration, TimeZone, Utc};
use league_core::db::Repositories;
use league_core::errors::{EntityKind, ErrorKind};
use league_core::league::{LeagueStatus, NewLeague, PointsSchedule};
use league_core::matches::MatchStatus;
use league_core::player::{PlayerId, PlayerProfile};
use league_core::tournament::{SeededBracket, TournamentSettings, TournamentStatus};
use league_core::{Clock, LeagueError, LeagueServices, ManualClock};
use std::sync::Arc;

fn services_at_season_start() -> (LeagueServices, ManualClock) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 10, 19, 30, 0).unwrap());
    let services = LeagueServices::with_clock(Repositories::in_memory(), Arc::new(clock.clone()));
    (services, clock)
}

async fn register(services: &LeagueServices, names: &[&str]) -> Vec<PlayerId> {
    let mut ids = Vec::new();
    for name in names {
        let player = services
            .players
            .create_player(PlayerProfile::named(*name))
            .await
            .unwrap();
        ids.push(player.id);
    }
    ids
}

#[tokio::test]
async fn test_new_league_uses_default_points() {
    let (services, clock) = services_at_season_start();

    let league = services
        .leagues
        .create_league(NewLeague::named("Tuesday Night Darts"))
        .await
        .unwrap();

    assert_eq!(league.status, LeagueStatus::Setup);
    assert_eq!(league.points_schedule(), PointsSchedule { win: 3, runner_up: 2, semi_final: 1 });
    assert_eq!(league.created_at, clock.now());
    assert!(league.start_date.is_none());
}

#[tokio::test]
async fn test_league_start_twice_keeps_first_state() {
    let (services, clock) = services_at_season_start();
    let league = services
        .leagues
        .create_league(NewLeague::named("L"))
        .await
        .unwrap();

    let started = services.leagues.start_league(league.id).await.unwrap();
    let started_at = clock.now();
    clock.advance(Duration::days(1));

    let err = services.leagues.start_league(league.id).await.unwrap_err();
    assert!(matches!(err, LeagueError::AlreadyStarted(EntityKind::League)));
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let stored = services.leagues.get_league(league.id).await.unwrap();
    assert_eq!(stored, started);
    assert_eq!(stored.start_date, Some(started_at));
}

#[tokio::test]
async fn test_completed_league_rejects_tournaments_and_players() {
    let (services, _) = services_at_season_start();
    let league = services
        .leagues
        .create_league(NewLeague::named("L"))
        .await
        .unwrap();
    let players = register(&services, &["Late Joiner"]).await;

    services.leagues.complete_league(league.id).await.unwrap();

    let err = services
        .tournaments
        .create_tournament(league.id, "Too late", TournamentSettings::single_elimination())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LeagueError::LeagueNotAcceptingTournaments { status: LeagueStatus::Completed, .. }
    ));

    let err = services
        .leagues
        .add_player(league.id, players[0])
        .await
        .unwrap_err();
    assert!(matches!(err, LeagueError::AlreadyCompleted(EntityKind::League)));
}

#[tokio::test]
async fn test_tournament_enrolment_rules() {
    let (services, _) = services_at_season_start();
    let league = services
        .leagues
        .create_league(NewLeague::named("L"))
        .await
        .unwrap();
    let players = register(&services, &["A", "B", "Outsider"]).await;
    for p in &players[..2] {
        services.leagues.add_player(league.id, *p).await.unwrap();
    }

    let t = services
        .tournaments
        .create_tournament(league.id, "Open", TournamentSettings::single_elimination())
        .await
        .unwrap();
    assert_eq!(t.tournament_number, 1);

    services.tournaments.add_player(t.id, players[0], None).await.unwrap();
    // Duplicate add in setup is a no-op
    services.tournaments.add_player(t.id, players[0], None).await.unwrap();
    assert_eq!(services.tournaments.list_players(t.id).await.unwrap().len(), 1);

    let err = services
        .tournaments
        .add_player(t.id, players[2], None)
        .await
        .unwrap_err();
    assert!(matches!(err, LeagueError::PlayerNotInLeague { .. }));

    services.tournaments.add_player(t.id, players[1], None).await.unwrap();
    services.tournaments.start_tournament(t.id).await.unwrap();

    let err = services
        .tournaments
        .add_player(t.id, players[1], None)
        .await
        .unwrap_err();
    assert!(matches!(err, LeagueError::AlreadyStarted(EntityKind::Tournament)));
}

#[tokio::test]
async fn test_full_season_knockout() {
    let (services, clock) = services_at_season_start();
    let services = services.with_bracket(Arc::new(SeededBracket));
    let league = services
        .leagues
        .create_league(NewLeague {
            season: Some("2025".to_string()),
            ..NewLeague::named("County League")
        })
        .await
        .unwrap();
    let ids = register(&services, &["Ada", "Bo", "Cy", "Dee"]).await;
    for id in &ids {
        services.leagues.add_player(league.id, *id).await.unwrap();
    }
    services.leagues.start_league(league.id).await.unwrap();

    let t = services
        .tournaments
        .create_tournament(league.id, "Spring Open", TournamentSettings::single_elimination())
        .await
        .unwrap();
    for (seed, id) in ids.iter().enumerate() {
        services
            .tournaments
            .add_player(t.id, *id, Some(seed as u32 + 1))
            .await
            .unwrap();
    }

    clock.advance(Duration::hours(1));
    let (started, bracket) = services.tournaments.start_tournament(t.id).await.unwrap();
    assert_eq!(started.status, TournamentStatus::InProgress);
    assert_eq!(started.started_at, Some(clock.now()));
    assert_eq!(bracket.len(), 2);
    // 1 v 4, 2 v 3
    assert_eq!(bracket[0].participants(), Some((ids[0], ids[3])));
    assert_eq!(bracket[1].participants(), Some((ids[1], ids[2])));

    // Semi-finals: Ada and Cy go through
    for (m, winner) in [(&bracket[0], ids[0]), (&bracket[1], ids[2])] {
        services.matches.start_match(m.id).await.unwrap();
        services.matches.update_score(m.id, 3, 1).await.unwrap();
        let done = services.matches.complete_match(m.id, winner).await.unwrap();
        assert_eq!(done.status, MatchStatus::Completed);
    }

    let final_match = services.matches.create_match(t.id, 2, 1).await.unwrap();
    services
        .matches
        .start_match_with_players(final_match.id, ids[0], ids[2])
        .await
        .unwrap();
    services.matches.update_score(final_match.id, 2, 3).await.unwrap();
    services
        .matches
        .complete_match(final_match.id, ids[2])
        .await
        .unwrap();

    // Completing matches does not touch the table
    let before = services.leagues.get_standings(league.id).await.unwrap();
    assert!(before.iter().all(|s| s.total_points == 0));

    services.tournaments.complete_tournament(t.id).await.unwrap();
    let table = services.standings.apply_tournament_result(t.id).await.unwrap();

    let row = |id: PlayerId| table.iter().find(|s| s.player_id == id).unwrap();
    assert_eq!(row(ids[2]).total_points, 3);
    assert_eq!(row(ids[2]).tournaments_won, 1);
    assert_eq!(row(ids[2]).current_position, 1);
    assert_eq!(row(ids[0]).total_points, 2);
    assert_eq!(row(ids[0]).finals_reached, 1);
    assert_eq!(row(ids[0]).current_position, 2);
    assert_eq!(row(ids[1]).total_points, 1);
    assert_eq!(row(ids[3]).total_points, 1);
    assert_eq!(row(ids[3]).semi_finals_reached, 1);
    assert!(table.iter().all(|s| s.tournaments_played == 1));

    // Bo enrolled before Dee, so ties keep that order
    assert_eq!(row(ids[1]).current_position, 3);
    assert_eq!(row(ids[3]).current_position, 4);

    let t = services.tournaments.get_tournament(t.id).await.unwrap();
    assert!(t.results_applied_at.is_some());

    let league = services.leagues.complete_league(league.id).await.unwrap();
    assert_eq!(league.status, LeagueStatus::Completed);
    assert!(league.end_date.is_some());
}

#[tokio::test]
async fn test_second_tournament_number_increments() {
    let (services, _) = services_at_season_start();
    let league = services
        .leagues
        .create_league(NewLeague::named("L"))
        .await
        .unwrap();

    let first = services
        .tournaments
        .create_tournament(league.id, "One", TournamentSettings::single_elimination())
        .await
        .unwrap();
    let second = services
        .tournaments
        .create_tournament(league.id, "Two", TournamentSettings::round_robin())
        .await
        .unwrap();

    assert_eq!((first.tournament_number, second.tournament_number), (1, 2));
    let listed = services
        .tournaments
        .list_league_tournaments(league.id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn test_deleting_enrolled_player_clears_memberships() {
    let (services, _) = services_at_season_start();
    let league = services
        .leagues
        .create_league(NewLeague::named("Monday Doubles"))
        .await
        .unwrap();
    let ids = register(&services, &["Keep", "Drop"]).await;
    for id in &ids {
        services.leagues.add_player(league.id, *id).await.unwrap();
    }
    let t = services
        .tournaments
        .create_tournament(league.id, "Opener", TournamentSettings::single_elimination())
        .await
        .unwrap();
    services.tournaments.add_player(t.id, ids[1], None).await.unwrap();

    services.players.delete_player(ids[1]).await.unwrap();

    let table = services.leagues.get_standings(league.id).await.unwrap();
    assert_eq!(table.iter().map(|s| s.player_id).collect::<Vec<_>>(), vec![ids[0]]);
    assert!(!services.leagues.is_player_in_league(league.id, ids[1]).await.unwrap());
    assert!(services.tournaments.list_players(t.id).await.unwrap().is_empty());
    assert_eq!(services.players.list_players(10, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_player_with_matches_cannot_be_deleted() {
    let (services, _) = services_at_season_start();
    let league = services
        .leagues
        .create_league(NewLeague::named("L"))
        .await
        .unwrap();
    let ids = register(&services, &["A", "B"]).await;
    let t = services
        .tournaments
        .create_tournament(league.id, "T", TournamentSettings::single_elimination())
        .await
        .unwrap();
    let m = services.matches.create_match(t.id, 1, 1).await.unwrap();
    services.matches.assign_players(m.id, ids[0], ids[1]).await.unwrap();

    let err = services.players.delete_player(ids[0]).await.unwrap_err();
    assert!(matches!(err, LeagueError::InUse { entity: EntityKind::Player, by: "matches", .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(services.matches.list_player_matches(ids[0], 10, 0).await.unwrap().len(), 1);
}
