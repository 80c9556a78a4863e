//! Integration tests for crediting tournament results to league standings

use league_core::db::Repositories;
use league_core::errors::ErrorKind;
use league_core::league::{LeagueId, NewLeague, PointsSchedule};
use league_core::player::{PlayerId, PlayerProfile};
use league_core::tournament::{SeededBracket, TournamentId, TournamentSettings};
use std::sync::Arc;
use league_core::{LeagueError, LeagueServices};

struct Season {
    services: LeagueServices,
    league_id: LeagueId,
    players: Vec<PlayerId>,
}

async fn season(names: &[&str], points: Option<PointsSchedule>) -> Season {
    let services =
        LeagueServices::new(Repositories::in_memory()).with_bracket(Arc::new(SeededBracket));
    let league = services
        .leagues
        .create_league(NewLeague {
            points,
            ..NewLeague::named("Standings League")
        })
        .await
        .unwrap();

    let mut players = Vec::new();
    for name in names {
        let p = services
            .players
            .create_player(PlayerProfile::named(*name))
            .await
            .unwrap();
        services.leagues.add_player(league.id, p.id).await.unwrap();
        players.push(p.id);
    }
    services.leagues.start_league(league.id).await.unwrap();

    Season {
        services,
        league_id: league.id,
        players,
    }
}

/// Round robin where the earlier-registered player always wins
async fn play_round_robin(s: &Season, entrants: &[PlayerId]) -> TournamentId {
    let t = s
        .services
        .tournaments
        .create_tournament(s.league_id, "Round Robin", TournamentSettings::round_robin())
        .await
        .unwrap();
    for p in entrants {
        s.services.tournaments.add_player(t.id, *p, None).await.unwrap();
    }
    let (_, schedule) = s.services.tournaments.start_tournament(t.id).await.unwrap();

    let rank = |p: PlayerId| entrants.iter().position(|e| *e == p).unwrap();
    for m in schedule {
        let (p1, p2) = m.participants().unwrap();
        let winner = if rank(p1) < rank(p2) { p1 } else { p2 };
        s.services.matches.start_match(m.id).await.unwrap();
        s.services.matches.complete_match(m.id, winner).await.unwrap();
    }
    s.services.tournaments.complete_tournament(t.id).await.unwrap();
    t.id
}

fn points_of(table: &[league_core::standings::LeagueStanding], p: PlayerId) -> i32 {
    table.iter().find(|s| s.player_id == p).unwrap().total_points
}

#[tokio::test]
async fn test_round_robin_placements() {
    let s = season(&["A", "B", "C", "D"], None).await;
    let t = play_round_robin(&s, &s.players).await;

    let table = s.services.standings.apply_tournament_result(t).await.unwrap();

    let ordered: Vec<_> = table.iter().map(|row| row.player_id).collect();
    assert_eq!(ordered, s.players);
    assert_eq!(
        table.iter().map(|row| row.total_points).collect::<Vec<_>>(),
        vec![3, 2, 1, 1]
    );
    assert_eq!(
        table.iter().map(|row| row.current_position).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
}

#[tokio::test]
async fn test_applying_twice_is_rejected_without_double_points() {
    let s = season(&["A", "B", "C"], None).await;
    let t = play_round_robin(&s, &s.players).await;

    s.services.standings.apply_tournament_result(t).await.unwrap();
    let err = s
        .services
        .standings
        .apply_tournament_result(t)
        .await
        .unwrap_err();
    assert!(matches!(err, LeagueError::ResultsAlreadyApplied(id) if id == t));
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let table = s.services.leagues.get_standings(s.league_id).await.unwrap();
    assert_eq!(points_of(&table, s.players[0]), 3);
    assert!(table.iter().all(|row| row.tournaments_played == 1));
}

#[tokio::test]
async fn test_entrant_who_left_the_league_is_skipped() {
    let s = season(&["A", "B"], None).await;
    let t = play_round_robin(&s, &s.players).await;

    // B leaves after playing; their standing row goes with them
    s.services
        .leagues
        .remove_player(s.league_id, s.players[1])
        .await
        .unwrap();

    let table = s.services.standings.apply_tournament_result(t).await.unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(points_of(&table, s.players[0]), 3);
    assert_eq!(table[0].current_position, 1);

    let stored = s.services.tournaments.get_tournament(t).await.unwrap();
    assert!(stored.results_applied_at.is_some());
    let err = s
        .services
        .standings
        .apply_tournament_result(t)
        .await
        .unwrap_err();
    assert!(matches!(err, LeagueError::ResultsAlreadyApplied(_)));
}

#[tokio::test]
async fn test_unfinished_tournament_cannot_be_scored() {
    let s = season(&["A", "B"], None).await;
    let t = s
        .services
        .tournaments
        .create_tournament(s.league_id, "Pending", TournamentSettings::single_elimination())
        .await
        .unwrap();

    let err = s
        .services
        .standings
        .apply_tournament_result(t.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LeagueError::TournamentNotCompleted(_)));
}

#[tokio::test]
async fn test_partially_applied_result_resumes() {
    let s = season(&["A", "B", "C"], None).await;
    let t = play_round_robin(&s, &s.players).await;

    // An earlier attempt credited the winner before stopping
    let key = format!("{t}:{}", s.players[0]);
    s.services
        .standings
        .add_points(s.league_id, s.players[0], 3, &key)
        .await
        .unwrap();

    let table = s.services.standings.apply_tournament_result(t).await.unwrap();
    assert_eq!(points_of(&table, s.players[0]), 3);
    assert_eq!(points_of(&table, s.players[1]), 2);
}

#[tokio::test]
async fn test_scoring_key_is_idempotent() {
    let s = season(&["A"], None).await;

    s.services
        .standings
        .add_points(s.league_id, s.players[0], 5, "bonus:1")
        .await
        .unwrap();
    let err = s
        .services
        .standings
        .add_points(s.league_id, s.players[0], 5, "bonus:1")
        .await
        .unwrap_err();
    assert!(matches!(err, LeagueError::DuplicateScoringEvent(ref k) if k == "bonus:1"));
    assert_eq!(err.kind(), ErrorKind::Duplicate);

    let table = s.services.leagues.get_standings(s.league_id).await.unwrap();
    assert_eq!(table[0].total_points, 5);
}

#[tokio::test]
async fn test_custom_points_schedule() {
    let points = PointsSchedule::new(10, 6, 0).unwrap();
    let s = season(&["A", "B", "C"], Some(points)).await;
    let t = play_round_robin(&s, &s.players).await;

    let table = s.services.standings.apply_tournament_result(t).await.unwrap();
    assert_eq!(points_of(&table, s.players[0]), 10);
    assert_eq!(points_of(&table, s.players[1]), 6);
    assert_eq!(points_of(&table, s.players[2]), 0);
}

#[tokio::test]
async fn test_positions_track_previous_rank() {
    let s = season(&["A", "B", "C"], None).await;

    let first = play_round_robin(&s, &s.players).await;
    s.services.standings.apply_tournament_result(first).await.unwrap();

    // C wins everything in the second event
    let reversed: Vec<_> = s.players.iter().rev().copied().collect();
    let second = play_round_robin(&s, &reversed).await;
    let table = s.services.standings.apply_tournament_result(second).await.unwrap();

    let c = table.iter().find(|row| row.player_id == s.players[2]).unwrap();
    // A: 3 + 1, B: 2 + 2, C: 1 + 3; all tied on 4, so enrolment order decides
    assert_eq!(c.total_points, 4);
    assert_eq!(c.previous_position, 3);
    assert_eq!(c.current_position, 3);
    assert_eq!(c.position_change(), 0);
    assert_eq!(c.tournaments_won, 1);
}
