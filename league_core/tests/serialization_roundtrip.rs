//! Serialization tests: every entity survives a JSON round trip with all of
//! its optional fields, set or unset.

use chrono::{Duration, TimeZone, Utc};
use league_core::league::{League, PointsSchedule};
use league_core::matches::Match;
use league_core::player::{Player, PlayerProfile};
use league_core::standings::LeagueStanding;
use league_core::tournament::{Tournament, TournamentEntry, TournamentSettings, TournamentType};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use uuid::Uuid;

fn roundtrip<T>(value: &T) -> T
where
    T: Serialize + DeserializeOwned,
{
    let json = serde_json::to_string(value).unwrap();
    serde_json::from_str(&json).unwrap()
}

fn assert_roundtrip<T>(value: &T)
where
    T: Serialize + DeserializeOwned + PartialEq + Debug,
{
    assert_eq!(&roundtrip(value), value);
}

#[test]
fn test_player_optional_fields() {
    let now = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();
    let bare = Player::new(PlayerProfile::named("Phil"), now).unwrap();
    assert_roundtrip(&bare);
    assert!(roundtrip(&bare).email.is_none());

    let full = Player::new(
        PlayerProfile::named("Phil")
            .with_email("phil@example.com")
            .with_nickname("The Power"),
        now,
    )
    .unwrap();
    assert_roundtrip(&full);
}

#[test]
fn test_league_through_lifecycle() {
    let now = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();
    let mut league = League::new("Premier".to_string(), None, Some("2025".to_string()), now)
        .unwrap()
        .with_points(PointsSchedule::new(5, 3, 1).unwrap())
        .with_max_players(16);
    assert_roundtrip(&league);

    league.start(now + Duration::days(1)).unwrap();
    assert_roundtrip(&league);
    league.complete(now + Duration::days(90)).unwrap();

    let back = roundtrip(&league);
    assert_eq!(back, league);
    assert_eq!(back.description, None);
    assert!(back.end_date.is_some());
}

#[test]
fn test_tournament_and_entry() {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();
    let league = League::new("L".to_string(), None, None, now).unwrap();

    let mut settings = TournamentSettings::new(TournamentType::DoubleElimination).with_max_players(32);
    settings.entry_fee = Some(1500);
    settings.scheduled_date = Some(now + Duration::days(7));
    let mut t = Tournament::new(&league, "Masters", settings, 3, now).unwrap();
    assert_roundtrip(&t);

    t.start(now + Duration::days(7)).unwrap();
    t.complete(now + Duration::days(8)).unwrap();
    t.mark_results_applied(now + Duration::days(8)).unwrap();
    let back = roundtrip(&t);
    assert_eq!(back, t);
    assert_eq!(back.prize_pool, None);

    let entry = TournamentEntry {
        tournament_id: t.id,
        player_id: Uuid::new_v4(),
        seed: None,
        joined_at: now,
    };
    assert_roundtrip(&entry);
    assert_roundtrip(&TournamentEntry { seed: Some(4), ..entry });
}

#[test]
fn test_match_states() {
    let now = Utc.with_ymd_and_hms(2025, 3, 8, 19, 0, 0).unwrap();
    let mut m = Match::new(Uuid::new_v4(), 1, 2, now);
    let back = roundtrip(&m);
    assert_eq!(back, m);
    assert!(back.player1_id.is_none() && back.winner_id.is_none());

    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    m.set_players(a, b).unwrap();
    m.start(now + Duration::minutes(2)).unwrap();
    m.update_score(1, 3).unwrap();
    m.complete(b, now + Duration::minutes(45)).unwrap();
    assert_roundtrip(&m);
}

#[test]
fn test_standing() {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let standing = LeagueStanding::new(Uuid::new_v4(), Uuid::new_v4(), now);
    assert_roundtrip(&standing);
}

#[test]
fn test_enum_wire_names() {
    let json = serde_json::to_value(TournamentType::RoundRobin).unwrap();
    assert_eq!(json, "round_robin");
    let json = serde_json::to_value(league_core::matches::MatchStatus::InProgress).unwrap();
    assert_eq!(json, "in_progress");
}
