use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use league_core::standings::{LeagueStanding, rank_standings};
use league_core::tournament::TournamentEntry;
use league_core::tournament::bracket::{elimination_round_one, round_robin_schedule, seeding_order};
use uuid::Uuid;

/// Helper to create N entrants, every third one seeded
fn entrants(n: usize) -> Vec<TournamentEntry> {
    let tournament_id = Uuid::new_v4();
    let joined_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| TournamentEntry {
            tournament_id,
            player_id: Uuid::new_v4(),
            seed: (i % 3 == 0).then_some((n - i) as u32),
            joined_at,
        })
        .collect()
}

fn bench_elimination_bracket(c: &mut Criterion) {
    let mut group = c.benchmark_group("elimination_bracket");
    for n in [8, 24, 64, 128] {
        let field = entrants(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &field, |b, field| {
            b.iter(|| elimination_round_one(&seeding_order(field)));
        });
    }
    group.finish();
}

fn bench_round_robin_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_robin_schedule");
    for n in [6, 16, 33] {
        let order = seeding_order(&entrants(n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &order, |b, order| {
            b.iter(|| round_robin_schedule(order));
        });
    }
    group.finish();
}

/// Ranking a league table with many ties
fn bench_rank_standings(c: &mut Criterion) {
    let league_id = Uuid::new_v4();
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let table: Vec<LeagueStanding> = (0..500)
        .map(|i| {
            let mut row = LeagueStanding::new(league_id, Uuid::new_v4(), now);
            row.total_points = (i % 17) as i32;
            row
        })
        .collect();

    c.bench_function("rank_standings_500", |b| {
        b.iter(|| rank_standings(&table));
    });
}

criterion_group!(
    brackets,
    bench_elimination_bracket,
    bench_round_robin_schedule,
);

criterion_group!(standings, bench_rank_standings);

criterion_main!(brackets, standings);
