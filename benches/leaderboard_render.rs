//! Benchmarks for leaderboard mutation and rendering
//!
//! Leaderboards are race-field sized, so these mostly guard against
//! accidental quadratic behaviour in insert/render/persist.
//!
//! Platform: Cross-platform (pure in-memory, CI-safe)

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use finishline::leaderboard::format_leaderboard;
use finishline::{CompetitorName, DecimalSeparator, ElapsedTime, Leaderboard, LeaderboardEntry};
use std::hint::black_box;

fn entry(i: usize) -> LeaderboardEntry {
    // Spread times so inserts land all over the board
    let secs = ((i * 7919) % 1000) as f64 / 10.0 + 30.0;
    LeaderboardEntry::new(
        CompetitorName::new(format!("Pilot {}", i)).expect("valid name"),
        ElapsedTime::from_secs(secs).expect("valid time"),
    )
}

fn filled(size: usize) -> Leaderboard {
    let mut board = Leaderboard::new();
    board.load_from((0..size).map(entry));
    board
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaderboard_insert");
    for size in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let board = filled(size);
            b.iter(|| {
                let mut board = board.clone();
                board.insert(black_box(entry(size + 1)));
                black_box(board.len())
            })
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaderboard_render");
    for size in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut board = filled(size);
            board.render();
            b.iter(|| black_box(board.render()))
        });
    }
    group.finish();
}

fn bench_persist(c: &mut Criterion) {
    let board = filled(100);
    c.bench_function("leaderboard_persist_100", |b| {
        b.iter(|| black_box(format_leaderboard(&board.persist(), DecimalSeparator::Comma)))
    });
}

criterion_group!(benches, bench_insert, bench_render, bench_persist);
criterion_main!(benches);
