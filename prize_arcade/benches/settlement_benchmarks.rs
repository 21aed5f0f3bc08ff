//! Benchmarks for winner selection over growing entry sets.

use chrono::{TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use prize_arcade::settlement::{ScoredEntry, select_winner};
use std::hint::black_box;

fn entries(count: usize) -> Vec<ScoredEntry> {
    (0..count)
        .map(|i| ScoredEntry {
            entry_id: i as i64 + 1,
            user_id: (i as i64 + 1) * 100,
            score: ((i * 7919) % 10_000) as i64,
            qualified: i % 3 != 0,
            submitted_at: Utc
                .timestamp_opt(1_700_000_000 + (i as i64 * 13) % 3600, 0)
                .unwrap(),
        })
        .collect()
}

fn bench_select_winner(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_winner");
    for size in [10, 100, 1_000, 10_000] {
        let data = entries(size);
        group.bench_function(format!("{size}_entries"), |b| {
            b.iter(|| select_winner(black_box(&data)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_select_winner);
criterion_main!(benches);
