//! Performance benchmarks for stats aggregation and the local store.
//!
//! Run with: cargo bench
//!
//! These benchmarks establish baseline performance metrics for:
//! - Folding one entry into snapshots with growing tag and mood history
//! - Listing and filtering a local entries directory of various sizes

use chrono::{DateTime, Duration, FixedOffset};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rflect::catalog::default_prompts;
use rflect::journal_core::stats::{self, StatsSnapshot};
use rflect::journal_core::{Entry, EntryFilter, Goals};
use rflect::store::{Backend, EntryStore, LocalStore};
use tempfile::TempDir;

fn start() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-01-01T08:00:00+00:00").expect("valid timestamp")
}

fn entry_on(day: i64, tags: Vec<String>) -> Entry {
    let prompts = default_prompts();
    let prompt = prompts[day as usize % prompts.len()].as_prompt();
    Entry::assemble(
        prompt,
        "a short reflection about the day that just passed".to_string(),
        tags,
        Some("😌 calm".to_string()),
        start() + Duration::days(day),
        3,
        None,
    )
}

/// A snapshot built from `days` consecutive entries.
fn history(days: i64) -> StatsSnapshot {
    let goals = Goals::disabled(start());
    let mut snapshot = StatsSnapshot::default();
    for day in 0..days {
        let tags = vec![format!("tag-{}", day % 20), "daily".to_string()];
        snapshot = stats::update(&snapshot, &goals, &entry_on(day, tags)).stats;
    }
    snapshot
}

/// Benchmark a single stats update against snapshots of various sizes.
fn bench_stats_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats_update");
    let goals = Goals::disabled(start());

    for days in [10, 365, 1_000] {
        let prior = history(days);
        let next = entry_on(days, vec!["daily".to_string()]);

        group.bench_with_input(BenchmarkId::from_parameter(days), &prior, |b, prior| {
            b.iter(|| {
                let result = stats::update(black_box(prior), &goals, black_box(&next));
                black_box(result);
            });
        });
    }

    group.finish();
}

/// Benchmark a tag filter over a local entries directory.
fn bench_local_find_by(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_find_by");

    for count in [10_i64, 100, 500] {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let store = EntryStore::new(
            LocalStore::new(temp_dir.path().join("entries")),
            None,
            "bench-user",
        );
        for day in 0..count {
            let tags = vec![format!("tag-{}", day % 5)];
            store
                .save(&entry_on(day, tags), Backend::Local)
                .expect("save failed");
        }
        let filter = EntryFilter::Tag("tag-1".to_string());

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &store, |b, store| {
            b.iter(|| {
                let scan = store
                    .find_by(Backend::Local, black_box(&filter))
                    .expect("scan failed");
                black_box(scan);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stats_update, bench_local_find_by);
criterion_main!(benches);
