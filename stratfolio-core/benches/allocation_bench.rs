//! Criterion benchmarks for the scoring and allocation hot paths.
//!
//! Benchmarks:
//! 1. Analyzer over a single ticker history
//! 2. Allocation engine across basket sizes, with and without shares

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;

use stratfolio_core::domain::{Cents, Fundamentals, PriceBar, Ticker};
use stratfolio_core::{
    analyze, AllocationEngine, AllocatorConfig, BiasBounds, ExclusionReason,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<PriceBar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            PriceBar {
                date: base_date + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000 + (i as u64 % 500_000),
            }
        })
        .collect()
}

fn make_scores(n: usize) -> BTreeMap<Ticker, Result<f64, ExclusionReason>> {
    (0..n)
        .map(|i| {
            let ticker = Ticker::parse(&format!("T{i}")).unwrap();
            (ticker, Ok((i as f64 * 0.37).sin()))
        })
        .collect()
}

// ── 1. Analyzer ──────────────────────────────────────────────────────

fn bench_analyze(c: &mut Criterion) {
    let ticker = Ticker::parse("SPY").unwrap();
    let fundamentals = Fundamentals::with_market_cap(5e11);
    let mut group = c.benchmark_group("analyze");
    for n in [5usize, 60, 252] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| {
                analyze(
                    black_box(&ticker),
                    black_box(bars),
                    Some(&fundamentals),
                    BiasBounds::default(),
                )
            })
        });
    }
    group.finish();
}

// ── 2. Allocation ────────────────────────────────────────────────────

fn bench_allocate(c: &mut Criterion) {
    let config = AllocatorConfig {
        floor_fraction: 0.01,
        ..AllocatorConfig::default()
    };
    let engine = AllocationEngine::new(&config);
    let mut group = c.benchmark_group("allocate");
    for n in [3usize, 6, 50] {
        let scores = make_scores(n);
        let prices: BTreeMap<Ticker, f64> =
            scores.keys().map(|k| (k.clone(), 123.45)).collect();
        group.bench_with_input(BenchmarkId::new("cents", n), &scores, |b, scores| {
            b.iter(|| engine.allocate(black_box(scores), Cents(1_000_000), None))
        });
        group.bench_with_input(BenchmarkId::new("shares", n), &scores, |b, scores| {
            b.iter(|| engine.allocate(black_box(scores), Cents(1_000_000), Some(&prices)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_analyze, bench_allocate);
criterion_main!(benches);
