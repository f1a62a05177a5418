//! Criterion benchmarks for SwingLab hot paths.
//!
//! Benchmarks:
//! 1. Swing runner over long series
//! 2. Covered option runner over long series
//! 3. Signal generator alone
//! 4. Series validation and month-end precompute

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

use swinglab_core::{generate_signals, run_covered_option, run_swing, Bar, PriceSeries, StrategyParams};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
    (0..n)
        .map(|i| {
            let cents = 10_000 + ((i as f64 * 0.05).sin() * 2_500.0) as i64;
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                Decimal::new(cents, 2),
            )
        })
        .collect()
}

fn make_series(n: usize) -> PriceSeries {
    PriceSeries::new(make_bars(n)).unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_runners(c: &mut Criterion) {
    let params = StrategyParams::default();
    let mut group = c.benchmark_group("runners");
    for n in [252usize, 2_520, 10_000] {
        let series = make_series(n);
        group.bench_with_input(BenchmarkId::new("swing", n), &series, |b, s| {
            b.iter(|| run_swing(black_box(s), black_box(&params)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("covered_option", n), &series, |b, s| {
            b.iter(|| run_covered_option(black_box(s), black_box(&params)).unwrap())
        });
    }
    group.finish();
}

fn bench_signals(c: &mut Criterion) {
    let series = make_series(10_000);
    let threshold = Decimal::new(5, 2);
    c.bench_function("generate_signals_10k", |b| {
        b.iter(|| generate_signals(black_box(&series), black_box(threshold)))
    });
}

fn bench_series_validation(c: &mut Criterion) {
    let bars = make_bars(10_000);
    c.bench_function("price_series_new_10k", |b| {
        b.iter(|| PriceSeries::new(black_box(bars.clone())).unwrap())
    });
}

criterion_group!(benches, bench_runners, bench_signals, bench_series_validation);
criterion_main!(benches);
