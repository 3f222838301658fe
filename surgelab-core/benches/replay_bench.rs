//! Criterion benchmarks for SurgeLab hot paths.
//!
//! Benchmarks:
//! 1. Single chart replay through buyer and seller
//! 2. Window trim on a long history
//! 3. Grid materialization (value_for over the default catalog)

use chrono::Duration;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use surgelab_core::config::default_descriptors;
use surgelab_core::executor::NoopExecutor;
use surgelab_core::window::trim;
use surgelab_core::{PermutationEngine, PriceEvent, StrategyConfig, Trader};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_prices(n: usize) -> Vec<PriceEvent> {
    (0..n)
        .map(|i| {
            let price = 100.0 + (i as f64 * 0.05).sin() * 10.0 + i as f64 * 0.01;
            PriceEvent::from_unix(1_600_000_000 + i as i64 * 60, price, price * 0.999).unwrap()
        })
        .collect()
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    let trader = Trader::new(StrategyConfig::default()).unwrap();
    for n in [1_000usize, 10_000] {
        let prices = make_prices(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &prices, |b, prices| {
            b.iter(|| {
                trader
                    .run_chart("bench", black_box(prices.iter().copied()), &mut NoopExecutor)
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_window(c: &mut Criterion) {
    let prices = make_prices(10_000);
    c.bench_function("window_trim_10k", |b| {
        b.iter(|| {
            let mut history = Vec::new();
            for p in &prices {
                let _ = trim(&mut history, black_box(*p), Duration::hours(6));
            }
            history.len()
        })
    });
}

fn bench_grid(c: &mut Criterion) {
    let engine = PermutationEngine::new(StrategyConfig::default(), default_descriptors()).unwrap();
    c.bench_function("grid_value_for_all", |b| {
        b.iter(|| {
            engine
                .iter()
                .filter_map(|indices| engine.value_for(&indices).ok())
                .count()
        })
    });
}

criterion_group!(benches, bench_replay, bench_window, bench_grid);
criterion_main!(benches);
