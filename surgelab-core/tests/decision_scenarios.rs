//! End-to-end decision scenarios: synthetic price paths through the trader.

use chrono::Duration;
use surgelab_core::config::{BuyerConfig, SellerConfig, StrategyConfig, TraderConfig};
use surgelab_core::executor::{RecordingExecutor, Side};
use surgelab_core::{Chart, PriceEvent, Trader};

const BASE: i64 = 1_700_000_000;

fn minute(k: i64, price: f64) -> PriceEvent {
    PriceEvent::from_unix(BASE + k * 60, price, price).unwrap()
}

/// Rises 3 per minute for 15 minutes, then falls 3 per minute for 15.
fn rise_then_fall() -> Vec<PriceEvent> {
    let mut prices: Vec<PriceEvent> = (0..15).map(|k| minute(k, 100.0 + 3.0 * k as f64)).collect();
    let peak = 100.0 + 3.0 * 14.0;
    prices.extend((15..=30).map(|k| minute(k, peak - 3.0 * (k - 14) as f64)));
    prices
}

fn scenario_config() -> StrategyConfig {
    StrategyConfig {
        buyer: BuyerConfig {
            chart_window: Duration::hours(1),
            surge_min: 2.5,
            surge_duration_min: Duration::zero(),
            surge_tolerance: 0.0,
            max_concurrent: 1,
            corridor_max: 100.0,
            pause_min: Duration::hours(1),
        },
        seller: SellerConfig {
            chart_window: Duration::hours(1),
            duration_min: Duration::minutes(10),
            revenue_min: 2.0,
            fee_min: 0.0,
        },
        trader: TraderConfig { budget: 500.0 },
    }
}

#[test]
fn scenario_rise_then_fall_completes_one_cycle() {
    // GIVEN a series rising at ~2.86° per minute, then falling
    let prices = rise_then_fall();

    // AND a buyer needing 2.5° and a seller needing 10 minutes and 2%
    let trader = Trader::new(scenario_config()).unwrap();

    // WHEN the chart is replayed
    let mut exec = RecordingExecutor::new();
    let result = trader
        .run_chart("rise-fall", prices.into_iter(), &mut exec)
        .unwrap();

    // THEN the first rising pair is bought
    let trades = exec.trades();
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].side, Side::Buy);
    assert_eq!(trades[0].price.time.timestamp(), BASE + 60);
    assert_eq!(trades[0].price.buy, 103.0);
    assert_eq!(trades[0].volume, 4.85);

    // AND it is sold as soon as both thresholds hold: ten minutes later
    assert_eq!(trades[1].side, Side::Sell);
    assert_eq!(trades[1].price.time.timestamp(), BASE + 11 * 60);
    assert_eq!(trades[1].price.sell, 133.0);

    // AND the sell volume is what the budget buys at 133
    assert_eq!(trades[1].volume, 3.75);

    // AND exactly one cycle is recorded
    assert_eq!(result.cycles, 1);
    assert_eq!(result.buys, 1);
    assert_eq!(result.open_positions, 0);
    assert!((result.revenue - 30.0 * 3.75).abs() < 1e-9);
}

#[test]
fn scenario_falling_market_never_buys() {
    // GIVEN a steadily falling series
    let prices: Vec<PriceEvent> = (0..60).map(|k| minute(k, 500.0 - 2.0 * k as f64)).collect();

    // WHEN it is replayed with permissive thresholds
    let mut config = scenario_config();
    config.buyer.surge_min = 0.0;
    let trader = Trader::new(config).unwrap();
    let result = trader
        .run_chart("fall", prices.into_iter(), &mut RecordingExecutor::new())
        .unwrap();

    // THEN no position is ever opened
    assert_eq!(result.buys, 0);
    assert_eq!(result.cycles, 0);
}

#[test]
fn scenario_concurrency_cap_limits_open_positions() {
    // GIVEN a steep steady rise and a buyer allowed three positions with no pause
    let prices: Vec<PriceEvent> = (0..20).map(|k| minute(k, 100.0 + 5.0 * k as f64)).collect();
    let mut config = scenario_config();
    config.buyer.max_concurrent = 3;
    config.buyer.pause_min = Duration::zero();
    // AND a seller that never closes
    config.seller.duration_min = Duration::days(30);
    let trader = Trader::new(config).unwrap();

    // WHEN the chart is replayed
    let result = trader
        .run_chart("steep", prices.into_iter(), &mut RecordingExecutor::new())
        .unwrap();

    // THEN only three positions were opened
    assert_eq!(result.buys, 3);
    assert_eq!(result.open_positions, 3);
    assert_eq!(result.cycles, 0);
}

#[test]
fn scenario_multiple_charts_keep_independent_state() {
    // GIVEN the same rising-then-falling chart twice and a flat chart
    let charts = vec![
        Chart::new("a", rise_then_fall()),
        Chart::new("flat", (0..30).map(|k| minute(k, 100.0)).collect()),
        Chart::new("b", rise_then_fall()),
    ];

    // WHEN all charts are replayed in parallel
    let trader = Trader::new(scenario_config())
        .unwrap()
        .with_parallel_charts(true);
    let run = trader.run(&charts, |_| RecordingExecutor::new(), None).unwrap();

    // THEN both trending charts complete a cycle and the flat one does nothing
    assert_eq!(run.cycles(), vec![1, 0, 1]);
    assert_eq!(run.total_cycles(), 2);
    assert!((run.total_revenue() - 2.0 * 30.0 * 3.75).abs() < 1e-9);
}
