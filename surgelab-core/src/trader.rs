//! Trader: replays price streams through the buyer and seller.
//!
//! For every price the seller is asked about each open position first
//! (oldest first), then the buyer about opening a new one. Accepted
//! decisions go to the chart's executor. Each chart gets its own buyer,
//! seller, position list and executor, so charts may run in parallel.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, StrategyConfig};
use crate::decider::{Buyer, DeciderError, SellDecision, Seller};
use crate::domain::PriceEvent;
use crate::executor::{Executor, ExecutorError};
use crate::stream::PriceStream;

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("chart {chart}: executor error: {source}")]
    Executor {
        chart: String,
        #[source]
        source: ExecutorError,
    },
    #[error("chart {chart}: decider error: {source}")]
    Decider {
        chart: String,
        #[source]
        source: DeciderError,
    },
    #[error("cancelled before chart {0}")]
    Cancelled(String),
}

impl TradeError {
    /// Name of the chart the error happened on, if it is chart-specific.
    pub fn chart(&self) -> Option<&str> {
        match self {
            TradeError::Executor { chart, .. }
            | TradeError::Decider { chart, .. }
            | TradeError::Cancelled(chart) => Some(chart),
            TradeError::Config(_) => None,
        }
    }
}

/// An open position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub price: PriceEvent,
    /// Volume bought at entry.
    pub volume: f64,
}

/// Statistics of one chart replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub chart: String,
    /// Completed buy→sell cycles.
    pub cycles: u64,
    /// Sum of `sell * v - buy * v` over completed cycles, where `v` is the
    /// volume the budget buys at the sell price.
    pub revenue: f64,
    pub buys: u64,
    /// Positions still held when the chart ended.
    pub open_positions: usize,
}

impl TradeResult {
    fn new(chart: &str) -> Self {
        Self {
            chart: chart.to_string(),
            cycles: 0,
            revenue: 0.0,
            buys: 0,
            open_positions: 0,
        }
    }
}

/// Per-chart results of one run, in chart order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub charts: Vec<TradeResult>,
}

impl RunResult {
    pub fn total_revenue(&self) -> f64 {
        self.charts.iter().map(|c| c.revenue).sum()
    }

    pub fn total_cycles(&self) -> u64 {
        self.charts.iter().map(|c| c.cycles).sum()
    }

    pub fn cycles(&self) -> Vec<u64> {
        self.charts.iter().map(|c| c.cycles).collect()
    }

    pub fn revenues(&self) -> Vec<f64> {
        self.charts.iter().map(|c| c.revenue).collect()
    }
}

/// Units bought for `budget` at `price`, floored to two decimals.
pub fn volume(budget: f64, price: f64) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    (budget / price * 100.0).floor() / 100.0
}

#[derive(Debug, Clone)]
pub struct Trader {
    config: StrategyConfig,
    parallel_charts: bool,
}

impl Trader {
    pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            parallel_charts: false,
        })
    }

    /// Replay charts on the current rayon pool instead of one after another.
    pub fn with_parallel_charts(mut self, parallel: bool) -> Self {
        self.parallel_charts = parallel;
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Replay one chart. The executor is not closed here.
    pub fn run_chart<E: Executor>(
        &self,
        chart: &str,
        prices: impl Iterator<Item = PriceEvent>,
        executor: &mut E,
    ) -> Result<TradeResult, TradeError> {
        let mut buyer = Buyer::new(self.config.buyer.clone())?;
        let seller = Seller::new(self.config.seller.clone())?;
        let mut positions: Vec<Position> = Vec::new();
        let mut result = TradeResult::new(chart);

        let decider_err = |source| TradeError::Decider {
            chart: chart.to_string(),
            source,
        };
        let executor_err = |source| TradeError::Executor {
            chart: chart.to_string(),
            source,
        };

        for price in prices {
            if price.is_void() {
                return Err(decider_err(DeciderError::VoidPrice(price.time)));
            }

            let mut i = 0;
            while i < positions.len() {
                let pos = positions[i];
                let SellDecision::Sell { revenue, held } = seller.consider(&pos.price, &price)
                else {
                    i += 1;
                    continue;
                };
                // Sell volume is re-derived from the sell price and budget.
                let sold = volume(self.config.trader.budget, price.sell);
                executor.sell(&price, sold).map_err(executor_err)?;
                result.cycles += 1;
                result.revenue += price.sell * sold - pos.price.buy * sold;
                buyer.decrement_concurrency().map_err(decider_err)?;
                positions.remove(i);
                debug!(
                    chart,
                    buy = pos.price.buy,
                    sell = price.sell,
                    volume = sold,
                    revenue_pct = revenue,
                    held_secs = held.num_seconds(),
                    "sell"
                );
            }

            if buyer.consider(&price).map_err(decider_err)?.is_buy() {
                let volume = volume(self.config.trader.budget, price.buy);
                executor.buy(&price, volume).map_err(executor_err)?;
                positions.push(Position { price, volume });
                result.buys += 1;
                debug!(chart, price = price.buy, volume, "buy");
            }
        }

        result.open_positions = positions.len();
        Ok(result)
    }

    /// Replay every chart of `stream`, each with a fresh executor from `make_executor`.
    ///
    /// `cancel` is checked before each chart starts. Executors are closed after
    /// their chart, also when the chart failed.
    pub fn run<S, E, F>(
        &self,
        stream: &S,
        make_executor: F,
        cancel: Option<&AtomicBool>,
    ) -> Result<RunResult, TradeError>
    where
        S: PriceStream + ?Sized,
        E: Executor,
        F: Fn(usize) -> E + Sync,
    {
        let replay = |index: usize| -> Result<TradeResult, TradeError> {
            let name = stream
                .chart_name(index)
                .map(str::to_string)
                .unwrap_or_else(|| format!("chart-{index}"));
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                return Err(TradeError::Cancelled(name));
            }

            let mut executor = make_executor(index);
            let outcome = self.run_chart(&name, stream.prices(index), &mut executor);
            let closed = executor.close();
            let result = outcome?;
            closed.map_err(|source| TradeError::Executor {
                chart: name,
                source,
            })?;
            Ok(result)
        };

        let count = stream.chart_count();
        let charts = if self.parallel_charts {
            (0..count)
                .into_par_iter()
                .map(replay)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            (0..count).map(replay).collect::<Result<Vec<_>, _>>()?
        };
        Ok(RunResult { charts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuyerConfig, SellerConfig, TraderConfig};
    use crate::domain::Chart;
    use crate::executor::{NoopExecutor, RecordingExecutor, Side};
    use chrono::Duration;

    fn p(t: i64, price: f64) -> PriceEvent {
        PriceEvent::from_unix(t, price, price).unwrap()
    }

    fn config() -> StrategyConfig {
        StrategyConfig {
            buyer: BuyerConfig {
                chart_window: Duration::hours(1),
                surge_min: 0.0,
                surge_duration_min: Duration::zero(),
                surge_tolerance: 0.0,
                max_concurrent: 1,
                corridor_max: 100.0,
                pause_min: Duration::zero(),
            },
            seller: SellerConfig {
                chart_window: Duration::hours(1),
                duration_min: Duration::seconds(2),
                revenue_min: 5.0,
                fee_min: 0.0,
            },
            trader: TraderConfig { budget: 100.0 },
        }
    }

    #[test]
    fn volume_is_floored_to_cents() {
        assert_eq!(volume(500.0, 3.0), 166.66);
        assert_eq!(volume(100.0, 10.0), 10.0);
        assert_eq!(volume(100.0, 0.0), 0.0);
    }

    #[test]
    fn buy_then_sell_completes_a_cycle() {
        let trader = Trader::new(config()).unwrap();
        let prices = vec![p(0, 10.0), p(1, 11.0), p(2, 11.5), p(3, 12.0)];
        let mut exec = RecordingExecutor::new();
        let result = trader
            .run_chart("x", prices.into_iter(), &mut exec)
            .unwrap();

        // buy at t=1 (11.0, volume 9.09), sell at t=3 (held 2s, +9.1%),
        // then the freed slot is bought again on the same price
        let sides: Vec<Side> = exec.trades().iter().map(|t| t.side).collect();
        assert_eq!(sides, vec![Side::Buy, Side::Sell, Side::Buy]);
        assert_eq!(exec.trades()[0].volume, 9.09);
        assert_eq!(exec.trades()[1].price.time.timestamp(), 3);
        assert_eq!(result.cycles, 1);
        assert_eq!(result.buys, 2);
        assert_eq!(result.open_positions, 1);
        // the sell uses the volume 100 buys at 12.0
        assert_eq!(exec.trades()[1].volume, 8.33);
        assert!((result.revenue - (12.0 - 11.0) * 8.33).abs() < 1e-9);
    }

    #[test]
    fn sell_volume_follows_the_sell_price() {
        let mut config = config();
        config.trader.budget = 500.0;
        config.seller.revenue_min = 20.0;
        let trader = Trader::new(config).unwrap();
        let prices = vec![p(0, 100.0), p(1, 103.0), p(2, 110.0), p(3, 133.0)];
        let mut exec = RecordingExecutor::new();
        let result = trader
            .run_chart("x", prices.into_iter(), &mut exec)
            .unwrap();

        // bought 4.85 at 103, sold 3.75 at 133
        assert_eq!(exec.trades()[0].volume, 4.85);
        assert_eq!(exec.trades()[1].side, Side::Sell);
        assert_eq!(exec.trades()[1].volume, 3.75);
        assert_eq!(result.cycles, 1);
        assert!((result.revenue - 112.5).abs() < 1e-9);
    }

    #[test]
    fn window_beyond_date_range_replays() {
        let mut config = config();
        config.buyer.chart_window = Duration::seconds(1_000_000_000_000_000);
        config.seller.chart_window = Duration::seconds(1_000_000_000_000_000);
        assert!(config.validate().is_ok());
        let trader = Trader::new(config).unwrap();
        let result = trader
            .run_chart("x", vec![p(0, 10.0), p(1, 11.0)].into_iter(), &mut NoopExecutor)
            .unwrap();
        assert_eq!(result.buys, 1);
    }

    #[test]
    fn unsold_positions_are_reported() {
        let trader = Trader::new(config()).unwrap();
        let prices = vec![p(0, 10.0), p(1, 11.0)];
        let result = trader
            .run_chart("x", prices.into_iter(), &mut NoopExecutor)
            .unwrap();
        assert_eq!(result.cycles, 0);
        assert_eq!(result.open_positions, 1);
        assert_eq!(result.revenue, 0.0);
    }

    #[test]
    fn executor_error_aborts_chart() {
        struct Refuse;
        impl Executor for Refuse {
            fn buy(&mut self, _: &PriceEvent, _: f64) -> Result<(), ExecutorError> {
                Err(ExecutorError::Rejected("no funds".into()))
            }
            fn sell(&mut self, _: &PriceEvent, _: f64) -> Result<(), ExecutorError> {
                Ok(())
            }
        }

        let trader = Trader::new(config()).unwrap();
        let charts = vec![Chart::new("btc", vec![p(0, 10.0), p(1, 11.0)])];
        let err = trader.run(&charts, |_| Refuse, None).unwrap_err();
        assert!(matches!(err, TradeError::Executor { .. }));
        assert_eq!(err.chart(), Some("btc"));
    }

    #[test]
    fn out_of_order_prices_are_a_decider_error() {
        let trader = Trader::new(config()).unwrap();
        let prices = vec![p(5, 10.0), p(4, 11.0)];
        let err = trader
            .run_chart("x", prices.into_iter(), &mut NoopExecutor)
            .unwrap_err();
        assert!(matches!(
            err,
            TradeError::Decider {
                source: DeciderError::TimeRegression { .. },
                ..
            }
        ));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let charts: Vec<Chart> = (0..6)
            .map(|c| {
                let prices = (0..200)
                    .map(|t| p(t, 100.0 + ((t + c * 7) as f64 * 0.3).sin() * 10.0))
                    .collect();
                Chart::new(format!("c{c}"), prices)
            })
            .collect();

        let sequential = Trader::new(config())
            .unwrap()
            .run(&charts, |_| NoopExecutor, None)
            .unwrap();
        let parallel = Trader::new(config())
            .unwrap()
            .with_parallel_charts(true)
            .run(&charts, |_| NoopExecutor, None)
            .unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.charts.len(), 6);
        assert_eq!(parallel.charts[3].chart, "c3");
    }

    #[test]
    fn cancel_flag_stops_before_first_chart() {
        let charts = vec![Chart::new("a", vec![p(0, 1.0)])];
        let cancel = AtomicBool::new(true);
        let err = Trader::new(config())
            .unwrap()
            .run(&charts, |_| NoopExecutor, Some(&cancel))
            .unwrap_err();
        assert!(matches!(err, TradeError::Cancelled(_)));
    }
}
