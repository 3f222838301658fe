//! Single-configuration replay with a full trade log.

use serde::{Deserialize, Serialize};
use tracing::info;

use surgelab_core::executor::{Executor, RecordingExecutor, TradeEvent};
use surgelab_core::{ConfigHash, PriceStream, StrategyConfig, TradeError, TradeResult, Trader};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartReplay {
    pub result: TradeResult,
    pub trades: Vec<TradeEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub config: StrategyConfig,
    pub config_hash: Option<ConfigHash>,
    pub charts: Vec<ChartReplay>,
}

impl ReplayReport {
    pub fn total_revenue(&self) -> f64 {
        self.charts.iter().map(|c| c.result.revenue).sum()
    }

    pub fn total_cycles(&self) -> u64 {
        self.charts.iter().map(|c| c.result.cycles).sum()
    }
}

/// Replay `config` over every chart of `stream`, recording each executed order.
pub fn replay<S: PriceStream + ?Sized>(
    config: &StrategyConfig,
    stream: &S,
) -> Result<ReplayReport, TradeError> {
    let trader = Trader::new(config.clone())?;
    let mut charts = Vec::with_capacity(stream.chart_count());

    for index in 0..stream.chart_count() {
        let name = stream
            .chart_name(index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("chart-{index}"));
        let mut executor = RecordingExecutor::new();
        let result = trader.run_chart(&name, stream.prices(index), &mut executor)?;
        executor
            .close()
            .map_err(|source| TradeError::Executor {
                chart: name.clone(),
                source,
            })?;
        info!(
            chart = %name,
            cycles = result.cycles,
            revenue = result.revenue,
            open = result.open_positions,
            "chart replayed"
        );
        charts.push(ChartReplay {
            result,
            trades: executor.into_trades(),
        });
    }

    Ok(ReplayReport {
        config: config.clone(),
        config_hash: config.config_hash().ok(),
        charts,
    })
}
