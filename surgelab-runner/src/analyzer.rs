//! Analyzer: brute-force grid search over strategy configurations.
//!
//! Walks every index vector of the permutation grid in odometer order. Each
//! grid point gets a fresh trader (and so fresh buyers, sellers and
//! executors per chart), is replayed over all charts, and its total revenue
//! is offered to the best-history. Grid points run one after another; the
//! charts inside one may run in parallel.
//!
//! A failing grid point (bad materialized config, executor or decider error)
//! is logged and recorded, and the sweep moves on. Cancellation is checked
//! before every grid point and every chart; the optional deadline before every
//! grid point. Both end the sweep with the partial result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use surgelab_core::config::ConfigError;
use surgelab_core::executor::{Executor, NoopExecutor, QueuedExecutor};
use surgelab_core::{
    ConfigHash, ParamDescriptor, PermutationEngine, PermutationError, PriceStream, RunResult,
    StrategyConfig, TradeError, Trader,
};

use crate::history::{BestHistory, HistoryRecord};
use crate::progress::{ProgressHandle, StepDurations, SweepState, STEP_DURATION_CAP};
use crate::settings::{SettingsError, SweepSettings};

// ─── Errors & results ────────────────────────────────────────────────

/// Errors that stop a sweep before it starts.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("parameter grid error: {0}")]
    Permutation(#[from] PermutationError),
    #[error("no charts to analyze")]
    NoCharts,
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Why a single grid point produced no record.
#[derive(Debug, Error)]
enum PointError {
    #[error("{0}")]
    Permutation(#[from] PermutationError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Trade(#[from] TradeError),
    #[error("config hash failed: {0}")]
    Hash(#[from] serde_json::Error),
}

impl PointError {
    fn is_cancel(&self) -> bool {
        matches!(self, PointError::Trade(TradeError::Cancelled(_)))
    }
}

/// A replayed grid point.
struct GridPoint {
    config: StrategyConfig,
    config_hash: ConfigHash,
    result: RunResult,
}

/// A grid point that failed, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPointFailure {
    pub step: u64,
    pub indices: Vec<usize>,
    /// Chart the failure happened on, when it is chart-specific.
    pub chart: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepOutcome {
    Completed,
    Cancelled,
    DeadlineExceeded,
}

impl From<SweepOutcome> for SweepState {
    fn from(outcome: SweepOutcome) -> Self {
        match outcome {
            SweepOutcome::Completed => SweepState::Completed,
            SweepOutcome::Cancelled => SweepState::Cancelled,
            SweepOutcome::DeadlineExceeded => SweepState::DeadlineExceeded,
        }
    }
}

/// Final result of a sweep. Partial when the outcome is not `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeReport {
    pub outcome: SweepOutcome,
    pub steps_completed: u64,
    pub step_total: u64,
    pub params: Vec<ParamDescriptor>,
    pub best: Option<HistoryRecord>,
    /// Best records, best first.
    pub history: Vec<HistoryRecord>,
    pub failures: Vec<GridPointFailure>,
    pub elapsed_secs: f64,
}

// ─── Analyzer ────────────────────────────────────────────────────────

pub struct Analyzer {
    settings: SweepSettings,
    progress: ProgressHandle,
}

impl Analyzer {
    pub fn new(settings: SweepSettings) -> Result<Self, AnalyzeError> {
        settings.validate()?;
        Ok(Self {
            settings,
            progress: ProgressHandle::new(),
        })
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    /// Handle for observers; cheap to clone and safe to poll from any thread.
    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// Build the permutation engine this analyzer sweeps.
    pub fn engine(&self) -> Result<PermutationEngine<StrategyConfig>, AnalyzeError> {
        Ok(PermutationEngine::new(
            self.settings.strategy.clone(),
            self.settings.descriptors(),
        )?)
    }

    /// Run the full sweep over `stream`.
    pub fn run<S: PriceStream + ?Sized>(
        &self,
        stream: &S,
        cancel: Option<&AtomicBool>,
    ) -> Result<AnalyzeReport, AnalyzeError> {
        if stream.chart_count() == 0 {
            return Err(AnalyzeError::NoCharts);
        }
        let engine = self.engine()?;
        let total = engine.total();
        let opts = &self.settings.sweep;

        let thread_pool = if opts.threads > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(opts.threads)
                    .build()
                    .map_err(|e| AnalyzeError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };

        let start_time = Instant::now();
        let deadline = self.settings.deadline().map(|d| start_time + d);
        self.progress.update(|s| {
            *s = Default::default();
            s.state = SweepState::Running;
            s.step_total = total;
            s.max_indices = engine.max_indices().to_vec();
            s.indices = vec![0; engine.max_indices().len()];
            s.started_at = Some(Utc::now());
        });
        info!(
            grid_points = total,
            params = engine.descriptors().len(),
            charts = stream.chart_count(),
            "sweep started"
        );

        let mut history = BestHistory::new(opts.history_capacity);
        let mut failures: Vec<GridPointFailure> = Vec::new();
        let mut durations = StepDurations::new(STEP_DURATION_CAP);
        let mut outcome = SweepOutcome::Completed;
        let mut steps_completed: u64 = 0;

        for indices in engine.iter() {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                outcome = SweepOutcome::Cancelled;
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                outcome = SweepOutcome::DeadlineExceeded;
                break;
            }

            let step = steps_completed + 1;
            let step_start = Instant::now();
            let run = match &thread_pool {
                Some(tp) => tp.install(|| self.run_point(&engine, &indices, stream, cancel)),
                None => self.run_point(&engine, &indices, stream, cancel),
            };

            let mut improved = false;
            match run {
                Ok(point) => {
                    let record = HistoryRecord {
                        step,
                        indices: indices.clone(),
                        config: point.config,
                        config_hash: point.config_hash,
                        cycles: point.result.cycles(),
                        revenues: point.result.revenues(),
                    };
                    let revenue = record.total_revenue();
                    debug!(step, revenue, cycles = record.total_cycles(), "grid point done");
                    if history.offer(record) {
                        improved = true;
                        info!(
                            step,
                            revenue,
                            indices = ?indices,
                            "new best configuration"
                        );
                    }
                }
                Err(e) if e.is_cancel() => {
                    outcome = SweepOutcome::Cancelled;
                    break;
                }
                Err(e) => {
                    warn!(step, indices = ?indices, error = %e, "grid point failed");
                    let chart = match &e {
                        PointError::Trade(t) => t.chart().map(str::to_string),
                        _ => None,
                    };
                    failures.push(GridPointFailure {
                        step,
                        indices: indices.clone(),
                        chart,
                        error: e.to_string(),
                    });
                }
            }

            steps_completed = step;
            durations.push(step_start.elapsed());
            let now = Utc::now();
            self.progress.update(|s| {
                s.step_current = step;
                s.indices = indices;
                s.avg_step_ms = durations.average().as_secs_f64() * 1000.0;
                s.eta = durations.eta(now, total.saturating_sub(step));
                s.failed_steps = failures.len() as u64;
                if improved {
                    s.best_revenue = history.best().map(HistoryRecord::total_revenue);
                    s.history = history.to_vec();
                }
            });
        }

        self.progress.update(|s| {
            s.state = outcome.into();
            s.eta = None;
        });
        let elapsed_secs = start_time.elapsed().as_secs_f64();
        info!(
            outcome = ?outcome,
            steps = steps_completed,
            failed = failures.len(),
            best_revenue = history.best().map(HistoryRecord::total_revenue),
            elapsed_secs,
            "sweep finished"
        );

        Ok(AnalyzeReport {
            outcome,
            steps_completed,
            step_total: total,
            params: engine.descriptors().to_vec(),
            best: history.best().cloned(),
            history: history.to_vec(),
            failures,
            elapsed_secs,
        })
    }

    fn run_point<S: PriceStream + ?Sized>(
        &self,
        engine: &PermutationEngine<StrategyConfig>,
        indices: &[usize],
        stream: &S,
        cancel: Option<&AtomicBool>,
    ) -> Result<GridPoint, PointError> {
        let config = engine.value_for(indices)?;
        let config_hash = config.config_hash()?;
        let trader =
            Trader::new(config.clone())?.with_parallel_charts(self.settings.sweep.parallel_charts);
        let queue = self.settings.sweep.executor_queue_capacity;
        let make_executor = |_chart: usize| -> Box<dyn Executor> {
            match queue {
                Some(capacity) => Box::new(QueuedExecutor::new(NoopExecutor, capacity)),
                None => Box::new(NoopExecutor),
            }
        };
        let result = trader.run(stream, make_executor, cancel)?;
        Ok(GridPoint {
            config,
            config_hash,
            result,
        })
    }
}
