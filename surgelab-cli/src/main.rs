//! SurgeLab CLI: sweep, replay and parameter-grid commands.
//!
//! Commands:
//! - `analyze`: grid-search the permutable strategy parameters over a set of charts
//! - `replay`: run one configuration and print (or export) its trades
//! - `params`: list the parameter grid a settings file would sweep

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration as StdDuration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use surgelab_core::permutation::ParamRange;
use surgelab_core::{Chart, Permutable, PermutationEngine};
use surgelab_runner::export::{
    export_history_csv, export_report_json, export_trades_csv, write_artifact,
};
use surgelab_runner::logging::init_logger;
use surgelab_runner::{
    load_chart_csv, load_chart_dir, replay, synthetic_chart, AnalyzeReport, Analyzer, CsvLayout,
    ProgressHandle, ReplayReport, SweepOutcome, SweepSettings, SweepState,
};

/// Synthetic charts start here so repeated runs see identical prices.
const SYNTHETIC_START_UNIX: i64 = 1_600_000_000;

#[derive(Parser)]
#[command(name = "surgelab", about = "SurgeLab CLI: surge-following strategy backtester")]
struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Where chart prices come from. Exactly one is required.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct Source {
    /// A single chart CSV (time, buy, sell with a header row).
    #[arg(long)]
    csv: Option<PathBuf>,

    /// A directory of charts, one sub-directory each with chart.csv and layout.toml.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Generate synthetic charts with this many one-minute prices each.
    #[arg(long)]
    synthetic: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep the parameter grid and report the best configurations.
    Analyze {
        /// Sweep settings TOML. Defaults to the built-in strategy and grid.
        #[arg(long)]
        settings: Option<PathBuf>,

        #[command(flatten)]
        source: Source,

        /// Number of synthetic charts (with --synthetic).
        #[arg(long, default_value_t = 3)]
        synthetic_charts: usize,

        /// Stop starting new grid points after this many seconds.
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Seconds between progress log lines.
        #[arg(long, default_value_t = 5)]
        progress_secs: u64,

        /// Write the full sweep report as JSON.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the best-history table as CSV.
        #[arg(long)]
        history_csv: Option<PathBuf>,
    },
    /// Replay the settings' strategy once and print its trades.
    Replay {
        /// Settings TOML; only the [strategy] table is used.
        #[arg(long)]
        settings: Option<PathBuf>,

        #[command(flatten)]
        source: Source,

        /// Number of synthetic charts (with --synthetic).
        #[arg(long, default_value_t = 3)]
        synthetic_charts: usize,

        /// Write the trade tape as CSV.
        #[arg(long)]
        trades_csv: Option<PathBuf>,

        /// Write the replay report as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the permutable parameters and the size of the grid.
    Params {
        /// Sweep settings TOML. Defaults to the built-in grid.
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger("surgelab", &cli.log_level);

    match cli.command {
        Commands::Analyze {
            settings,
            source,
            synthetic_charts,
            deadline_secs,
            progress_secs,
            output,
            history_csv,
        } => run_analyze(
            settings.as_deref(),
            &source,
            synthetic_charts,
            deadline_secs,
            progress_secs,
            output.as_deref(),
            history_csv.as_deref(),
        ),
        Commands::Replay {
            settings,
            source,
            synthetic_charts,
            trades_csv,
            output,
        } => run_replay(
            settings.as_deref(),
            &source,
            synthetic_charts,
            trades_csv.as_deref(),
            output.as_deref(),
        ),
        Commands::Params { settings } => run_params(settings.as_deref()),
    }
}

fn load_settings(path: Option<&Path>) -> Result<SweepSettings> {
    match path {
        Some(path) => SweepSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(SweepSettings::default()),
    }
}

fn load_charts(source: &Source, synthetic_charts: usize) -> Result<Vec<Chart>> {
    if let Some(path) = &source.csv {
        return Ok(vec![load_chart_csv(path, &CsvLayout::default())?]);
    }
    if let Some(dir) = &source.dir {
        return Ok(load_chart_dir(dir)?);
    }
    if let Some(points) = source.synthetic {
        if synthetic_charts == 0 {
            bail!("--synthetic-charts must be at least 1");
        }
        let start = DateTime::from_timestamp(SYNTHETIC_START_UNIX, 0)
            .context("invalid synthetic start time")?;
        return Ok((0..synthetic_charts)
            .map(|i| synthetic_chart(&format!("synthetic-{i}"), points, start, Duration::minutes(1)))
            .collect());
    }
    bail!("one of --csv, --dir or --synthetic is required")
}

#[allow(clippy::too_many_arguments)]
fn run_analyze(
    settings_path: Option<&Path>,
    source: &Source,
    synthetic_charts: usize,
    deadline_secs: Option<u64>,
    progress_secs: u64,
    output: Option<&Path>,
    history_csv: Option<&Path>,
) -> Result<()> {
    let mut settings = load_settings(settings_path)?;
    if deadline_secs.is_some() {
        settings.sweep.deadline_secs = deadline_secs;
    }
    let charts = load_charts(source, synthetic_charts)?;
    let analyzer = Analyzer::new(settings)?;

    let done = AtomicBool::new(false);
    let progress = analyzer.progress();
    let interval = StdDuration::from_secs(progress_secs.max(1));

    let report = thread::scope(|scope| {
        scope.spawn(|| report_progress(&progress, &done, interval));
        let report = analyzer.run(&charts, None);
        done.store(true, Ordering::Relaxed);
        report
    })?;

    print_analyze_summary(&report);

    if let Some(path) = output {
        write_artifact(path, &export_report_json(&report)?)?;
        println!("Report saved to: {}", path.display());
    }
    if let Some(path) = history_csv {
        write_artifact(path, &export_history_csv(&report)?)?;
        println!("History saved to: {}", path.display());
    }
    Ok(())
}

/// Log a progress line every `interval` until `done` is set.
fn report_progress(progress: &ProgressHandle, done: &AtomicBool, interval: StdDuration) {
    let tick = StdDuration::from_millis(100);
    let mut waited = StdDuration::ZERO;
    while !done.load(Ordering::Relaxed) {
        thread::sleep(tick);
        waited += tick;
        if waited < interval {
            continue;
        }
        waited = StdDuration::ZERO;

        let snap = progress.snapshot();
        if snap.state != SweepState::Running {
            continue;
        }
        info!(
            step = snap.step_current,
            total = snap.step_total,
            percent = format!("{:.1}", snap.percent()),
            avg_step_ms = format!("{:.1}", snap.avg_step_ms),
            eta = snap.eta.map(|t| t.to_rfc3339()),
            best_revenue = snap.best_revenue,
            failed = snap.failed_steps,
            "sweep progress"
        );
    }
}

fn print_analyze_summary(report: &AnalyzeReport) {
    println!();
    println!("=== Sweep Result ===");
    println!("Outcome:        {:?}", report.outcome);
    println!(
        "Grid points:    {} of {} ({} failed)",
        report.steps_completed,
        report.step_total,
        report.failures.len()
    );
    println!("Elapsed:        {:.1}s", report.elapsed_secs);
    if report.outcome != SweepOutcome::Completed {
        println!("WARNING: partial result, the sweep did not finish");
    }

    let Some(best) = &report.best else {
        println!();
        println!("No grid point produced a positive revenue.");
        return;
    };

    println!();
    println!("--- Best Configuration ---");
    println!("Step:           {}", best.step);
    println!("Config hash:    {}", best.config_hash.short());
    println!("Revenue:        {:.2}", best.total_revenue());
    println!("Cycles:         {}", best.total_cycles());
    for d in &report.params {
        let value = best
            .config
            .value_of(&d.id)
            .map(|v| v.to_string())
            .unwrap_or_default();
        println!("  {:<28} {}", d.id, value);
    }

    if report.history.len() > 1 {
        println!();
        println!("--- History (best first) ---");
        println!("{:>4} {:>8} {:>14} {:>8}", "Rank", "Step", "Revenue", "Cycles");
        println!("{}", "-".repeat(37));
        for (rank, record) in report.history.iter().enumerate() {
            println!(
                "{:>4} {:>8} {:>14.2} {:>8}",
                rank + 1,
                record.step,
                record.total_revenue(),
                record.total_cycles()
            );
        }
    }
    println!();
}

fn run_replay(
    settings_path: Option<&Path>,
    source: &Source,
    synthetic_charts: usize,
    trades_csv: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let settings = load_settings(settings_path)?;
    let charts = load_charts(source, synthetic_charts)?;
    let report = replay(&settings.strategy, &charts)?;

    print_replay_summary(&report);

    if let Some(path) = trades_csv {
        write_artifact(path, &export_trades_csv(&report)?)?;
        println!("Trades saved to: {}", path.display());
    }
    if let Some(path) = output {
        write_artifact(path, &export_report_json(&report)?)?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn print_replay_summary(report: &ReplayReport) {
    println!();
    println!("=== Replay Result ===");
    if let Some(hash) = &report.config_hash {
        println!("Config hash:    {}", hash.short());
    }
    println!();
    println!(
        "{:<20} {:>8} {:>8} {:>6} {:>14}",
        "Chart", "Buys", "Cycles", "Open", "Revenue"
    );
    println!("{}", "-".repeat(60));
    for chart in &report.charts {
        let r = &chart.result;
        println!(
            "{:<20} {:>8} {:>8} {:>6} {:>14.2}",
            r.chart, r.buys, r.cycles, r.open_positions, r.revenue
        );
    }
    println!("{}", "-".repeat(60));
    println!(
        "{:<20} {:>8} {:>8} {:>6} {:>14.2}",
        "Total",
        "",
        report.total_cycles(),
        "",
        report.total_revenue()
    );
    println!();
}

fn run_params(settings_path: Option<&Path>) -> Result<()> {
    let settings = load_settings(settings_path)?;
    let engine = PermutationEngine::new(settings.strategy.clone(), settings.descriptors())?;

    println!(
        "{:<28} {:<9} {:>10} {:>10} {:>10} {:>7}",
        "Parameter", "Kind", "Min", "Max", "Step", "Points"
    );
    println!("{}", "-".repeat(79));
    for (d, max_index) in engine.descriptors().iter().zip(engine.max_indices()) {
        let (min, max, step) = match d.range {
            ParamRange::Float { min, max, step } => {
                (min.to_string(), max.to_string(), step.to_string())
            }
            ParamRange::Duration { min, max, step } => (
                format!("{}s", min.num_seconds()),
                format!("{}s", max.num_seconds()),
                format!("{}s", step.num_seconds()),
            ),
        };
        let marker = if d.overshoots() { " (overshoots max)" } else { "" };
        println!(
            "{:<28} {:<9} {:>10} {:>10} {:>10} {:>7}{marker}",
            d.id,
            d.kind().to_string(),
            min,
            max,
            step,
            max_index + 1
        );
    }
    println!();
    println!("Grid points:    {}", engine.total());
    Ok(())
}
