//! Report export: JSON and CSV artifacts.
//!
//! - **JSON**: any serializable report (sweep or replay), pretty-printed
//! - **CSV**: replay trade tape, and the best-history table of a sweep

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use surgelab_core::executor::Side;
use surgelab_core::Permutable;

use crate::analyzer::AnalyzeReport;
use crate::replay::ReplayReport;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_report_json<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade tape of a replay.
///
/// Columns: chart, side, time, unix, buy, sell, volume
pub fn export_trades_csv(report: &ReplayReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["chart", "side", "time", "unix", "buy", "sell", "volume"])?;

    for chart in &report.charts {
        for t in &chart.trades {
            let side = match t.side {
                Side::Buy => "buy",
                Side::Sell => "sell",
            };
            wtr.write_record([
                chart.result.chart.clone(),
                side.to_string(),
                t.price.time.to_rfc3339(),
                t.price.time.timestamp().to_string(),
                format!("{:.6}", t.price.buy),
                format!("{:.6}", t.price.sell),
                format!("{:.2}", t.volume),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Best-history of a sweep, one row per record, one column per swept parameter.
///
/// Columns: rank, step, config_hash, revenue, cycles, then each parameter id
pub fn export_history_csv(report: &AnalyzeReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec![
        "rank".to_string(),
        "step".to_string(),
        "config_hash".to_string(),
        "revenue".to_string(),
        "cycles".to_string(),
    ];
    header.extend(report.params.iter().map(|d| d.id.clone()));
    wtr.write_record(&header)?;

    for (rank, record) in report.history.iter().enumerate() {
        let mut row = vec![
            (rank + 1).to_string(),
            record.step.to_string(),
            record.config_hash.to_string(),
            format!("{:.2}", record.total_revenue()),
            record.total_cycles().to_string(),
        ];
        row.extend(report.params.iter().map(|d| {
            record
                .config
                .value_of(&d.id)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
