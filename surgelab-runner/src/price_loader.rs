//! Price loading: CSV charts from disk, or synthetic random walks.
//!
//! Two on-disk layouts are supported:
//! 1. A single CSV file with a [`CsvLayout`] naming its columns
//! 2. A directory of charts: one sub-directory per chart holding
//!    `chart.csv` and a `layout.toml` describing that file's columns
//!
//! The time column holds unix seconds. Rows must be in time order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use surgelab_core::{Chart, PriceEvent};

pub const CHART_FILE: &str = "chart.csv";
pub const LAYOUT_FILE: &str = "layout.toml";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}:{line}: missing {column} column")]
    MissingColumn {
        path: PathBuf,
        line: u64,
        column: &'static str,
    },
    #[error("{path}:{line}: invalid {column} value '{value}'")]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("{path}:{line}: time goes backwards")]
    Unordered { path: PathBuf, line: u64 },
    #[error("invalid layout: {0}")]
    Layout(String),
    #[error("invalid layout file {path}: {source}")]
    LayoutFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("chart directory {0} is missing {1}")]
    MissingFile(PathBuf, &'static str),
    #[error("no charts found in {0}")]
    NoCharts(PathBuf),
}

/// Zero-based column positions of a chart CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvLayout {
    pub time: usize,
    pub buy: usize,
    pub sell: usize,
    /// Skip the first row.
    pub has_header: bool,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            time: 0,
            buy: 1,
            sell: 2,
            has_header: true,
        }
    }
}

impl CsvLayout {
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.time == self.buy || self.time == self.sell || self.buy == self.sell {
            return Err(LoadError::Layout(format!(
                "time ({}), buy ({}) and sell ({}) columns must differ",
                self.time, self.buy, self.sell
            )));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let layout: Self = toml::from_str(&text).map_err(|source| LoadError::LayoutFile {
            path: path.to_path_buf(),
            source,
        })?;
        layout.validate()?;
        Ok(layout)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    column: &'static str,
    path: &Path,
    line: u64,
) -> Result<&'r str, LoadError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            line,
            column,
        })
}

/// Load one chart. The chart is named after the file stem.
pub fn load_chart_csv(path: &Path, layout: &CsvLayout) -> Result<Chart, LoadError> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chart".to_string());
    load_named_chart_csv(path, &name, layout)
}

fn load_named_chart_csv(path: &Path, name: &str, layout: &CsvLayout) -> Result<Chart, LoadError> {
    layout.validate()?;
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(layout.has_header)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut prices: Vec<PriceEvent> = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());
        let invalid = |column: &'static str, value: &str| LoadError::InvalidValue {
            path: path.to_path_buf(),
            line,
            column,
            value: value.to_string(),
        };

        let raw_time = field(&record, layout.time, "time", path, line)?;
        let raw_buy = field(&record, layout.buy, "buy", path, line)?;
        let raw_sell = field(&record, layout.sell, "sell", path, line)?;

        let secs: i64 = raw_time.parse().map_err(|_| invalid("time", raw_time))?;
        let buy: f64 = raw_buy.parse().map_err(|_| invalid("buy", raw_buy))?;
        let sell: f64 = raw_sell.parse().map_err(|_| invalid("sell", raw_sell))?;
        if !buy.is_finite() {
            return Err(invalid("buy", raw_buy));
        }
        if !sell.is_finite() {
            return Err(invalid("sell", raw_sell));
        }
        let event = PriceEvent::from_unix(secs, buy, sell).ok_or_else(|| invalid("time", raw_time))?;

        if prices.last().is_some_and(|prev| prev.time > event.time) {
            return Err(LoadError::Unordered {
                path: path.to_path_buf(),
                line,
            });
        }
        prices.push(event);
    }

    debug!(chart = name, points = prices.len(), path = %path.display(), "chart loaded");
    Ok(Chart::new(name, prices))
}

/// Load every chart sub-directory of `dir`, sorted by directory name.
///
/// Plain files directly inside `dir` are ignored.
pub fn load_chart_dir(dir: &Path) -> Result<Vec<Chart>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut chart_dirs: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            chart_dirs.push(path);
        }
    }
    chart_dirs.sort();

    let mut charts = Vec::with_capacity(chart_dirs.len());
    for chart_dir in chart_dirs {
        let csv_path = chart_dir.join(CHART_FILE);
        let layout_path = chart_dir.join(LAYOUT_FILE);
        if !csv_path.is_file() {
            return Err(LoadError::MissingFile(chart_dir, CHART_FILE));
        }
        if !layout_path.is_file() {
            return Err(LoadError::MissingFile(chart_dir, LAYOUT_FILE));
        }
        let layout = CsvLayout::load(&layout_path)?;
        let name = chart_dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        charts.push(load_named_chart_csv(&csv_path, &name, &layout)?);
    }

    if charts.is_empty() {
        return Err(LoadError::NoCharts(dir.to_path_buf()));
    }
    info!(charts = charts.len(), dir = %dir.display(), "chart directory loaded");
    Ok(charts)
}

/// Deterministic random-walk chart for testing and demos.
///
/// Seeded from the chart name, so the same name always yields the same
/// prices. Starts at 100.0; the sell quote sits a small spread below buy.
pub fn synthetic_chart(
    name: &str,
    points: usize,
    start: DateTime<Utc>,
    interval: Duration,
) -> Chart {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(name.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut prices = Vec::with_capacity(points);
    let mut price = 100.0_f64;
    let mut time = start;
    for _ in 0..points {
        // slight upward drift so surges show up
        let step_return: f64 = rng.gen_range(-0.004..0.0045);
        price = (price * (1.0 + step_return)).max(0.01);
        let spread: f64 = rng.gen_range(0.0005..0.002);
        prices.push(PriceEvent::new(price, price * (1.0 - spread), time));
        time += interval;
    }

    Chart::new(name, prices)
}
