//! SurgeLab Runner: sweep orchestration, progress, price loading, replay and export.

pub mod analyzer;
pub mod export;
pub mod history;
pub mod logging;
pub mod price_loader;
pub mod progress;
pub mod replay;
pub mod settings;

pub use analyzer::{AnalyzeError, AnalyzeReport, Analyzer, GridPointFailure, SweepOutcome};
pub use history::{BestHistory, HistoryRecord};
pub use price_loader::{load_chart_csv, load_chart_dir, synthetic_chart, CsvLayout, LoadError};
pub use progress::{ProgressHandle, ProgressSnapshot, SweepState};
pub use replay::{replay, ChartReplay, ReplayReport};
pub use settings::{SettingsError, SweepOptions, SweepSettings};
