//! SurgeLab Core: price events, windows, surge detection, deciders, trader, permutation grid.
//!
//! This crate contains the simulation engine:
//! - Domain types (price events, charts, config hashes)
//! - Trailing time windows and surge detection
//! - Buyer and seller rule engines
//! - Trader loop with pluggable executors
//! - Grid-search permutation engine over strategy configs

pub mod config;
pub mod decider;
pub mod domain;
pub mod executor;
pub mod permutation;
pub mod serde_secs;
pub mod stream;
pub mod surge;
pub mod trader;
pub mod window;

pub use config::{BuyerConfig, ConfigError, SellerConfig, StrategyConfig, TraderConfig};
pub use domain::{Chart, ConfigHash, PriceEvent};
pub use executor::{Executor, ExecutorError, NoopExecutor, QueuedExecutor, RecordingExecutor};
pub use permutation::{ParamDescriptor, ParamValue, Permutable, PermutationEngine, PermutationError};
pub use stream::PriceStream;
pub use trader::{RunResult, TradeError, TradeResult, Trader};
