//! Strategy configuration: buyer, seller and trader thresholds.
//!
//! Every numeric or duration leaf is addressable through a stable id (see
//! [`PARAM_IDS`]) so the permutation engine can sweep it. Durations serialize
//! as whole seconds under a `*_secs` key.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ConfigHash;
use crate::permutation::{ParamDescriptor, ParamKind, ParamValue, Permutable, PermutationError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: String },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: String },
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field} must be whole seconds, got {value}")]
    FractionalSeconds { field: &'static str, value: String },
}

// ─── Role configs ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuyerConfig {
    /// Trailing span of prices the surge is detected in.
    #[serde(rename = "chart_window_secs", with = "crate::serde_secs")]
    pub chart_window: Duration,
    /// Minimum average surge angle, in degrees.
    pub surge_min: f64,
    /// Minimum boosted surge duration.
    #[serde(rename = "surge_duration_min_secs", with = "crate::serde_secs")]
    pub surge_duration_min: Duration,
    /// Percent an older price may exceed the next newer one and still count as rising.
    pub surge_tolerance: f64,
    /// Maximum positions open at once.
    pub max_concurrent: u32,
    /// Corridor ceiling as a percentage of the highest buy price seen.
    pub corridor_max: f64,
    /// Minimum time between two buys.
    #[serde(rename = "pause_min_secs", with = "crate::serde_secs")]
    pub pause_min: Duration,
}

impl Default for BuyerConfig {
    fn default() -> Self {
        Self {
            chart_window: Duration::days(7),
            surge_min: 3.5,
            surge_duration_min: Duration::minutes(20),
            surge_tolerance: 0.6,
            max_concurrent: 1,
            corridor_max: 100.0,
            pause_min: Duration::hours(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellerConfig {
    #[serde(rename = "chart_window_secs", with = "crate::serde_secs")]
    pub chart_window: Duration,
    /// Minimum time a position is held.
    #[serde(rename = "duration_min_secs", with = "crate::serde_secs")]
    pub duration_min: Duration,
    /// Minimum fee-adjusted revenue, in percent.
    pub revenue_min: f64,
    /// Fee deducted from every trade's revenue, in percent.
    pub fee_min: f64,
}

impl Default for SellerConfig {
    fn default() -> Self {
        Self {
            chart_window: Duration::days(7),
            duration_min: Duration::minutes(4),
            revenue_min: 4.5,
            fee_min: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraderConfig {
    /// Quote currency spent per buy.
    pub budget: f64,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self { budget: 500.0 }
    }
}

/// Complete configuration of one simulated run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub buyer: BuyerConfig,
    pub seller: SellerConfig,
    pub trader: TraderConfig,
}

// ─── Validation ──────────────────────────────────────────────────────

fn whole_seconds(field: &'static str, d: Duration) -> Result<Duration, ConfigError> {
    if d.subsec_nanos() != 0 {
        return Err(ConfigError::FractionalSeconds {
            field,
            value: format!("{}ms", d.num_milliseconds()),
        });
    }
    Ok(d)
}

fn positive_duration(field: &'static str, d: Duration) -> Result<(), ConfigError> {
    if whole_seconds(field, d)? <= Duration::zero() {
        return Err(ConfigError::NotPositive {
            field,
            value: format!("{}s", d.num_seconds()),
        });
    }
    Ok(())
}

fn non_negative_duration(field: &'static str, d: Duration) -> Result<(), ConfigError> {
    if whole_seconds(field, d)? < Duration::zero() {
        return Err(ConfigError::Negative {
            field,
            value: format!("{}s", d.num_seconds()),
        });
    }
    Ok(())
}

fn finite(field: &'static str, v: f64) -> Result<f64, ConfigError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ConfigError::NotFinite { field, value: v })
    }
}

fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if finite(field, v)? <= 0.0 {
        return Err(ConfigError::NotPositive {
            field,
            value: v.to_string(),
        });
    }
    Ok(())
}

fn non_negative(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if finite(field, v)? < 0.0 {
        return Err(ConfigError::Negative {
            field,
            value: v.to_string(),
        });
    }
    Ok(())
}

impl BuyerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_duration("buyer.chart.window", self.chart_window)?;
        finite("buyer.surge.min", self.surge_min)?;
        non_negative_duration("buyer.surge.duration.min", self.surge_duration_min)?;
        non_negative("buyer.surge.tolerance", self.surge_tolerance)?;
        if self.max_concurrent == 0 {
            return Err(ConfigError::NotPositive {
                field: "buyer.trade.concurrent",
                value: "0".into(),
            });
        }
        positive("buyer.trade.corridor.max", self.corridor_max)?;
        non_negative_duration("buyer.trade.pause.min", self.pause_min)?;
        Ok(())
    }
}

impl SellerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_duration("seller.chart.window", self.chart_window)?;
        non_negative_duration("seller.trade.duration.min", self.duration_min)?;
        finite("seller.trade.revenue.min", self.revenue_min)?;
        non_negative("seller.trade.fee.min", self.fee_min)?;
        Ok(())
    }
}

impl TraderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("trader.trade.budget", self.budget)
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.buyer.validate()?;
        self.seller.validate()?;
        self.trader.validate()
    }

    pub fn config_hash(&self) -> Result<ConfigHash, serde_json::Error> {
        ConfigHash::of(self)
    }
}

// ─── Permutable fields ───────────────────────────────────────────────

/// Every permutable field of [`StrategyConfig`] with its value kind.
pub const PARAM_IDS: &[(&str, ParamKind)] = &[
    ("buyer.chart.window", ParamKind::Duration),
    ("buyer.surge.min", ParamKind::Float),
    ("buyer.surge.duration.min", ParamKind::Duration),
    ("buyer.surge.tolerance", ParamKind::Float),
    ("buyer.trade.concurrent", ParamKind::Float),
    ("buyer.trade.corridor.max", ParamKind::Float),
    ("buyer.trade.pause.min", ParamKind::Duration),
    ("seller.chart.window", ParamKind::Duration),
    ("seller.trade.duration.min", ParamKind::Duration),
    ("seller.trade.revenue.min", ParamKind::Float),
    ("seller.trade.fee.min", ParamKind::Float),
    ("trader.trade.budget", ParamKind::Float),
];

/// Search space used when a sweep declares no parameters of its own.
pub fn default_descriptors() -> Vec<ParamDescriptor> {
    vec![
        ParamDescriptor::float("buyer.surge.min", 0.5, 5.0, 0.5),
        ParamDescriptor::float("buyer.surge.tolerance", 0.2, 1.0, 0.2),
        ParamDescriptor::duration(
            "buyer.trade.pause.min",
            Duration::zero(),
            Duration::hours(12),
            Duration::hours(3),
        ),
        ParamDescriptor::duration(
            "seller.trade.duration.min",
            Duration::minutes(10),
            Duration::minutes(60),
            Duration::minutes(10),
        ),
    ]
}

fn kind_mismatch(id: &str, expected: ParamKind) -> PermutationError {
    PermutationError::KindMismatch {
        id: id.to_string(),
        expected,
    }
}

impl Permutable for StrategyConfig {
    fn permutable_descriptors(&self) -> Vec<ParamDescriptor> {
        default_descriptors()
    }

    fn set_value(&mut self, id: &str, value: ParamValue) -> Result<(), PermutationError> {
        let expected = PARAM_IDS
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| PermutationError::UnknownParam(id.to_string()))?;

        match value {
            ParamValue::Duration(d) => {
                let slot = match id {
                    "buyer.chart.window" => &mut self.buyer.chart_window,
                    "buyer.surge.duration.min" => &mut self.buyer.surge_duration_min,
                    "buyer.trade.pause.min" => &mut self.buyer.pause_min,
                    "seller.chart.window" => &mut self.seller.chart_window,
                    "seller.trade.duration.min" => &mut self.seller.duration_min,
                    _ => return Err(kind_mismatch(id, expected)),
                };
                *slot = d;
            }
            ParamValue::Float(v) => {
                let slot = match id {
                    "buyer.surge.min" => &mut self.buyer.surge_min,
                    "buyer.surge.tolerance" => &mut self.buyer.surge_tolerance,
                    "buyer.trade.corridor.max" => &mut self.buyer.corridor_max,
                    "seller.trade.revenue.min" => &mut self.seller.revenue_min,
                    "seller.trade.fee.min" => &mut self.seller.fee_min,
                    "trader.trade.budget" => &mut self.trader.budget,
                    "buyer.trade.concurrent" => {
                        self.buyer.max_concurrent = v.max(0.0) as u32;
                        return Ok(());
                    }
                    _ => return Err(kind_mismatch(id, expected)),
                };
                *slot = v;
            }
        }
        Ok(())
    }

    fn value_of(&self, id: &str) -> Option<ParamValue> {
        let value = match id {
            "buyer.chart.window" => ParamValue::Duration(self.buyer.chart_window),
            "buyer.surge.min" => ParamValue::Float(self.buyer.surge_min),
            "buyer.surge.duration.min" => ParamValue::Duration(self.buyer.surge_duration_min),
            "buyer.surge.tolerance" => ParamValue::Float(self.buyer.surge_tolerance),
            "buyer.trade.concurrent" => ParamValue::Float(f64::from(self.buyer.max_concurrent)),
            "buyer.trade.corridor.max" => ParamValue::Float(self.buyer.corridor_max),
            "buyer.trade.pause.min" => ParamValue::Duration(self.buyer.pause_min),
            "seller.chart.window" => ParamValue::Duration(self.seller.chart_window),
            "seller.trade.duration.min" => ParamValue::Duration(self.seller.duration_min),
            "seller.trade.revenue.min" => ParamValue::Float(self.seller.revenue_min),
            "seller.trade.fee.min" => ParamValue::Float(self.seller.fee_min),
            "trader.trade.budget" => ParamValue::Float(self.trader.budget),
            _ => return None,
        };
        Some(value)
    }
}
