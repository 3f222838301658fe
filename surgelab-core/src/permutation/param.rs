//! Parameter descriptors and typed values.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::PermutationError;

/// Slack applied when flooring `max / step` and when checking `value <= max`,
/// so steps like 0.05 do not lose their last grid point to rounding.
const GRID_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Duration,
    Float,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Duration => write!(f, "duration"),
            ParamKind::Float => write!(f, "float"),
        }
    }
}

/// A concrete value for one grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    Duration(#[serde(with = "crate::serde_secs")] Duration),
    Float(f64),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Duration(_) => ParamKind::Duration,
            ParamValue::Float(_) => ParamKind::Float,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Duration(d) => write!(f, "{}s", d.num_seconds()),
            ParamValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Range of one permutable parameter. Min, max and step always share a kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamRange {
    Duration {
        #[serde(with = "crate::serde_secs")]
        min: Duration,
        #[serde(with = "crate::serde_secs")]
        max: Duration,
        #[serde(with = "crate::serde_secs")]
        step: Duration,
    },
    Float {
        min: f64,
        max: f64,
        step: f64,
    },
}

/// A permutable parameter: stable id plus its grid range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub id: String,
    pub range: ParamRange,
}

impl ParamDescriptor {
    pub fn float(id: impl Into<String>, min: f64, max: f64, step: f64) -> Self {
        Self {
            id: id.into(),
            range: ParamRange::Float { min, max, step },
        }
    }

    pub fn duration(id: impl Into<String>, min: Duration, max: Duration, step: Duration) -> Self {
        Self {
            id: id.into(),
            range: ParamRange::Duration { min, max, step },
        }
    }

    pub fn kind(&self) -> ParamKind {
        match self.range {
            ParamRange::Duration { .. } => ParamKind::Duration,
            ParamRange::Float { .. } => ParamKind::Float,
        }
    }

    /// Reject ranges that cannot form a grid: zero or negative step, zero max,
    /// min above max, non-finite bounds. Duration bounds must be whole seconds,
    /// the unit they are stored in.
    pub fn validate(&self) -> Result<(), PermutationError> {
        let reason = match self.range {
            ParamRange::Float { min, max, step } => {
                if !(min.is_finite() && max.is_finite() && step.is_finite()) {
                    Some("bounds must be finite")
                } else if step <= 0.0 {
                    Some("step must be positive")
                } else if max == 0.0 {
                    Some("max must be non-zero")
                } else if min > max {
                    Some("min must not exceed max")
                } else {
                    None
                }
            }
            ParamRange::Duration { min, max, step } => {
                if step <= Duration::zero() {
                    Some("step must be positive")
                } else if [min, max, step].iter().any(|d| d.subsec_nanos() != 0) {
                    Some("durations must be whole seconds")
                } else if max.is_zero() {
                    Some("max must be non-zero")
                } else if min > max {
                    Some("min must not exceed max")
                } else {
                    None
                }
            }
        };
        match reason {
            Some(reason) => Err(PermutationError::InvalidDescriptor {
                id: self.id.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Highest grid index: `floor(max / step)` when `min` is zero, one less otherwise.
    pub fn max_index(&self) -> usize {
        let (steps, min_is_zero) = match self.range {
            ParamRange::Float { min, max, step } => {
                ((max / step + GRID_EPSILON).floor().max(0.0) as usize, min == 0.0)
            }
            ParamRange::Duration { min, max, step } => {
                let steps = max.num_milliseconds() / step.num_milliseconds();
                (steps.max(0) as usize, min.is_zero())
            }
        };
        if min_is_zero {
            steps
        } else {
            steps.saturating_sub(1)
        }
    }

    /// Value at grid index `index`: `min + index * step`, rejected when above `max`.
    pub fn value_at(&self, index: usize) -> Result<ParamValue, PermutationError> {
        let out_of_range = |max: String| PermutationError::ValueOutOfRange {
            id: self.id.clone(),
            index,
            max,
        };
        match self.range {
            ParamRange::Float { min, max, step } => {
                let value = min + index as f64 * step;
                if value > max + GRID_EPSILON * max.abs().max(1.0) {
                    return Err(out_of_range(max.to_string()));
                }
                Ok(ParamValue::Float(value))
            }
            ParamRange::Duration { min, max, step } => {
                let value = (index as i64)
                    .checked_mul(step.num_milliseconds())
                    .and_then(|offset| min.num_milliseconds().checked_add(offset))
                    .and_then(Duration::try_milliseconds)
                    .filter(|v| *v <= max)
                    .ok_or_else(|| out_of_range(format!("{}s", max.num_seconds())))?;
                Ok(ParamValue::Duration(value))
            }
        }
    }

    /// True when the last grid index lands beyond `max`, i.e. some grid points
    /// of this descriptor will fail to materialize.
    pub fn overshoots(&self) -> bool {
        self.value_at(self.max_index()).is_err()
    }
}
