//! PriceEvent: one quoted buy/sell pair at a point in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single quote from a price stream.
///
/// `buy` is the price paid when opening a position, `sell` the price received
/// when closing one. Within a stream, `time` is non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceEvent {
    pub buy: f64,
    pub sell: f64,
    pub time: DateTime<Utc>,
}

impl PriceEvent {
    pub fn new(buy: f64, sell: f64, time: DateTime<Utc>) -> Self {
        Self { buy, sell, time }
    }

    /// Build an event from a unix timestamp in whole seconds.
    ///
    /// Returns `None` when the timestamp is outside chrono's representable range.
    pub fn from_unix(secs: i64, buy: f64, sell: f64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(|time| Self { buy, sell, time })
    }

    /// Time axis value used for angle computation (seconds, millisecond precision).
    pub fn time_secs(&self) -> f64 {
        self.time.timestamp_millis() as f64 / 1000.0
    }

    /// Returns true if either price is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !self.buy.is_finite() || !self.sell.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_unix_keeps_seconds() {
        let p = PriceEvent::from_unix(1_391_212_802, 797.40, 796.0).unwrap();
        assert_eq!(p.time.timestamp(), 1_391_212_802);
        assert_eq!(p.time_secs(), 1_391_212_802.0);
    }

    #[test]
    fn void_detection() {
        let ok = PriceEvent::from_unix(0, 1.0, 1.0).unwrap();
        assert!(!ok.is_void());
        let nan = PriceEvent { buy: f64::NAN, ..ok };
        assert!(nan.is_void());
    }
}
