//! Chart: a named, ordered price series.

use serde::{Deserialize, Serialize};

use super::PriceEvent;

/// One independent price sequence ("chart") replayed by the trader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub name: String,
    pub prices: Vec<PriceEvent>,
}

impl Chart {
    pub fn new(name: impl Into<String>, prices: Vec<PriceEvent>) -> Self {
        Self {
            name: name.into(),
            prices,
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// True when timestamps never decrease.
    pub fn is_ordered(&self) -> bool {
        self.prices.windows(2).all(|w| w[0].time <= w[1].time)
    }

    /// Deterministic content hash, used to tag analysis reports with the data they ran on.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        for p in &self.prices {
            hasher.update(&p.time.timestamp_millis().to_le_bytes());
            hasher.update(&p.buy.to_bits().to_le_bytes());
            hasher.update(&p.sell.to_bits().to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
