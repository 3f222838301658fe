//! Seller: exit rule on holding time and fee-adjusted revenue.

use chrono::Duration;

use crate::config::{ConfigError, SellerConfig};
use crate::domain::PriceEvent;

/// Fee-adjusted revenue in percent of selling at `current` what was bought at `bought`.
///
/// Zero when the buy price is zero.
pub fn revenue(bought: &PriceEvent, current: &PriceEvent, fee: f64) -> f64 {
    if bought.buy == 0.0 {
        return 0.0;
    }
    let r = (current.sell - bought.buy) * 100.0 / bought.buy - fee;
    if r.is_nan() {
        0.0
    } else {
        r
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SellDecision {
    Sell { revenue: f64, held: Duration },
    Hold,
}

impl SellDecision {
    pub fn is_sell(&self) -> bool {
        matches!(self, SellDecision::Sell { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Seller {
    config: SellerConfig,
}

impl Seller {
    pub fn new(config: SellerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SellerConfig {
        &self.config
    }

    /// Sell once the position was held at least `duration_min` and clears `revenue_min`.
    pub fn consider(&self, bought: &PriceEvent, current: &PriceEvent) -> SellDecision {
        let held = current.time - bought.time;
        let revenue = revenue(bought, current, self.config.fee_min);
        if held >= self.config.duration_min && revenue >= self.config.revenue_min {
            SellDecision::Sell { revenue, held }
        } else {
            SellDecision::Hold
        }
    }
}
