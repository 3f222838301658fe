//! Buyer: surge-following entry rule.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::DeciderError;
use crate::config::{BuyerConfig, ConfigError};
use crate::domain::PriceEvent;
use crate::surge::read_last_surge;
use crate::window;

/// Why a price did not produce a buy. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    ConcurrencyLimit,
    AboveCorridor,
    Paused,
    InsufficientData,
    NoSurge,
    WeakSurge,
    ShortSurge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyDecision {
    Buy,
    Skip(SkipReason),
}

impl BuyDecision {
    pub fn is_buy(&self) -> bool {
        matches!(self, BuyDecision::Buy)
    }
}

/// Per-chart buyer state. Starts empty and is mutated only by its own buyer.
#[derive(Debug, Clone, Default)]
pub struct BuyerState {
    pub window: Vec<PriceEvent>,
    /// Highest buy price seen so far.
    pub ceiling: f64,
    pub last_buy: Option<PriceEvent>,
    pub open: u32,
    pub current: Option<PriceEvent>,
    pub previous: Option<PriceEvent>,
}

#[derive(Debug, Clone)]
pub struct Buyer {
    config: BuyerConfig,
    state: BuyerState,
}

impl Buyer {
    pub fn new(config: BuyerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: BuyerState::default(),
        })
    }

    pub fn config(&self) -> &BuyerConfig {
        &self.config
    }

    pub fn state(&self) -> &BuyerState {
        &self.state
    }

    pub fn open_positions(&self) -> u32 {
        self.state.open
    }

    /// Feed the next price and decide whether to buy at it.
    ///
    /// The window, ceiling and current price are updated on every call,
    /// including calls that end in a skip.
    pub fn consider(&mut self, price: &PriceEvent) -> Result<BuyDecision, DeciderError> {
        if price.is_void() {
            return Err(DeciderError::VoidPrice(price.time));
        }
        if let Some(current) = self.state.current {
            if price.time < current.time {
                return Err(DeciderError::TimeRegression {
                    previous: current.time,
                    current: price.time,
                });
            }
        }

        let window_ready =
            window::trim(&mut self.state.window, *price, self.config.chart_window).is_ok();
        self.state.ceiling = self.state.ceiling.max(price.buy);
        self.state.previous = self.state.current.replace(*price);

        let decision = match self.check(price, window_ready) {
            Some(reason) => BuyDecision::Skip(reason),
            None => {
                self.state.open += 1;
                self.state.last_buy = Some(*price);
                BuyDecision::Buy
            }
        };
        Ok(decision)
    }

    fn check(&self, price: &PriceEvent, window_ready: bool) -> Option<SkipReason> {
        let cfg = &self.config;

        if self.state.open >= cfg.max_concurrent {
            return Some(SkipReason::ConcurrencyLimit);
        }
        if price.buy > self.state.ceiling * cfg.corridor_max / 100.0 {
            return Some(SkipReason::AboveCorridor);
        }
        if let Some(last) = self.state.last_buy {
            if price.time - last.time < cfg.pause_min {
                return Some(SkipReason::Paused);
            }
        }
        if !window_ready {
            return Some(SkipReason::InsufficientData);
        }

        let Some(surge) = read_last_surge(&self.state.window, cfg.surge_tolerance) else {
            return Some(SkipReason::NoSurge);
        };
        if surge.angle < cfg.surge_min {
            return Some(SkipReason::WeakSurge);
        }
        if surge.boosted < cfg.surge_duration_min {
            return Some(SkipReason::ShortSurge);
        }
        None
    }

    /// Release one concurrency slot after a position is closed.
    pub fn decrement_concurrency(&mut self) -> Result<(), DeciderError> {
        self.state.open = self
            .state
            .open
            .checked_sub(1)
            .ok_or(DeciderError::ConcurrencyUnderflow)?;
        Ok(())
    }

    /// Time left before another buy is allowed, if a pause is running at `price`.
    pub fn pause_remaining(&self, price: &PriceEvent) -> Option<Duration> {
        let last = self.state.last_buy?;
        let remaining = self.config.pause_min.checked_sub(&(price.time - last.time))?;
        (remaining > Duration::zero()).then_some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(t: i64, buy: f64) -> PriceEvent {
        PriceEvent::from_unix(t, buy, buy).unwrap()
    }

    /// Permissive buyer: any rising pair of points is a buy.
    fn eager_config() -> BuyerConfig {
        BuyerConfig {
            chart_window: Duration::hours(1),
            surge_min: 0.0,
            surge_duration_min: Duration::zero(),
            surge_tolerance: 0.0,
            max_concurrent: 3,
            corridor_max: 100.0,
            pause_min: Duration::zero(),
        }
    }

    #[test]
    fn first_price_is_insufficient_data() {
        let mut buyer = Buyer::new(eager_config()).unwrap();
        assert_eq!(
            buyer.consider(&p(0, 1.0)).unwrap(),
            BuyDecision::Skip(SkipReason::InsufficientData)
        );
        assert_eq!(buyer.state().ceiling, 1.0);
        assert_eq!(buyer.state().window.len(), 1);
    }

    #[test]
    fn rising_pair_buys() {
        let mut buyer = Buyer::new(eager_config()).unwrap();
        buyer.consider(&p(0, 1.0)).unwrap();
        assert!(buyer.consider(&p(1, 2.0)).unwrap().is_buy());
        assert_eq!(buyer.open_positions(), 1);
        assert_eq!(buyer.state().last_buy, Some(p(1, 2.0)));
    }

    #[test]
    fn concurrency_cap_rejects_fourth_buy() {
        let mut buyer = Buyer::new(eager_config()).unwrap();
        buyer.consider(&p(0, 1.0)).unwrap();
        for t in 1..=3 {
            assert!(buyer.consider(&p(t, 1.0 + t as f64)).unwrap().is_buy());
        }
        assert_eq!(buyer.open_positions(), 3);
        assert_eq!(
            buyer.consider(&p(4, 5.0)).unwrap(),
            BuyDecision::Skip(SkipReason::ConcurrencyLimit)
        );

        buyer.decrement_concurrency().unwrap();
        assert!(buyer.consider(&p(5, 6.0)).unwrap().is_buy());
    }

    #[test]
    fn corridor_blocks_prices_near_the_top() {
        let mut config = eager_config();
        config.corridor_max = 90.0;
        let mut buyer = Buyer::new(config).unwrap();
        buyer.consider(&p(0, 100.0)).unwrap();
        buyer.consider(&p(1, 50.0)).unwrap();
        // 95 > 100 * 90% = 90
        assert_eq!(
            buyer.consider(&p(2, 95.0)).unwrap(),
            BuyDecision::Skip(SkipReason::AboveCorridor)
        );
        // inside the corridor, but 95 -> 85 is a drop
        assert_eq!(
            buyer.consider(&p(3, 85.0)).unwrap(),
            BuyDecision::Skip(SkipReason::NoSurge)
        );
        assert!(buyer.consider(&p(4, 88.0)).unwrap().is_buy());
    }

    #[test]
    fn pause_blocks_follow_up_buys() {
        let mut config = eager_config();
        config.pause_min = Duration::seconds(10);
        let mut buyer = Buyer::new(config).unwrap();
        buyer.consider(&p(0, 1.0)).unwrap();
        assert!(buyer.consider(&p(1, 2.0)).unwrap().is_buy());
        assert_eq!(
            buyer.consider(&p(5, 3.0)).unwrap(),
            BuyDecision::Skip(SkipReason::Paused)
        );
        assert_eq!(buyer.pause_remaining(&p(5, 3.0)), Some(Duration::seconds(6)));
        // last_buy + pause == time is no longer paused
        assert!(buyer.consider(&p(11, 4.0)).unwrap().is_buy());
    }

    #[test]
    fn huge_durations_do_not_overflow() {
        let mut config = eager_config();
        config.chart_window = Duration::seconds(1_000_000_000_000_000);
        config.pause_min = Duration::seconds(1_000_000_000_000_000);
        config.max_concurrent = 2;
        let mut buyer = Buyer::new(config).unwrap();
        buyer.consider(&p(0, 1.0)).unwrap();
        assert!(buyer.consider(&p(1, 2.0)).unwrap().is_buy());
        assert_eq!(
            buyer.consider(&p(2, 3.0)).unwrap(),
            BuyDecision::Skip(SkipReason::Paused)
        );
        assert_eq!(
            buyer.pause_remaining(&p(2, 3.0)),
            Some(Duration::seconds(1_000_000_000_000_000 - 1))
        );
        assert_eq!(buyer.state().window.len(), 3);
    }

    #[test]
    fn weak_and_short_surges_are_skipped() {
        let mut config = eager_config();
        config.surge_min = 45.0;
        let mut buyer = Buyer::new(config).unwrap();
        buyer.consider(&p(0, 1.0)).unwrap();
        // angle = atan(0.5) ≈ 26.6°
        assert_eq!(
            buyer.consider(&p(1, 1.5)).unwrap(),
            BuyDecision::Skip(SkipReason::WeakSurge)
        );

        let mut config = eager_config();
        config.surge_duration_min = Duration::seconds(100);
        let mut buyer = Buyer::new(config).unwrap();
        buyer.consider(&p(0, 1.0)).unwrap();
        // 1s at ~26.6°: 1 + floor(1 * 706 / 100) = 8s < 100s
        assert_eq!(
            buyer.consider(&p(1, 1.5)).unwrap(),
            BuyDecision::Skip(SkipReason::ShortSurge)
        );
    }

    #[test]
    fn concurrency_is_checked_before_everything_else() {
        let mut config = eager_config();
        config.max_concurrent = 1;
        config.corridor_max = 1.0;
        let mut buyer = Buyer::new(config).unwrap();
        buyer.state.open = 1;
        assert_eq!(
            buyer.consider(&p(0, 1.0)).unwrap(),
            BuyDecision::Skip(SkipReason::ConcurrencyLimit)
        );
    }

    #[test]
    fn malformed_input_is_an_error() {
        let mut buyer = Buyer::new(eager_config()).unwrap();
        buyer.consider(&p(10, 1.0)).unwrap();
        assert!(matches!(
            buyer.consider(&p(9, 1.0)),
            Err(DeciderError::TimeRegression { .. })
        ));
        let mut nan = p(11, 1.0);
        nan.buy = f64::NAN;
        assert!(matches!(
            buyer.consider(&nan),
            Err(DeciderError::VoidPrice(_))
        ));
        assert_eq!(
            buyer.decrement_concurrency(),
            Err(DeciderError::ConcurrencyUnderflow)
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = eager_config();
        config.chart_window = Duration::zero();
        assert!(Buyer::new(config).is_err());
    }
}
