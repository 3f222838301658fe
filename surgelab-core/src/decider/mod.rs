//! Buy and sell rule engines.
//!
//! The [`Buyer`] is stateful: it owns the trailing window, the corridor
//! ceiling, the time of the last buy and the open-position count. The
//! [`Seller`] only compares a held position against the current price.

pub mod buyer;
pub mod seller;

pub use buyer::{BuyDecision, Buyer, BuyerState, SkipReason};
pub use seller::{revenue, SellDecision, Seller};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Malformed decider state or input. Fatal to the chart being replayed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeciderError {
    #[error("price at {current} arrived after {previous}")]
    TimeRegression {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
    #[error("non-finite price at {0}")]
    VoidPrice(DateTime<Utc>),
    #[error("position closed with no open positions")]
    ConcurrencyUnderflow,
}
