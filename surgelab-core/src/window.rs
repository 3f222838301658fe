//! Trailing time window over a price history.
//!
//! After every append the window drops leading events that fall out of the
//! span, so every retained event satisfies `last.time - time < span`.
//! Histories shorter than two events are never trimmed.

use chrono::Duration;
use thiserror::Error;

use crate::domain::PriceEvent;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// Soft condition: the event was appended but the window holds fewer
    /// than two points, so no trend can be derived from it yet.
    #[error("not enough data in window: {len} point(s)")]
    InsufficientData { len: usize },
}

/// Append `event` to `history`, then drop leading events with
/// `event.time - time >= span`.
///
/// Ages are compared instead of computing `event.time - span`, so spans
/// reaching past the representable date range keep the whole history.
/// The event is always appended. `Err(InsufficientData)` reports that the
/// history still has fewer than two points afterwards.
pub fn trim(
    history: &mut Vec<PriceEvent>,
    event: PriceEvent,
    span: Duration,
) -> Result<(), WindowError> {
    history.push(event);
    if history.len() < 2 {
        return Err(WindowError::InsufficientData { len: history.len() });
    }

    // Times are non-decreasing, so the expired events form a prefix.
    let cut = history.partition_point(|p| event.time - p.time >= span);
    history.drain(..cut);

    if history.len() < 2 {
        return Err(WindowError::InsufficientData { len: history.len() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(t: i64) -> PriceEvent {
        PriceEvent::from_unix(t, t as f64, t as f64).unwrap()
    }

    fn times(prices: &[PriceEvent]) -> Vec<i64> {
        prices.iter().map(|p| p.time.timestamp()).collect()
    }

    fn build(ts: &[i64], span_secs: i64) -> Vec<PriceEvent> {
        let mut history = Vec::new();
        for &t in ts {
            let _ = trim(&mut history, at(t), Duration::seconds(span_secs));
        }
        history
    }

    #[test]
    fn trims_outside_span() {
        assert_eq!(times(&build(&[1, 2, 3, 4], 3)), vec![2, 3, 4]);
        assert_eq!(times(&build(&[4, 5, 6, 7], 2)), vec![6, 7]);
        assert_eq!(times(&build(&[6, 8, 10, 12], 5)), vec![8, 10, 12]);
    }

    #[test]
    fn boundary_point_is_dropped() {
        // left bound = 4 - 2 = 2, so t=2 is dropped (time <= bound)
        assert_eq!(times(&build(&[1, 2, 3, 4], 2)), vec![3, 4]);
    }

    #[test]
    fn single_point_is_insufficient_and_kept() {
        let mut history = Vec::new();
        let err = trim(&mut history, at(10), Duration::seconds(1)).unwrap_err();
        assert_eq!(err, WindowError::InsufficientData { len: 1 });
        assert_eq!(times(&history), vec![10]);
    }

    #[test]
    fn gap_larger_than_span_leaves_one_point() {
        let mut history = vec![at(1)];
        let err = trim(&mut history, at(100), Duration::seconds(5)).unwrap_err();
        assert_eq!(err, WindowError::InsufficientData { len: 1 });
        assert_eq!(times(&history), vec![100]);
    }

    #[test]
    fn equal_timestamps_are_retained() {
        assert_eq!(times(&build(&[5, 5, 5], 1)), vec![5, 5, 5]);
    }

    #[test]
    fn trim_is_idempotent_for_fixed_tail() {
        let mut history = build(&[1, 2, 3, 4, 5], 3);
        let snapshot = history.clone();
        // re-applying the cut with the same last element removes nothing more
        let left = history.last().unwrap().time - Duration::seconds(3);
        let cut = history.partition_point(|p| p.time <= left);
        history.drain(..cut);
        assert_eq!(history, snapshot);
    }

    #[test]
    fn span_beyond_date_range_keeps_everything() {
        // far larger than any representable distance back from t=3
        let span = Duration::seconds(1_000_000_000_000_000);
        assert_eq!(times(&build(&[1, 2, 3], 1_000_000_000_000_000)), vec![1, 2, 3]);
        let mut history = vec![at(1)];
        assert!(trim(&mut history, at(2), span).is_ok());
    }
}
