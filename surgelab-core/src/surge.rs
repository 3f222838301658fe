//! Surge detection: trend angles and the most recent rising run of a window.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::PriceEvent;

/// Angle in degrees of the segment `p1 -> p2` on the (seconds, buy price) plane.
///
/// Positive for a rising price, negative for a falling one. A zero time delta
/// yields 0 rather than a vertical angle.
pub fn angle(p1: &PriceEvent, p2: &PriceEvent) -> f64 {
    let dt = (p2.time_secs() - p1.time_secs()).abs();
    if dt == 0.0 {
        return 0.0;
    }
    let dp = p2.buy - p1.buy;
    let degrees = (dp.abs() / dt).atan() * 180.0 / std::f64::consts::PI;
    if dp < 0.0 {
        -degrees
    } else {
        degrees
    }
}

/// A trend segment between two price events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surge {
    pub angle: f64,
    pub left: PriceEvent,
    pub right: PriceEvent,
}

impl Surge {
    pub fn between(left: PriceEvent, right: PriceEvent) -> Self {
        Self {
            angle: angle(&left, &right),
            left,
            right,
        }
    }

    pub fn duration(&self) -> Duration {
        self.right.time - self.left.time
    }
}

/// Most recent run of the window in which each older point stays below the
/// next newer point plus `tolerance` percent of it.
///
/// Walks newest to oldest and stops at the first violation. The run is a
/// suffix of `window`, returned in chronological order; runs shorter than two
/// points come back empty.
pub fn find_last_surge(window: &[PriceEvent], tolerance: f64) -> &[PriceEvent] {
    if window.len() < 2 {
        return &[];
    }

    let mut start = 0;
    for i in (1..window.len()).rev() {
        let kept = window[i].buy;
        let older = window[i - 1].buy;
        if older >= kept + kept * tolerance / 100.0 {
            start = i;
            break;
        }
    }

    let run = &window[start..];
    if run.len() < 2 {
        &[]
    } else {
        run
    }
}

/// Consecutive segments of a run.
pub fn segments(run: &[PriceEvent]) -> Vec<Surge> {
    run.windows(2).map(|w| Surge::between(w[0], w[1])).collect()
}

/// Arithmetic mean of the segment angles; 0 for no segments.
pub fn average_angle(surges: &[Surge]) -> f64 {
    if surges.is_empty() {
        return 0.0;
    }
    surges.iter().map(|s| s.angle).sum::<f64>() / surges.len() as f64
}

/// Stretch a surge duration by `floor(seconds * angle² / 100)` whole seconds,
/// so steep surges clear a duration threshold sooner.
pub fn boosted_duration(duration: Duration, angle: f64) -> Duration {
    let secs = duration.num_seconds();
    let boost = (secs as f64 * angle * angle / 100.0).floor() as i64;
    Duration::seconds(secs + boost)
}

/// Summary of the last surge in a window, as consumed by the buyer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurgeReading {
    pub points: usize,
    pub angle: f64,
    pub duration: Duration,
    pub boosted: Duration,
}

/// Read the last surge of `window`, or `None` when there is no run of two or more points.
pub fn read_last_surge(window: &[PriceEvent], tolerance: f64) -> Option<SurgeReading> {
    let run = find_last_surge(window, tolerance);
    let (first, last) = (run.first()?, run.last()?);
    let angle = average_angle(&segments(run));
    let duration = last.time - first.time;
    Some(SurgeReading {
        points: run.len(),
        angle,
        duration,
        boosted: boosted_duration(duration, angle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(t: i64, buy: f64) -> PriceEvent {
        PriceEvent::from_unix(t, buy, buy).unwrap()
    }

    fn series(buys: &[f64]) -> Vec<PriceEvent> {
        buys.iter()
            .enumerate()
            .map(|(i, &b)| p(i as i64 + 1, b))
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn points(run: &[PriceEvent]) -> Vec<(i64, f64)> {
        run.iter().map(|e| (e.time.timestamp(), e.buy)).collect()
    }

    #[test]
    fn angle_examples() {
        assert!(approx(angle(&p(1, 1.0), &p(2, 2.0)), 45.0));
        assert!(approx(angle(&p(2, 2.0), &p(1, 1.0)), -45.0));
        assert_eq!(angle(&p(0, 0.0), &p(0, 0.0)), 0.0);
    }

    #[test]
    fn angle_on_real_quotes() {
        let a = angle(&p(1_391_212_802, 797.40), &p(1_391_213_041, 798.89));
        assert!((a - 0.357_195_001_994_634_8).abs() < 1e-9, "got {a}");
    }

    #[test]
    fn zero_time_delta_is_flat() {
        assert_eq!(angle(&p(5, 1.0), &p(5, 100.0)), 0.0);
    }

    #[test]
    fn last_surge_stops_at_first_drop() {
        let w = series(&[10.0, 20.0, 30.0, 10.0, 20.0, 30.0]);
        assert_eq!(
            points(find_last_surge(&w, 0.0)),
            vec![(4, 10.0), (5, 20.0), (6, 30.0)]
        );

        let w = series(&[10.0, 20.0, 30.0, 10.0, 40.0, 90.0]);
        assert_eq!(
            points(find_last_surge(&w, 0.0)),
            vec![(4, 10.0), (5, 40.0), (6, 90.0)]
        );
    }

    #[test]
    fn flat_prefix_breaks_strict_comparison() {
        let w = series(&[10.0, 10.0, 10.0, 10.0, 40.0, 90.0]);
        assert_eq!(
            points(find_last_surge(&w, 0.0)),
            vec![(4, 10.0), (5, 40.0), (6, 90.0)]
        );
    }

    #[test]
    fn falling_then_flat_has_no_surge() {
        let w = series(&[90.0, 40.0, 10.0, 10.0, 10.0, 10.0]);
        assert!(find_last_surge(&w, 0.0).is_empty());
    }

    #[test]
    fn tolerance_absorbs_small_dips() {
        // 101 < 100 + 100 * 2% = 102, so the dip is tolerated
        let w = series(&[90.0, 101.0, 100.0, 110.0]);
        assert_eq!(find_last_surge(&w, 0.0).len(), 2);
        assert_eq!(find_last_surge(&w, 2.0).len(), 4);
    }

    #[test]
    fn short_windows_have_no_surge() {
        assert!(find_last_surge(&[], 0.0).is_empty());
        assert!(find_last_surge(&series(&[1.0]), 0.0).is_empty());
    }

    #[test]
    fn average_of_segments() {
        assert_eq!(average_angle(&[]), 0.0);
        let run = vec![p(1, 1.0), p(2, 2.0), p(3, 2.0)];
        let segs = segments(&run);
        assert_eq!(segs.len(), 2);
        assert!(approx(average_angle(&segs), 22.5));
        assert_eq!(segs[0].duration(), Duration::seconds(1));
    }

    #[test]
    fn boost_is_floored_to_seconds() {
        // 100s * 3^2 / 100 = 9s
        assert_eq!(
            boosted_duration(Duration::seconds(100), 3.0),
            Duration::seconds(109)
        );
        // 10s * 0.5^2 / 100 = 0.025s, floored away
        assert_eq!(
            boosted_duration(Duration::seconds(10), 0.5),
            Duration::seconds(10)
        );
    }

    #[test]
    fn reading_covers_whole_run() {
        let w = series(&[5.0, 1.0, 2.0, 3.0]);
        let r = read_last_surge(&w, 0.0).unwrap();
        assert_eq!(r.points, 3);
        assert_eq!(r.duration, Duration::seconds(2));
        assert!(approx(r.angle, 45.0));
        // 2s + floor(2 * 45^2 / 100) = 2s + 40s
        assert_eq!(r.boosted, Duration::seconds(42));
        assert!(read_last_surge(&series(&[3.0, 2.0, 1.0]), 0.0).is_none());
    }
}
