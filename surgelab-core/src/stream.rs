//! Price sources consumed by the trader.

use crate::domain::{Chart, PriceEvent};

/// One or more independent, finite, time-ordered price sequences.
///
/// Each chart is read from start to end once per run; exhausting the
/// iterator is the normal end of the chart.
pub trait PriceStream: Sync {
    fn chart_count(&self) -> usize;

    fn chart_name(&self, chart: usize) -> Option<&str>;

    fn prices(&self, chart: usize) -> Box<dyn Iterator<Item = PriceEvent> + '_>;
}

impl PriceStream for [Chart] {
    fn chart_count(&self) -> usize {
        self.len()
    }

    fn chart_name(&self, chart: usize) -> Option<&str> {
        self.get(chart).map(|c| c.name.as_str())
    }

    fn prices(&self, chart: usize) -> Box<dyn Iterator<Item = PriceEvent> + '_> {
        match self.get(chart) {
            Some(c) => Box::new(c.prices.iter().copied()),
            None => Box::new(std::iter::empty()),
        }
    }
}

impl PriceStream for Vec<Chart> {
    fn chart_count(&self) -> usize {
        self.as_slice().chart_count()
    }

    fn chart_name(&self, chart: usize) -> Option<&str> {
        self.as_slice().chart_name(chart)
    }

    fn prices(&self, chart: usize) -> Box<dyn Iterator<Item = PriceEvent> + '_> {
        self.as_slice().prices(chart)
    }
}
