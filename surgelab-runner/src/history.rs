//! Best-configuration history.
//!
//! A bounded list ordered best-first. A record enters only if its total
//! revenue is strictly greater than the current best, so on ties the earlier
//! grid point keeps its place. An empty history acts as a best of zero, so
//! configurations that lose money or break even are never kept. When full,
//! the oldest (and worst) record is dropped.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use surgelab_core::{ConfigHash, StrategyConfig};

/// One completed grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// 1-based position in the sweep.
    pub step: u64,
    pub indices: Vec<usize>,
    pub config: StrategyConfig,
    pub config_hash: ConfigHash,
    /// Completed cycles per chart.
    pub cycles: Vec<u64>,
    /// Revenue per chart.
    pub revenues: Vec<f64>,
}

impl HistoryRecord {
    pub fn total_revenue(&self) -> f64 {
        self.revenues.iter().sum()
    }

    pub fn total_cycles(&self) -> u64 {
        self.cycles.iter().sum()
    }
}

#[derive(Debug, Clone)]
pub struct BestHistory {
    records: VecDeque<HistoryRecord>,
    capacity: usize,
}

impl BestHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Keep `record` if it beats the current best. Returns whether it was kept.
    pub fn offer(&mut self, record: HistoryRecord) -> bool {
        let floor = self.records.front().map_or(0.0, HistoryRecord::total_revenue);
        if record.total_revenue() <= floor {
            return false;
        }
        self.records.push_front(record);
        self.records.truncate(self.capacity);
        true
    }

    pub fn best(&self) -> Option<&HistoryRecord> {
        self.records.front()
    }

    /// Records, best first.
    pub fn records(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
