//! Sweep progress shared with observers.
//!
//! The analyzer publishes a [`ProgressSnapshot`] after every grid point.
//! Readers get a clone taken under the lock, so the lock is never held while
//! charts are being replayed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::HistoryRecord;

/// Step durations averaged for the ETA.
pub const STEP_DURATION_CAP: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub state: SweepState,
    pub step_current: u64,
    pub step_total: u64,
    pub indices: Vec<usize>,
    pub max_indices: Vec<usize>,
    pub started_at: Option<DateTime<Utc>>,
    /// Moving average over the last [`STEP_DURATION_CAP`] steps.
    pub avg_step_ms: f64,
    pub eta: Option<DateTime<Utc>>,
    pub best_revenue: Option<f64>,
    pub failed_steps: u64,
    /// Best records, best first.
    pub history: Vec<HistoryRecord>,
}

impl ProgressSnapshot {
    /// Completed share of the grid, 0–100.
    pub fn percent(&self) -> f64 {
        if self.step_total == 0 {
            return 0.0;
        }
        self.step_current as f64 * 100.0 / self.step_total as f64
    }
}

/// Fixed-size moving average of step durations.
#[derive(Debug, Clone)]
pub struct StepDurations {
    samples: VecDeque<Duration>,
    cap: usize,
}

impl StepDurations {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            samples: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, d: Duration) {
        if self.samples.len() == self.cap {
            self.samples.pop_front();
        }
        self.samples.push_back(d);
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    /// Expected completion time for `remaining` more steps at the current average.
    pub fn eta(&self, now: DateTime<Utc>, remaining: u64) -> Option<DateTime<Utc>> {
        let left = self.average().checked_mul(u32::try_from(remaining).ok()?)?;
        let left = chrono::Duration::from_std(left).ok()?;
        now.checked_add_signed(left)
    }
}

impl Default for StepDurations {
    fn default() -> Self {
        Self::new(STEP_DURATION_CAP)
    }
}

/// Cloneable handle to the live snapshot.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    inner: Arc<Mutex<ProgressSnapshot>>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProgressSnapshot> {
        // A panicking writer leaves plain data behind; keep serving it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock().clone()
    }

    /// Apply `f` under the lock. Keep `f` short.
    pub fn update(&self, f: impl FnOnce(&mut ProgressSnapshot)) {
        f(&mut self.lock());
    }
}
