//! Bounded FIFO history rings retained for reporting only.
//!
//! Neither ring is consulted by the decision rule beyond a trivial
//! recent-average used for logging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const METRIC_HISTORY_CAPACITY: usize = 100;
const ACTION_HISTORY_CAPACITY: usize = 50;

/// One metric sample observed during a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricObservation {
    /// Wall time the sample was taken
    pub timestamp: DateTime<Utc>,
    /// Metric value (seconds)
    pub metric: f64,
    /// Replica count observed alongside the metric
    pub replicas: u32,
}

/// One actuation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Wall time the actuation was issued
    pub timestamp: DateTime<Utc>,
    /// Target replica count requested
    pub target: u32,
    /// Whether the actuator reported success
    pub success: bool,
    /// How long the actuator call took
    pub duration: std::time::Duration,
}

/// A fixed-capacity FIFO ring. Pushing past capacity drops the oldest entry.
#[derive(Debug, Clone)]
pub struct Ring<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    fn push(&mut self, item: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(item);
    }

    /// Number of entries currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ring holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

/// Ring of the last 100 metric observations.
#[derive(Debug, Clone)]
pub struct MetricHistory(Ring<MetricObservation>);

impl Default for MetricHistory {
    fn default() -> Self {
        Self(Ring::with_capacity(METRIC_HISTORY_CAPACITY))
    }
}

impl MetricHistory {
    /// Record a present-metric tick. Missing-metric ticks produce no entry.
    pub fn record(&mut self, metric: f64, replicas: u32) {
        self.0.push(MetricObservation {
            timestamp: Utc::now(),
            metric,
            replicas,
        });
    }

    /// Number of retained observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Average of the retained metric values, used only for reporting.
    #[must_use]
    pub fn recent_average(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        let sum: f64 = self.0.iter().map(|o| o.metric).sum();
        Some(sum / self.0.len() as f64)
    }
}

/// Ring of the last 50 actuation attempts.
#[derive(Debug, Clone)]
pub struct ActionHistory(Ring<ActionRecord>);

impl Default for ActionHistory {
    fn default() -> Self {
        Self(Ring::with_capacity(ACTION_HISTORY_CAPACITY))
    }
}

impl ActionHistory {
    /// Record an actuation attempt, successful or not.
    pub fn record(&mut self, target: u32, success: bool, duration: std::time::Duration) {
        self.0.push(ActionRecord {
            timestamp: Utc::now(),
            target,
            success,
            duration,
        });
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the retained records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActionRecord> {
        self.0.iter()
    }
}
