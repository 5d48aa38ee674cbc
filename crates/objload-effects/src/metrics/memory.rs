//! In-memory metrics collector
//!
//! Accumulates counters, duration samples and byte totals so tests and
//! summaries can read them back.

use objload_core::{Metric, MetricValue, MetricsEffects};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Point-in-time copy of collected metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// Counter totals keyed by metric
    pub counters: HashMap<Metric, u64>,
    /// Duration samples keyed by metric, in report order
    pub durations: HashMap<Metric, Vec<Duration>>,
    /// Payload bytes uploaded
    pub data_sent: u64,
    /// Payload bytes downloaded
    pub data_received: u64,
}

impl MetricsSnapshot {
    /// Counter total, zero if never reported
    pub fn count(&self, metric: Metric) -> u64 {
        self.counters.get(&metric).copied().unwrap_or(0)
    }

    /// Number of duration samples for `metric`
    pub fn samples(&self, metric: Metric) -> usize {
        self.durations.get(&metric).map_or(0, Vec::len)
    }
}

/// Metrics handler that keeps everything in memory
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    inner: Mutex<MetricsSnapshot>,
}

impl InMemoryMetrics {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything collected so far
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().clone()
    }

    /// Counter total, zero if never reported
    pub fn count(&self, metric: Metric) -> u64 {
        self.inner.lock().count(metric)
    }

    /// Drop everything collected so far
    pub fn reset(&self) {
        *self.inner.lock() = MetricsSnapshot::default();
    }
}

impl MetricsEffects for InMemoryMetrics {
    fn report(&self, metric: Metric, value: MetricValue) {
        let mut inner = self.inner.lock();
        match value {
            MetricValue::Count(n) => *inner.counters.entry(metric).or_insert(0) += n,
            MetricValue::Duration(d) => inner.durations.entry(metric).or_default().push(d),
        }
    }

    fn report_data_sent(&self, bytes: u64) {
        self.inner.lock().data_sent += bytes;
    }

    fn report_data_received(&self, bytes: u64) {
        self.inner.lock().data_received += bytes;
    }
}
