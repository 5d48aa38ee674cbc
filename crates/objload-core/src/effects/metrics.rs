//! Metrics effect trait definitions
//!
//! Reporting is fire-and-forget: implementations must not block and have no
//! way to fail a transfer.

use std::fmt;
use std::time::Duration;

/// Transfer metrics emitted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// PUT attempts
    PutTotal,
    /// Failed PUT attempts
    PutFails,
    /// Successful PUT wall-clock duration
    PutDuration,
    /// GET attempts
    GetTotal,
    /// Failed GET attempts
    GetFails,
    /// Successful GET wall-clock duration
    GetDuration,
}

impl Metric {
    /// Exported metric name
    pub fn name(self) -> &'static str {
        match self {
            Self::PutTotal => "obj_put_total",
            Self::PutFails => "obj_put_fails",
            Self::PutDuration => "obj_put_duration",
            Self::GetTotal => "obj_get_total",
            Self::GetFails => "obj_get_fails",
            Self::GetDuration => "obj_get_duration",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sample value for a metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Counter increment
    Count(u64),
    /// Duration sample
    Duration(Duration),
}

/// Sink for transfer metrics
pub trait MetricsEffects: Send + Sync {
    /// Record a counter increment or duration sample
    fn report(&self, metric: Metric, value: MetricValue);

    /// Record payload bytes uploaded
    fn report_data_sent(&self, bytes: u64);

    /// Record payload bytes downloaded
    fn report_data_received(&self, bytes: u64);
}

/// Metrics sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsEffects for NoopMetrics {
    fn report(&self, _metric: Metric, _value: MetricValue) {}

    fn report_data_sent(&self, _bytes: u64) {}

    fn report_data_received(&self, _bytes: u64) {}
}
