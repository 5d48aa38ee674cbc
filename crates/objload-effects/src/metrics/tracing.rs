//! Tracing Metrics Handler
//!
//! Stateless sink that forwards every sample to `tracing`. Pair it with a
//! subscriber or an external exporter; it keeps no counters itself.

use objload_core::{Metric, MetricValue, MetricsEffects};

/// Configuration for metrics emission
#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    /// Whether duration samples are emitted
    pub enable_durations: bool,
}

/// Metrics handler that logs samples as structured events
#[derive(Debug, Clone, Default)]
pub struct TracingMetricsHandler {
    config: MetricsConfig,
}

impl TracingMetricsHandler {
    /// Create a new tracing metrics handler
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Create with durations enabled
    pub fn with_defaults() -> Self {
        Self::new(MetricsConfig {
            enable_durations: true,
        })
    }
}

impl MetricsEffects for TracingMetricsHandler {
    fn report(&self, metric: Metric, value: MetricValue) {
        match value {
            MetricValue::Count(count) => {
                tracing::debug!(metric_name = metric.name(), value = count, "counter incremented");
            }
            MetricValue::Duration(elapsed) if self.config.enable_durations => {
                tracing::debug!(
                    metric_name = metric.name(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "duration observed"
                );
            }
            MetricValue::Duration(_) => {}
        }
    }

    fn report_data_sent(&self, bytes: u64) {
        tracing::debug!(bytes, "payload data sent");
    }

    fn report_data_received(&self, bytes: u64) {
        tracing::debug!(bytes, "payload data received");
    }
}
