//! Metrics handlers

pub mod memory;
pub mod tracing;

pub use memory::{InMemoryMetrics, MetricsSnapshot};
pub use tracing::{MetricsConfig, TracingMetricsHandler};
