//! Effect traits for the collaborators the core depends on
//!
//! - [`StoreEffects`]: network parameters and object streams
//! - [`MetricsEffects`]: transfer counters, durations and byte totals
//!
//! Handlers live in `objload-effects`; production RPC bindings implement the
//! same traits outside this workspace.

pub mod metrics;
pub mod store;

pub use metrics::{Metric, MetricValue, MetricsEffects, NoopMetrics};
pub use store::{GetStream, PutStream, StoreEffects};
