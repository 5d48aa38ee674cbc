//! # objload effects - store and metrics handlers
//!
//! **Purpose**: Implementations of the effect traits declared in
//! `objload-core`.
//!
//! # Architecture Constraints
//!
//! - YES single-party handlers for [`objload_core::StoreEffects`] and
//!   [`objload_core::MetricsEffects`]
//! - YES fault injection for exercising failure paths
//! - NO transfer orchestration (that's `objload-client`)
//!
//! ## Handlers
//!
//! - [`InMemoryStore`]: validating simulated store with scripted faults
//! - [`InMemoryMetrics`]: collector readable from tests and summaries
//! - [`TracingMetricsHandler`]: forwards samples to `tracing`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Metrics handlers
pub mod metrics;

/// Store handlers
pub mod store;

pub use metrics::{InMemoryMetrics, MetricsConfig, MetricsSnapshot, TracingMetricsHandler};
pub use store::{FaultPlan, InMemoryStore, StoreConfig, StoreStats};
