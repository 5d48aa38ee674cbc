//! Store handlers

pub mod memory;

pub use memory::{FaultPlan, InMemoryStore, MemoryGetStream, MemoryPutStream, StoreConfig, StoreStats};
