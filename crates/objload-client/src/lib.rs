//! # objload client - load generation against an object store
//!
//! **Purpose**: Caller-facing PUT, GET and two-phase prepare/put operations
//! built on the object and session primitives of `objload-core`.
//!
//! # Architecture Constraints
//!
//! - YES chunked streaming with bounded memory and cancellation
//! - YES per-operation session scoping and metrics reporting
//! - NO retries (a failed attempt is reported once and returned)
//! - NO store or metrics implementations (those live in `objload-effects`)
//!
//! ## Error surface
//!
//! Precondition failures (bad identifiers, parameter resolution, size limit,
//! identity or signing) return `Err`. Transport failures and cancellations
//! return a response with `success == false` and an [`objload_core::ErrorKind`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;

/// Chunked PUT/GET stream driver
pub mod engine;

mod prepared;

/// Serializable operation results
pub mod response;

pub use client::Client;
pub use engine::{GetOutcome, GetState, PutState, Transfer, TransferEngine};
pub use prepared::PreparedObject;
pub use response::{GetResponse, PutResponse};
