//! # objload core - object construction and authorization
//!
//! **Purpose**: Build objects the store will accept and authorize every
//! operation against it.
//!
//! # Architecture Constraints
//!
//! - YES pure object, checksum, identity and session logic
//! - YES effect traits for the store and the metrics sink
//! - NO handler implementations (those live in `objload-effects`)
//! - NO transfer loop or caller surface (that's `objload-client`)
//!
//! ## Core Concepts
//!
//! - **Checksums**: SHA-256 plus the Tillich-Zémor homomorphic hash
//! - **Two-phase objects**: a header is built once per payload and finalized
//!   per attribute set into an identified, signed [`Object`]
//! - **Session scoping**: one token per operation, bound to a verb and target
//! - **Network parameters**: size limit, epoch and hashing policy fetched on
//!   demand from the store

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Payload checksum engine
pub mod checksum;

/// Client configuration
pub mod config;

/// Store and metrics effect traits
pub mod effects;

/// Unified error type
pub mod errors;

/// Network parameter resolution
pub mod network;

/// Object header, identity and signature
pub mod object;

/// Verb- and target-scoped session tokens
pub mod session;

/// Identifier types
pub mod types;

pub use checksum::{Checksum, PayloadChecksums, TzDigest};
pub use config::{ChunkSize, ClientConfig, DEFAULT_CHUNK_SIZE};
pub use effects::{
    GetStream, Metric, MetricValue, MetricsEffects, NoopMetrics, PutStream, StoreEffects,
};
pub use errors::{ErrorKind, LoadError, Result};
pub use network::{NetworkInfo, NetworkParameters};
pub use object::{build_header, Attribute, Object, ObjectHeader, ObjectSignature, ObjectType};
pub use session::{Lifetime, SessionAuthorizer, SessionTemplate, SessionToken, Verb};
pub use types::{Address, ContainerId, ObjectId, OwnerId};

pub use ed25519_dalek::{SigningKey, VerifyingKey};
pub use tokio_util::sync::CancellationToken;
