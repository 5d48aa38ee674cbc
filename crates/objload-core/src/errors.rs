//! Unified error type for objload operations
//!
//! Every failure a PUT, GET or prepare call can produce is a variant of
//! [`LoadError`]. Precondition failures (configuration, authorization,
//! parameter resolution, size limits, identity) are detected before any
//! stream is opened; transport failures and cancellations happen mid-flight
//! and are folded into response values by the client.

use serde::{Deserialize, Serialize};

/// Unified error type for all objload operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Bad caller-supplied configuration or identifiers
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the invalid setting or input
        message: String,
    },

    /// Session token scoping or signing failed
    #[error("Authorization error: {message}")]
    Authorization {
        /// Description of the authorization failure
        message: String,
    },

    /// A network parameter required for object construction is absent
    #[error("Network configuration misses required parameter {key}")]
    MissingRequiredParameter {
        /// Parameter key
        key: String,
    },

    /// A network parameter could not be decoded
    #[error("Malformed network parameter {key}: {reason}")]
    MalformedParameter {
        /// Parameter key
        key: String,
        /// Decode failure
        reason: String,
    },

    /// Payload exceeds the network object size limit
    #[error("Payload size {size} is bigger than network limit {limit}")]
    PayloadTooLarge {
        /// Observed payload length in bytes
        size: u64,
        /// Resolved maximum object size
        limit: u64,
    },

    /// Canonical encoding or identifier hashing failed
    #[error("Identity computation failed: {message}")]
    IdentityComputation {
        /// Description of the encoding failure
        message: String,
    },

    /// Object signature could not be produced
    #[error("Signature error: {message}")]
    Signature {
        /// Description of the signing failure
        message: String,
    },

    /// Received payload does not match the header checksum
    #[error("Checksum mismatch: {message}")]
    ChecksumMismatch {
        /// Mismatch details
        message: String,
    },

    /// Stream open, write, read or close failure
    #[error("Transport error: {message}")]
    Transport {
        /// Human-readable description from the store or stream
        message: String,
    },

    /// The operation was aborted by an external cancellation signal
    #[error("Operation '{operation}' cancelled")]
    Cancelled {
        /// Stage the operation was in when cancelled
        operation: String,
    },
}

/// Coarse error classification for callers that tally outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`LoadError::Configuration`]
    Configuration,
    /// See [`LoadError::Authorization`]
    Authorization,
    /// Missing or malformed network parameters
    ParameterResolution,
    /// See [`LoadError::PayloadTooLarge`]
    PayloadTooLarge,
    /// See [`LoadError::IdentityComputation`]
    IdentityComputation,
    /// See [`LoadError::Signature`]
    Signature,
    /// See [`LoadError::ChecksumMismatch`]
    ChecksumMismatch,
    /// See [`LoadError::Transport`]
    Transport,
    /// See [`LoadError::Cancelled`]
    Cancellation,
}

impl LoadError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing_parameter(key: impl Into<String>) -> Self {
        Self::MissingRequiredParameter { key: key.into() }
    }

    /// Create a malformed parameter error
    pub fn malformed_parameter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a payload size error
    pub fn payload_too_large(size: u64, limit: u64) -> Self {
        Self::PayloadTooLarge { size, limit }
    }

    /// Create an identity computation error
    pub fn identity(message: impl Into<String>) -> Self {
        Self::IdentityComputation {
            message: message.into(),
        }
    }

    /// Create a signature error
    pub fn signature(message: impl Into<String>) -> Self {
        Self::Signature {
            message: message.into(),
        }
    }

    /// Create a checksum mismatch error
    pub fn checksum_mismatch(message: impl Into<String>) -> Self {
        Self::ChecksumMismatch {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a cancellation error for the given stage
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::MissingRequiredParameter { .. } | Self::MalformedParameter { .. } => {
                ErrorKind::ParameterResolution
            }
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::IdentityComputation { .. } => ErrorKind::IdentityComputation,
            Self::Signature { .. } => ErrorKind::Signature,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Cancelled { .. } => ErrorKind::Cancellation,
        }
    }

    /// Whether the error is detected before any stream is opened
    pub fn is_precondition(&self) -> bool {
        !matches!(
            self,
            Self::Transport { .. } | Self::Cancelled { .. } | Self::ChecksumMismatch { .. }
        )
    }

    /// Whether the operation was aborted rather than rejected
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Standard Result type for objload operations
pub type Result<T> = std::result::Result<T, LoadError>;

impl From<toml::de::Error> for LoadError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("invalid config: {err}"))
    }
}
