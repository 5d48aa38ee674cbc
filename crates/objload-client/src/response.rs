//! Operation results handed back to the host runtime

use objload_core::{ErrorKind, LoadError, ObjectId, Result};
use serde::Serialize;

/// Outcome of a PUT
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutResponse {
    /// Whether the store accepted the object
    pub success: bool,
    /// Identifier of the stored object
    pub object_id: Option<String>,
    /// Failure description
    pub error: Option<String>,
    /// Failure classification
    pub error_kind: Option<ErrorKind>,
}

impl PutResponse {
    pub(crate) fn stored(id: ObjectId) -> Self {
        Self {
            success: true,
            object_id: Some(id.to_string()),
            error: None,
            error_kind: None,
        }
    }

    pub(crate) fn failed(err: &LoadError) -> Self {
        Self {
            success: false,
            object_id: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }

    /// Fold an operation result; precondition failures stay errors
    pub(crate) fn from_result(result: Result<ObjectId>) -> Result<Self> {
        match result {
            Ok(id) => Ok(Self::stored(id)),
            Err(e) if e.is_precondition() => Err(e),
            Err(e) => Ok(Self::failed(&e)),
        }
    }
}

/// Outcome of a GET
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetResponse {
    /// Whether the payload was read to the end
    pub success: bool,
    /// Payload bytes read
    pub bytes_received: u64,
    /// Failure description
    pub error: Option<String>,
    /// Failure classification
    pub error_kind: Option<ErrorKind>,
}

impl GetResponse {
    pub(crate) fn from_result(result: Result<u64>) -> Result<Self> {
        match result {
            Ok(bytes_received) => Ok(Self {
                success: true,
                bytes_received,
                error: None,
                error_kind: None,
            }),
            Err(e) if e.is_precondition() => Err(e),
            Err(e) => Ok(Self {
                success: false,
                bytes_received: 0,
                error: Some(e.to_string()),
                error_kind: Some(e.kind()),
            }),
        }
    }
}
