//! Two-phase objects: prepare once, upload many times
//!
//! The expensive part of building an object (checksums, header) happens in
//! [`Client::prepare`](crate::Client::prepare). Each [`PreparedObject::put`]
//! only attaches attributes, derives a fresh id and streams the shared
//! payload, so distinct attribute sets yield distinct objects with identical
//! checksums.

use crate::client::OperationScope;
use crate::engine::{Transfer, TransferEngine};
use crate::response::PutResponse;
use objload_core::{Attribute, ObjectHeader, Result, SigningKey, StoreEffects};
use std::sync::Arc;

/// A payload with checksums and header computed, ready to be uploaded
pub struct PreparedObject<S: StoreEffects> {
    store: Arc<S>,
    signing_key: SigningKey,
    engine: TransferEngine,
    scope: OperationScope,
    header: Arc<ObjectHeader>,
    payload: Arc<[u8]>,
}

impl<S: StoreEffects> Clone for PreparedObject<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            signing_key: self.signing_key.clone(),
            engine: self.engine.clone(),
            scope: self.scope.clone(),
            header: Arc::clone(&self.header),
            payload: Arc::clone(&self.payload),
        }
    }
}

impl<S: StoreEffects> std::fmt::Debug for PreparedObject<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedObject")
            .field("header", &self.header)
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

impl<S: StoreEffects> PreparedObject<S> {
    pub(crate) fn new(
        store: Arc<S>,
        signing_key: SigningKey,
        engine: TransferEngine,
        scope: OperationScope,
        header: ObjectHeader,
        payload: Arc<[u8]>,
    ) -> Self {
        Self {
            store,
            signing_key,
            engine,
            scope,
            header: Arc::new(header),
            payload,
        }
    }

    /// Header shared by every object uploaded from this preparation
    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    /// Payload length in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Finalize a new object with `attributes` and upload it
    ///
    /// No session token is attached; the store authorizes the upload by the
    /// object signature alone. Counted as one PUT attempt, failed if
    /// finalization or the upload fails.
    pub async fn put<I, A>(&self, attributes: I) -> Result<PutResponse>
    where
        I: IntoIterator<Item = A>,
        A: Into<Attribute>,
    {
        let attempt = async {
            let object = self.header.finalize(attributes, &self.signing_key)?;
            self.scope
                .run(|cancel| async move {
                    self.engine
                        .put(self.store.as_ref(), &object, &self.payload, None, &cancel)
                        .await
                })
                .await
        };
        PutResponse::from_result(self.engine.track(Transfer::Put, attempt).await)
    }
}
