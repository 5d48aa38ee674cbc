//! Caller-facing client
//!
//! One [`Client`] per identity. It holds only read-only state (key, session
//! template, chunk size, metrics handle), so a shared reference can drive
//! any number of concurrent operations.

use crate::engine::{Transfer, TransferEngine};
use crate::prepared::PreparedObject;
use crate::response::{GetResponse, PutResponse};
use objload_core::network::{self, NetworkParameters};
use objload_core::{
    build_header, Address, Attribute, ChunkSize, ClientConfig, ContainerId, MetricsEffects,
    ObjectHeader, ObjectId, OwnerId, PayloadChecksums, Result, SessionAuthorizer,
    SessionTemplate, SigningKey, StoreEffects, Verb,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-operation cancellation: a child of the client's root token, cancelled
/// at the deadline when one is configured
#[derive(Debug, Clone)]
pub(crate) struct OperationScope {
    root: CancellationToken,
    timeout: Option<Duration>,
}

impl OperationScope {
    pub(crate) async fn run<F, Fut>(&self, op: F) -> Fut::Output
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future,
    {
        let cancel = self.root.child_token();
        let fut = op(cancel.clone());
        let Some(timeout) = self.timeout else {
            return fut.await;
        };

        tokio::pin!(fut);
        tokio::select! {
            out = &mut fut => return out,
            () = tokio::time::sleep(timeout) => {
                tracing::debug!(timeout_ms = timeout.as_millis() as u64, "operation deadline reached");
                cancel.cancel();
            }
        }
        fut.await
    }
}

/// Build the header shared by every object created from one payload
pub(crate) fn prepare_header(
    params: &NetworkParameters,
    container: ContainerId,
    owner: OwnerId,
    payload: &[u8],
) -> Result<ObjectHeader> {
    let size = payload.len() as u64;
    params.check_payload_size(size)?;
    let checksums = PayloadChecksums::compute(payload, !params.homomorphic_hashing_disabled);
    Ok(build_header(
        container,
        owner,
        size,
        params.current_epoch,
        checksums,
    ))
}

/// Load-generation client bound to one store and one identity
pub struct Client<S: StoreEffects> {
    store: Arc<S>,
    signing_key: SigningKey,
    owner: OwnerId,
    authorizer: SessionAuthorizer,
    engine: TransferEngine,
    scope: OperationScope,
    verify_get_payload: bool,
}

impl<S: StoreEffects> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("owner", &self.owner)
            .field("engine", &self.engine)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl<S: StoreEffects> Client<S> {
    /// Create a client; the config is validated first
    pub fn new(
        store: Arc<S>,
        signing_key: SigningKey,
        template: SessionTemplate,
        config: ClientConfig,
        metrics: Arc<dyn MetricsEffects>,
    ) -> Result<Self> {
        config.validate()?;
        let owner = OwnerId::from_public_key(&signing_key.verifying_key());
        let authorizer = SessionAuthorizer::new(signing_key.clone(), template);
        tracing::debug!(%owner, buffer_size = config.buffer_size, "created load client");
        Ok(Self {
            store,
            signing_key,
            owner,
            authorizer,
            engine: TransferEngine::new(config.chunk_size()?, metrics),
            scope: OperationScope {
                root: CancellationToken::new(),
                timeout: config.operation_timeout(),
            },
            verify_get_payload: config.verify_get_payload,
        })
    }

    /// Set the streaming chunk size; 0 selects 64 KiB, negative is rejected
    pub fn set_buffer_size(&mut self, size: i64) -> Result<()> {
        let chunk_size = ChunkSize::from_setting(size)?;
        self.engine.set_chunk_size(chunk_size);
        Ok(())
    }

    /// Current streaming chunk size
    pub fn buffer_size(&self) -> ChunkSize {
        self.engine.chunk_size()
    }

    /// Owner id derived from the signing key
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Root cancellation token; cancelling it aborts every in-flight operation
    pub fn cancellation_token(&self) -> CancellationToken {
        self.scope.root.clone()
    }

    /// Build, sign and upload an object in one call
    ///
    /// Every call counts as one PUT attempt, and any failure, including a
    /// precondition failure, counts once as a failed PUT.
    pub async fn put<I, A>(&self, container: &str, attributes: I, payload: &[u8]) -> Result<PutResponse>
    where
        I: IntoIterator<Item = A>,
        A: Into<Attribute>,
    {
        let attempt = async {
            let container: ContainerId = container.parse()?;
            let attributes: Vec<Attribute> = attributes.into_iter().map(Into::into).collect();
            self.scope
                .run(|cancel| async move {
                    let params = network::resolve(self.store.as_ref(), &cancel).await?;
                    let header = prepare_header(&params, container, self.owner, payload)?;
                    let object = header.finalize(attributes, &self.signing_key)?;
                    let token = self.authorizer.scope(Verb::Put, Address::container(container))?;
                    self.engine
                        .put(self.store.as_ref(), &object, payload, Some(&token), &cancel)
                        .await
                })
                .await
        };
        PutResponse::from_result(self.engine.track(Transfer::Put, attempt).await)
    }

    /// Download an object and count its payload
    ///
    /// Counted like [`Client::put`]: one GET attempt per call, one failed GET
    /// for any failure.
    pub async fn get(&self, container: &str, object: &str) -> Result<GetResponse> {
        let attempt = async {
            let container: ContainerId = container.parse()?;
            let object: ObjectId = object.parse()?;
            let token = self
                .authorizer
                .scope(Verb::Get, Address::object(container, object))?;
            self.scope
                .run(|cancel| async move {
                    self.engine
                        .get(
                            self.store.as_ref(),
                            container,
                            object,
                            Some(&token),
                            &cancel,
                            self.verify_get_payload,
                        )
                        .await
                        .map(|outcome| outcome.bytes_received)
                })
                .await
        };
        GetResponse::from_result(self.engine.track(Transfer::Get, attempt).await)
    }

    /// Compute checksums and the header once for repeated uploads of `payload`
    pub async fn prepare(
        &self,
        container: &str,
        payload: impl Into<Arc<[u8]>>,
    ) -> Result<PreparedObject<S>> {
        let container: ContainerId = container.parse()?;
        let payload: Arc<[u8]> = payload.into();
        let header = self
            .scope
            .run(|cancel| async move {
                let params = network::resolve(self.store.as_ref(), &cancel).await?;
                prepare_header(&params, container, self.owner, &payload).map(|h| (h, payload))
            })
            .await;
        let (header, payload) = header?;
        tracing::debug!(%container, size = payload.len(), "prepared object header");
        Ok(PreparedObject::new(
            Arc::clone(&self.store),
            self.signing_key.clone(),
            self.engine.clone(),
            self.scope.clone(),
            header,
            payload,
        ))
    }
}
