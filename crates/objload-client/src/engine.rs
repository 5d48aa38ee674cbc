//! Transfer Engine
//!
//! Drives one PUT or GET stream from open to close. Every store call races
//! the caller's cancellation token, chunks go out strictly in offset order,
//! and memory use is bounded by the chunk size.

use objload_core::checksum::TzHasher;
use objload_core::{
    Address, ChunkSize, ContainerId, GetStream, LoadError, Metric, MetricValue, MetricsEffects,
    Object, ObjectId, PutStream, Result, SessionToken, StoreEffects,
};
use sha2::{Digest, Sha256};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Upload state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutState {
    /// Nothing sent yet
    Idle,
    /// Stream open
    Opened,
    /// Header accepted
    HeaderWritten,
    /// Payload chunks in flight
    Streaming,
    /// Stream closed
    Closed {
        /// Whether the upload succeeded
        success: bool,
    },
}

/// Download state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetState {
    /// Nothing requested yet
    Idle,
    /// Stream open
    Opened,
    /// Header received
    HeaderRead,
    /// Payload chunks in flight
    Streaming,
    /// Stream closed
    Closed {
        /// Whether the download succeeded
        success: bool,
    },
}

impl fmt::Display for PutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Opened => f.write_str("opened"),
            Self::HeaderWritten => f.write_str("header-written"),
            Self::Streaming => f.write_str("streaming"),
            Self::Closed { success: true } => f.write_str("closed-success"),
            Self::Closed { success: false } => f.write_str("closed-failed"),
        }
    }
}

impl fmt::Display for GetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Opened => f.write_str("opened"),
            Self::HeaderRead => f.write_str("header-read"),
            Self::Streaming => f.write_str("streaming"),
            Self::Closed { success: true } => f.write_str("closed-success"),
            Self::Closed { success: false } => f.write_str("closed-failed"),
        }
    }
}

/// Kind of transfer an attempt is counted under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Upload
    Put,
    /// Download
    Get,
}

impl Transfer {
    fn total(self) -> Metric {
        match self {
            Self::Put => Metric::PutTotal,
            Self::Get => Metric::GetTotal,
        }
    }

    fn fails(self) -> Metric {
        match self {
            Self::Put => Metric::PutFails,
            Self::Get => Metric::GetFails,
        }
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put => f.write_str("put"),
            Self::Get => f.write_str("get"),
        }
    }
}

/// Result of a completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOutcome {
    /// Header as served by the store
    pub header: Object,
    /// Payload bytes read
    pub bytes_received: u64,
}

/// Await `fut` unless `cancel` fires first
async fn race<F: Future>(cancel: &CancellationToken, stage: &'static str, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LoadError::cancelled(stage)),
        out = fut => Ok(out),
    }
}

/// Chunked streaming engine shared by every operation of a client
#[derive(Clone)]
pub struct TransferEngine {
    chunk_size: ChunkSize,
    metrics: Arc<dyn MetricsEffects>,
}

impl fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferEngine")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl TransferEngine {
    /// Create an engine streaming in chunks of `chunk_size`
    pub fn new(chunk_size: ChunkSize, metrics: Arc<dyn MetricsEffects>) -> Self {
        Self {
            chunk_size,
            metrics,
        }
    }

    /// Configured chunk size
    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// Replace the chunk size for subsequent transfers
    pub fn set_chunk_size(&mut self, chunk_size: ChunkSize) {
        self.chunk_size = chunk_size;
    }

    /// Run one attempt of `transfer`, counting it once in the total and, if
    /// it fails at any stage, once in the failure counter
    pub async fn track<T, F>(&self, transfer: Transfer, attempt: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.metrics.report(transfer.total(), MetricValue::Count(1));
        let result = attempt.await;
        if let Err(e) = &result {
            self.metrics.report(transfer.fails(), MetricValue::Count(1));
            tracing::debug!(%transfer, error = %e, kind = ?e.kind(), "attempt failed");
        }
        result
    }

    /// Upload `object` with `payload`, returning the id the store assigned
    ///
    /// Reports duration (open to close) and bytes sent on success. Attempt
    /// and failure counters belong to [`TransferEngine::track`].
    pub async fn put<S>(
        &self,
        store: &S,
        object: &Object,
        payload: &[u8],
        session: Option<&SessionToken>,
        cancel: &CancellationToken,
    ) -> Result<ObjectId>
    where
        S: StoreEffects + ?Sized,
    {
        let result = self.put_stream(store, object, payload, session, cancel).await;
        let state = PutState::Closed {
            success: result.is_ok(),
        };
        tracing::trace!(object = %object.id(), %state, "put state");
        let (id, elapsed) = result?;
        self.metrics
            .report(Metric::PutDuration, MetricValue::Duration(elapsed));
        self.metrics.report_data_sent(payload.len() as u64);
        tracing::debug!(object = %id, bytes = payload.len(), "put completed");
        Ok(id)
    }

    async fn put_stream<S>(
        &self,
        store: &S,
        object: &Object,
        payload: &[u8],
        session: Option<&SessionToken>,
        cancel: &CancellationToken,
    ) -> Result<(ObjectId, Duration)>
    where
        S: StoreEffects + ?Sized,
    {
        let id = object.id();
        tracing::trace!(object = %id, state = %PutState::Idle, "put state");

        let mut stream = race(cancel, "put open", store.open_put_stream(session)).await??;
        let opened = Instant::now();
        tracing::trace!(object = %id, state = %PutState::Opened, "put state");

        if !race(cancel, "put header", stream.write_header(object)).await? {
            tracing::warn!(object = %id, "store rejected object header");
            return Err(close_rejected(stream, cancel, "header").await);
        }
        tracing::trace!(object = %id, state = %PutState::HeaderWritten, "put state");

        if !payload.is_empty() {
            tracing::trace!(object = %id, state = %PutState::Streaming, "put state");
        }
        for (index, chunk) in payload.chunks(self.chunk_size.get()).enumerate() {
            if !race(cancel, "put chunk", stream.write_chunk(chunk)).await? {
                tracing::warn!(object = %id, chunk = index, "store rejected payload chunk");
                return Err(close_rejected(stream, cancel, "payload chunk").await);
            }
        }

        let stored = race(cancel, "put close", stream.close()).await??;
        Ok((stored, opened.elapsed()))
    }

    /// Download the object at `container`/`object`, counting its payload
    ///
    /// With `verify` set, streamed bytes are hashed and checked against the
    /// header checksums. Reports duration (open to close) and bytes received
    /// on success.
    pub async fn get<S>(
        &self,
        store: &S,
        container: ContainerId,
        object: ObjectId,
        session: Option<&SessionToken>,
        cancel: &CancellationToken,
        verify: bool,
    ) -> Result<GetOutcome>
    where
        S: StoreEffects + ?Sized,
    {
        let address = Address::object(container, object);
        let result = self.get_stream(store, &address, session, cancel, verify).await;
        let state = GetState::Closed {
            success: result.is_ok(),
        };
        tracing::trace!(%address, %state, "get state");
        let (outcome, elapsed) = result?;
        self.metrics
            .report(Metric::GetDuration, MetricValue::Duration(elapsed));
        self.metrics.report_data_received(outcome.bytes_received);
        tracing::debug!(%address, bytes = outcome.bytes_received, "get completed");
        Ok(outcome)
    }

    async fn get_stream<S>(
        &self,
        store: &S,
        address: &Address,
        session: Option<&SessionToken>,
        cancel: &CancellationToken,
        verify: bool,
    ) -> Result<(GetOutcome, Duration)>
    where
        S: StoreEffects + ?Sized,
    {
        tracing::trace!(%address, state = %GetState::Idle, "get state");
        let mut stream = race(cancel, "get open", store.open_get_stream(address, session)).await??;
        let opened = Instant::now();
        tracing::trace!(%address, state = %GetState::Opened, "get state");

        let Some(header) = race(cancel, "get header", stream.read_header()).await? else {
            tracing::warn!(%address, "object header unavailable");
            return Err(match race(cancel, "get close", stream.close()).await? {
                Ok(()) => LoadError::transport(format!("header of {address} unavailable")),
                Err(e) => e,
            });
        };
        tracing::trace!(%address, state = %GetState::HeaderRead, "get state");

        let mut verifier = verify.then(|| PayloadVerifier::new(&header));
        let mut buf = vec![0u8; self.chunk_size.get()];
        let mut received = 0u64;
        tracing::trace!(%address, state = %GetState::Streaming, "get state");
        loop {
            match race(cancel, "get chunk", stream.read_chunk(&mut buf)).await? {
                Ok(0) => break,
                Ok(n) if n > buf.len() => {
                    tracing::warn!(%address, n, buffer = buf.len(), "read overran buffer");
                    // The close outcome is dropped; the overrun is the failure.
                    let _ = race(cancel, "get close", stream.close()).await;
                    return Err(LoadError::transport(format!(
                        "stream reported {n} bytes read into a {}-byte buffer",
                        buf.len()
                    )));
                }
                Ok(n) => {
                    received += n as u64;
                    if let Some(v) = verifier.as_mut() {
                        v.update(&buf[..n]);
                    }
                }
                Err(e) => {
                    if let Ok(Err(close_err)) = race(cancel, "get close", stream.close()).await {
                        tracing::trace!(%address, error = %close_err, "close after read failure");
                    }
                    return Err(e);
                }
            }
        }

        race(cancel, "get close", stream.close()).await??;

        if let Some(v) = verifier {
            v.check(received)?;
        }
        Ok((
            GetOutcome {
                header,
                bytes_received: received,
            },
            opened.elapsed(),
        ))
    }
}

/// Close a stream whose header or chunk was rejected and report why
async fn close_rejected<P: PutStream>(
    stream: P,
    cancel: &CancellationToken,
    what: &str,
) -> LoadError {
    match race(cancel, "put close", stream.close()).await {
        Ok(Ok(id)) => LoadError::transport(format!(
            "store rejected {what} but closed the stream for {id}"
        )),
        Ok(Err(e)) | Err(e) => e,
    }
}

/// Incremental checksum verification of a downloaded payload
struct PayloadVerifier {
    expected_size: u64,
    expected_sha256: [u8; 32],
    sha256: Sha256,
    homomorphic: Option<(TzHasher, objload_core::TzDigest)>,
}

impl PayloadVerifier {
    fn new(header: &Object) -> Self {
        let h = header.header();
        Self {
            expected_size: h.payload_size(),
            expected_sha256: h.checksums().sha256,
            sha256: Sha256::new(),
            homomorphic: h.checksums().homomorphic.map(|d| (TzHasher::new(), d)),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        self.sha256.update(chunk);
        if let Some((hasher, _)) = self.homomorphic.as_mut() {
            hasher.update(chunk);
        }
    }

    fn check(self, received: u64) -> Result<()> {
        if received != self.expected_size {
            return Err(LoadError::checksum_mismatch(format!(
                "received {received} bytes, header declares {}",
                self.expected_size
            )));
        }
        let actual: [u8; 32] = self.sha256.finalize().into();
        if actual != self.expected_sha256 {
            return Err(LoadError::checksum_mismatch("payload SHA-256 differs from header"));
        }
        if let Some((hasher, expected)) = self.homomorphic {
            if hasher.finalize() != expected {
                return Err(LoadError::checksum_mismatch(
                    "payload homomorphic hash differs from header",
                ));
            }
        }
        Ok(())
    }
}
