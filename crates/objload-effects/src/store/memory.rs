//! In-Memory Store Handler
//!
//! Simulated object store for tests and dry runs. It performs the checks a
//! real store performs on upload (identity, signature, session scope,
//! checksums, size limit) and supports scripted faults.

use async_trait::async_trait;
use objload_core::checksum::{sha256, tz};
use objload_core::network::{HOMOMORPHIC_HASHING_DISABLED_KEY, MAX_OBJECT_SIZE_KEY};
use objload_core::{
    Address, GetStream, LoadError, NetworkInfo, Object, ObjectId, OwnerId, PutStream, Result,
    SessionToken, StoreEffects, Verb,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

/// Network settings the simulated store publishes and enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Largest accepted payload
    pub max_object_size: u64,
    /// Current epoch
    pub epoch: u64,
    /// Whether objects must omit the homomorphic checksum
    pub homomorphic_hashing_disabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_object_size: 64 * 1024 * 1024,
            epoch: 1,
            homomorphic_hashing_disabled: false,
        }
    }
}

/// Scripted misbehavior
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Network info queries fail
    pub fail_network_info: bool,
    /// Stream opens fail
    pub fail_open: bool,
    /// Every upload header is rejected
    pub reject_header: bool,
    /// Upload chunk with this index is rejected
    pub reject_chunk_at: Option<usize>,
    /// Close reports success even after a rejected chunk
    pub accept_after_rejected_chunk: bool,
    /// Upload chunk with this index never completes
    pub stall_at_chunk: Option<usize>,
    /// Download read with this index fails
    pub fail_read_at_chunk: Option<usize>,
    /// Download read with this index never completes
    pub stall_at_read: Option<usize>,
    /// Download reads claim one byte more than the buffer holds
    pub overstate_read_len: bool,
    /// Download headers cannot be read
    pub drop_header_on_get: bool,
    /// Downloads return a corrupted first byte
    pub corrupt_payload_on_get: bool,
}

/// Counters describing what the store has seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Payload chunks accepted across all uploads
    pub chunks_written: usize,
    /// Largest single chunk received
    pub largest_chunk: usize,
    /// Largest read buffer offered by a download
    pub largest_read_buffer: usize,
    /// Uploads that completed successfully
    pub objects_stored: usize,
}

#[derive(Debug, Clone)]
struct StoredObject {
    object: Object,
    payload: Arc<[u8]>,
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<Address, StoredObject>,
    stats: StoreStats,
}

/// In-memory store handler
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    config: StoreConfig,
    faults: FaultPlan,
    raw_parameters: Option<Vec<(Vec<u8>, Vec<u8>)>>,
    state: Arc<RwLock<StoreState>>,
    stalled: Arc<Notify>,
}

impl InMemoryStore {
    /// Create new in-memory store
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            faults: FaultPlan::default(),
            raw_parameters: None,
            state: Arc::new(RwLock::new(StoreState::default())),
            stalled: Arc::new(Notify::new()),
        }
    }

    /// Apply a fault plan
    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Publish these raw parameters instead of the ones derived from the config
    pub fn with_raw_parameters(mut self, parameters: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        self.raw_parameters = Some(parameters);
        self
    }

    /// Enforced settings
    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Snapshot of the store counters
    pub async fn stats(&self) -> StoreStats {
        self.state.read().await.stats.clone()
    }

    /// Stored header for `address`
    pub async fn object(&self, address: &Address) -> Option<Object> {
        let state = self.state.read().await;
        state.objects.get(address).map(|s| s.object.clone())
    }

    /// Stored payload for `address`
    pub async fn payload(&self, address: &Address) -> Option<Vec<u8>> {
        let state = self.state.read().await;
        state.objects.get(address).map(|s| s.payload.to_vec())
    }

    /// Resolves once a transfer reaches the stalled chunk
    pub async fn wait_for_stall(&self) {
        self.stalled.notified().await;
    }

    fn check_header(&self, object: &Object, session: Option<&SessionToken>) -> Result<()> {
        object.verify()?;
        let header = object.header();
        let signer = OwnerId::from_public_key(&object.signature().public_key);
        match session {
            Some(token) => {
                token.verify(
                    Verb::Put,
                    &Address::container(header.container()),
                    self.config.epoch,
                )?;
                if token.issuer() != header.owner() {
                    return Err(LoadError::authorization(
                        "object owner differs from session issuer",
                    ));
                }
            }
            None if signer != header.owner() => {
                return Err(LoadError::authorization("object owner differs from signer"));
            }
            None => {}
        }
        if header.payload_size() > self.config.max_object_size {
            return Err(LoadError::payload_too_large(
                header.payload_size(),
                self.config.max_object_size,
            ));
        }
        if header.creation_epoch() > self.config.epoch {
            return Err(LoadError::identity(format!(
                "creation epoch {} is in the future",
                header.creation_epoch()
            )));
        }
        let has_hh = header.checksums().homomorphic.is_some();
        if has_hh == self.config.homomorphic_hashing_disabled {
            return Err(LoadError::identity(if has_hh {
                "homomorphic hash present while disabled by network"
            } else {
                "homomorphic hash missing"
            }));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[async_trait]
impl StoreEffects for InMemoryStore {
    type PutStream = MemoryPutStream;
    type GetStream = MemoryGetStream;

    async fn network_info(&self) -> Result<NetworkInfo> {
        if self.faults.fail_network_info {
            return Err(LoadError::transport("network info unavailable"));
        }
        let parameters = match &self.raw_parameters {
            Some(raw) => raw.clone(),
            None => vec![
                (
                    MAX_OBJECT_SIZE_KEY.as_bytes().to_vec(),
                    self.config.max_object_size.to_le_bytes().to_vec(),
                ),
                (
                    HOMOMORPHIC_HASHING_DISABLED_KEY.as_bytes().to_vec(),
                    vec![u8::from(self.config.homomorphic_hashing_disabled)],
                ),
            ],
        };
        Ok(NetworkInfo {
            current_epoch: self.config.epoch,
            parameters,
        })
    }

    async fn open_put_stream(&self, session: Option<&SessionToken>) -> Result<MemoryPutStream> {
        if self.faults.fail_open {
            return Err(LoadError::transport("put stream refused"));
        }
        Ok(MemoryPutStream {
            store: self.clone(),
            session: session.cloned(),
            header: None,
            payload: Vec::new(),
            chunk_index: 0,
            error: None,
        })
    }

    async fn open_get_stream(
        &self,
        address: &Address,
        session: Option<&SessionToken>,
    ) -> Result<MemoryGetStream> {
        if self.faults.fail_open {
            return Err(LoadError::transport("get stream refused"));
        }
        if address.object_id().is_none() {
            return Err(LoadError::transport("get requires an object address"));
        }
        if let Some(token) = session {
            token
                .verify(Verb::Get, address, self.config.epoch)
                .map_err(|e| LoadError::transport(format!("access denied: {e}")))?;
        }
        let stored = {
            let state = self.state.read().await;
            state
                .objects
                .get(address)
                .cloned()
                .ok_or_else(|| LoadError::transport(format!("object {address} not found")))?
        };
        Ok(MemoryGetStream {
            store: self.clone(),
            stored,
            offset: 0,
            read_index: 0,
            error: None,
        })
    }
}

/// Upload stream into an [`InMemoryStore`]
#[derive(Debug)]
pub struct MemoryPutStream {
    store: InMemoryStore,
    session: Option<SessionToken>,
    header: Option<Object>,
    payload: Vec<u8>,
    chunk_index: usize,
    error: Option<LoadError>,
}

#[async_trait]
impl PutStream for MemoryPutStream {
    async fn write_header(&mut self, object: &Object) -> bool {
        if self.error.is_some() {
            return false;
        }
        let checked = if self.store.faults.reject_header {
            Err(LoadError::transport("header rejected"))
        } else {
            self.store.check_header(object, self.session.as_ref())
        };
        match checked {
            Ok(()) => {
                self.header = Some(object.clone());
                true
            }
            Err(e) => {
                tracing::debug!(object = %object.id(), error = %e, "memory store rejected header");
                self.error = Some(LoadError::transport(format!("header rejected: {e}")));
                false
            }
        }
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> bool {
        if self.error.is_some() {
            return false;
        }
        let Some(header) = &self.header else {
            self.error = Some(LoadError::transport("payload chunk before header"));
            return false;
        };
        let index = self.chunk_index;
        if self.store.faults.stall_at_chunk == Some(index) {
            self.store.stalled.notify_one();
            std::future::pending::<()>().await;
        }
        if self.store.faults.reject_chunk_at == Some(index) {
            self.error = Some(LoadError::transport(format!("chunk {index} rejected")));
            return false;
        }
        if (self.payload.len() + chunk.len()) as u64 > header.header().payload_size() {
            self.error = Some(LoadError::transport(format!(
                "payload exceeds declared size {}",
                header.header().payload_size()
            )));
            return false;
        }

        {
            let mut state = self.store.state.write().await;
            state.stats.chunks_written += 1;
            state.stats.largest_chunk = state.stats.largest_chunk.max(chunk.len());
        }
        self.payload.extend_from_slice(chunk);
        self.chunk_index += 1;
        true
    }

    async fn close(self) -> Result<ObjectId> {
        let Some(object) = self.header else {
            return Err(self
                .error
                .unwrap_or_else(|| LoadError::transport("stream closed without header")));
        };
        if let Some(err) = self.error {
            if !self.store.faults.accept_after_rejected_chunk {
                return Err(err);
            }
            return Ok(object.id());
        }

        let header = object.header();
        if self.payload.len() as u64 != header.payload_size() {
            return Err(LoadError::transport(format!(
                "received {} payload bytes, header declares {}",
                self.payload.len(),
                header.payload_size()
            )));
        }
        if sha256(&self.payload) != header.checksums().sha256 {
            return Err(LoadError::transport("payload checksum mismatch"));
        }
        if let Some(hh) = header.checksums().homomorphic {
            if tz::sum(&self.payload) != hh {
                return Err(LoadError::transport("payload homomorphic hash mismatch"));
            }
        }

        let id = object.id();
        let address = Address::object(header.container(), id);
        let mut state = self.store.state.write().await;
        state.objects.insert(
            address,
            StoredObject {
                object,
                payload: self.payload.into(),
            },
        );
        state.stats.objects_stored += 1;
        Ok(id)
    }
}

/// Download stream from an [`InMemoryStore`]
#[derive(Debug)]
pub struct MemoryGetStream {
    store: InMemoryStore,
    stored: StoredObject,
    offset: usize,
    read_index: usize,
    error: Option<LoadError>,
}

#[async_trait]
impl GetStream for MemoryGetStream {
    async fn read_header(&mut self) -> Option<Object> {
        if self.store.faults.drop_header_on_get {
            self.error = Some(LoadError::transport("header unavailable"));
            return None;
        }
        Some(self.stored.object.clone())
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        {
            let mut state = self.store.state.write().await;
            state.stats.largest_read_buffer = state.stats.largest_read_buffer.max(buf.len());
        }
        if self.store.faults.stall_at_read == Some(self.read_index) {
            self.store.stalled.notify_one();
            std::future::pending::<()>().await;
        }
        if self.store.faults.fail_read_at_chunk == Some(self.read_index) {
            let err = LoadError::transport(format!("read {} failed", self.read_index));
            self.error = Some(err.clone());
            return Err(err);
        }
        let remaining = &self.stored.payload[self.offset..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        if self.store.faults.corrupt_payload_on_get && self.offset == 0 && n > 0 {
            buf[0] ^= 0xff;
        }
        self.offset += n;
        self.read_index += 1;
        if self.store.faults.overstate_read_len {
            return Ok(buf.len() + 1);
        }
        Ok(n)
    }

    async fn close(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
