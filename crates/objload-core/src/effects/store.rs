//! Store effect trait definitions
//!
//! The wire protocol belongs to the store; this is the minimal streaming
//! surface the transfer engine needs. Implementations wrap an RPC client in
//! production and an in-memory store in tests.

use crate::network::NetworkInfo;
use crate::object::Object;
use crate::session::SessionToken;
use crate::types::{Address, ObjectId};
use crate::Result;
use async_trait::async_trait;

/// Access to the object store under test
#[async_trait]
pub trait StoreEffects: Send + Sync {
    /// Upload stream handle
    type PutStream: PutStream;
    /// Download stream handle
    type GetStream: GetStream;

    /// Fetch current network configuration
    async fn network_info(&self) -> Result<NetworkInfo>;

    /// Begin an object upload, optionally within a session
    async fn open_put_stream(&self, session: Option<&SessionToken>) -> Result<Self::PutStream>;

    /// Begin downloading the object at `address`, optionally within a session
    async fn open_get_stream(
        &self,
        address: &Address,
        session: Option<&SessionToken>,
    ) -> Result<Self::GetStream>;
}

/// Upload half of the streaming protocol
///
/// `write_*` return `false` once the stream has failed; the reason is
/// reported by [`PutStream::close`].
#[async_trait]
pub trait PutStream: Send {
    /// Send the finalized object header
    async fn write_header(&mut self, object: &Object) -> bool;

    /// Send the next payload chunk
    async fn write_chunk(&mut self, chunk: &[u8]) -> bool;

    /// Finish the upload and return the stored object id
    async fn close(self) -> Result<ObjectId>;
}

/// Download half of the streaming protocol
#[async_trait]
pub trait GetStream: Send {
    /// Read the object header; `None` if it could not be read
    async fn read_header(&mut self) -> Option<Object>;

    /// Read the next payload bytes into `buf`; `Ok(0)` marks the end
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Finish the download
    async fn close(self) -> Result<()>;
}
