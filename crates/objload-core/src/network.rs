//! Network parameter resolution
//!
//! The store publishes its configuration as raw key/value entries. Only two
//! keys matter for object construction; everything else is ignored.

use crate::effects::StoreEffects;
use crate::{LoadError, Result};
use tokio_util::sync::CancellationToken;

/// Parameter key for the maximum object payload size
pub const MAX_OBJECT_SIZE_KEY: &str = "MaxObjectSize";

/// Parameter key for the network-wide homomorphic hashing switch
pub const HOMOMORPHIC_HASHING_DISABLED_KEY: &str = "HomomorphicHashingDisabled";

/// Longest byte array accepted as a boolean
const MAX_BOOL_BYTES: usize = 32;

/// Raw network information as answered by the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Current epoch
    pub current_epoch: u64,
    /// Configuration entries in store order
    pub parameters: Vec<(Vec<u8>, Vec<u8>)>,
}

impl NetworkInfo {
    /// Info with no parameters
    pub fn new(current_epoch: u64) -> Self {
        Self {
            current_epoch,
            parameters: Vec::new(),
        }
    }

    /// Append a raw parameter
    pub fn with_parameter(mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }
}

/// Snapshot of the store parameters needed to build objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParameters {
    /// Largest accepted payload in bytes
    pub max_object_size: u64,
    /// Current epoch
    pub current_epoch: u64,
    /// Whether objects must omit the homomorphic checksum
    pub homomorphic_hashing_disabled: bool,
}

/// Decode a little-endian size, zero-extending or truncating to 8 bytes
fn decode_u64_le(value: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = value.len().min(buf.len());
    buf[..n].copy_from_slice(&value[..n]);
    u64::from_le_bytes(buf)
}

/// Decode a byte-array boolean: true iff any byte is non-zero
fn decode_bool(value: &[u8]) -> std::result::Result<bool, String> {
    if value.len() > MAX_BOOL_BYTES {
        return Err(format!(
            "boolean value is {} bytes, at most {MAX_BOOL_BYTES} allowed",
            value.len()
        ));
    }
    Ok(value.iter().any(|b| *b != 0))
}

impl NetworkParameters {
    /// Extract the recognized parameters from raw network info
    pub fn from_info(info: &NetworkInfo) -> Result<Self> {
        let mut max_object_size = None;
        let mut homomorphic_hashing_disabled = false;

        for (key, value) in &info.parameters {
            match key.as_slice() {
                k if k == MAX_OBJECT_SIZE_KEY.as_bytes() => {
                    max_object_size = Some(decode_u64_le(value));
                }
                k if k == HOMOMORPHIC_HASHING_DISABLED_KEY.as_bytes() => {
                    homomorphic_hashing_disabled = decode_bool(value).map_err(|reason| {
                        LoadError::malformed_parameter(HOMOMORPHIC_HASHING_DISABLED_KEY, reason)
                    })?;
                }
                _ => {}
            }
        }

        let max_object_size =
            max_object_size.ok_or_else(|| LoadError::missing_parameter(MAX_OBJECT_SIZE_KEY))?;

        Ok(Self {
            max_object_size,
            current_epoch: info.current_epoch,
            homomorphic_hashing_disabled,
        })
    }

    /// Fail if a payload of `len` bytes exceeds the object size limit
    pub fn check_payload_size(&self, len: u64) -> Result<()> {
        if len > self.max_object_size {
            return Err(LoadError::payload_too_large(len, self.max_object_size));
        }
        Ok(())
    }
}

/// Query the store for its current parameters
///
/// One round trip, aborted if `cancel` fires first.
pub async fn resolve<S>(store: &S, cancel: &CancellationToken) -> Result<NetworkParameters>
where
    S: StoreEffects + ?Sized,
{
    let info = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(LoadError::cancelled("network info")),
        info = store.network_info() => info?,
    };
    let params = NetworkParameters::from_info(&info)?;
    tracing::debug!(
        epoch = params.current_epoch,
        max_object_size = params.max_object_size,
        homomorphic_hashing_disabled = params.homomorphic_hashing_disabled,
        "resolved network parameters"
    );
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> NetworkInfo {
        NetworkInfo::new(17).with_parameter(MAX_OBJECT_SIZE_KEY, 1024u64.to_le_bytes())
    }

    #[test]
    fn test_parses_known_keys_and_ignores_others() {
        let params = NetworkParameters::from_info(
            &info()
                .with_parameter("AuditFee", vec![1, 2, 3])
                .with_parameter(HOMOMORPHIC_HASHING_DISABLED_KEY, vec![1]),
        )
        .unwrap();
        assert_eq!(params.max_object_size, 1024);
        assert_eq!(params.current_epoch, 17);
        assert!(params.homomorphic_hashing_disabled);
    }

    #[test]
    fn test_short_size_is_zero_extended() {
        let params = NetworkParameters::from_info(
            &NetworkInfo::new(1).with_parameter(MAX_OBJECT_SIZE_KEY, vec![0x00, 0x04]),
        )
        .unwrap();
        assert_eq!(params.max_object_size, 1024);
    }

    #[test]
    fn test_missing_max_size() {
        let err = NetworkParameters::from_info(&NetworkInfo::new(1)).unwrap_err();
        assert_eq!(err, LoadError::missing_parameter(MAX_OBJECT_SIZE_KEY));
    }

    #[test]
    fn test_malformed_bool() {
        let err = NetworkParameters::from_info(
            &info().with_parameter(HOMOMORPHIC_HASHING_DISABLED_KEY, vec![1u8; 33]),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::MalformedParameter { .. }));
    }

    #[test]
    fn test_zero_bool_is_false() {
        let params = NetworkParameters::from_info(
            &info().with_parameter(HOMOMORPHIC_HASHING_DISABLED_KEY, vec![0, 0]),
        )
        .unwrap();
        assert!(!params.homomorphic_hashing_disabled);
    }

    #[test]
    fn test_size_limit_boundary() {
        let params = NetworkParameters::from_info(&info()).unwrap();
        params.check_payload_size(1024).unwrap();
        assert_eq!(
            params.check_payload_size(1025),
            Err(LoadError::payload_too_large(1025, 1024))
        );
    }
}
