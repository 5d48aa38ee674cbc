//! Client configuration
//!
//! Loaded from TOML by the host. Every field has a default, so an empty file
//! is a valid configuration.

use crate::{LoadError, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// Default streaming chunk size: 64 KiB
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Positive chunk/buffer size used for streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkSize(NonZeroUsize);

impl ChunkSize {
    /// Interpret a configured size: zero selects the default, negative is an error
    pub fn from_setting(size: i64) -> Result<Self> {
        match size {
            s if s < 0 => Err(LoadError::configuration(format!(
                "buffer size must be positive, got {s}"
            ))),
            0 => Ok(Self::default()),
            s => usize::try_from(s)
                .ok()
                .and_then(NonZeroUsize::new)
                .map(Self)
                .ok_or_else(|| LoadError::configuration(format!("buffer size {s} out of range"))),
        }
    }

    /// Size in bytes
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(NonZeroUsize::MIN.saturating_add(DEFAULT_CHUNK_SIZE - 1))
    }
}

/// Settings for a load client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Streaming chunk size in bytes; 0 selects 64 KiB
    pub buffer_size: i64,

    /// Per-operation deadline; unset means no deadline
    pub operation_timeout_ms: Option<u64>,

    /// Hash downloaded payloads and compare them with the header checksum
    pub verify_get_payload: bool,
}

impl ClientConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LoadError::configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        ChunkSize::from_setting(self.buffer_size)?;
        if self.operation_timeout_ms == Some(0) {
            return Err(LoadError::configuration(
                "operation_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Effective chunk size
    pub fn chunk_size(&self) -> Result<ChunkSize> {
        ChunkSize::from_setting(self.buffer_size)
    }

    /// Effective per-operation deadline
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_chunk_size_setting() {
        assert_eq!(ChunkSize::from_setting(0).unwrap().get(), DEFAULT_CHUNK_SIZE);
        assert_eq!(ChunkSize::from_setting(1).unwrap().get(), 1);
        assert!(matches!(
            ChunkSize::from_setting(-1),
            Err(LoadError::Configuration { .. })
        ));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.chunk_size().unwrap(), ChunkSize::default());
        assert!(config.operation_timeout().is_none());
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::from_toml_str("buffer_size = -5").is_err());
        assert!(ClientConfig::from_toml_str("operation_timeout_ms = 0").is_err());
        assert!(ClientConfig::from_toml_str("buffer_size = \"big\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "buffer_size = 4096\noperation_timeout_ms = 2500\nverify_get_payload = true"
        )
        .unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.chunk_size().unwrap().get(), 4096);
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(2500)));
        assert!(config.verify_get_payload);
    }
}
