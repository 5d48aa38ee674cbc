//! Identifier types for containers, objects and owners
//!
//! All identifiers render as lowercase hex and parse back from it. Parsing
//! failures are caller configuration errors.

use crate::{LoadError, Result};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

fn decode_fixed<const N: usize>(kind: &str, s: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s)
        .map_err(|e| LoadError::configuration(format!("invalid {kind} '{s}': {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        LoadError::configuration(format!(
            "invalid {kind} '{s}': expected {N} bytes, got {}",
            b.len()
        ))
    })
}

macro_rules! hash_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap raw identifier bytes
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw identifier bytes
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = LoadError;

            fn from_str(s: &str) -> Result<Self> {
                decode_fixed($kind, s).map(Self)
            }
        }
    };
}

hash_identifier!(
    /// Container identifier: the storage scope an object belongs to
    ContainerId,
    "container id"
);

hash_identifier!(
    /// Object identifier: SHA-256 of the finalized header encoding
    ObjectId,
    "object id"
);

/// Length of an owner identifier in bytes
pub const OWNER_ID_LEN: usize = 25;

const OWNER_ID_VERSION: u8 = 0x35;

/// Owner identifier derived from the signer's public key
///
/// Layout: version byte, 20-byte key hash, 4-byte checksum of the first 21
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId([u8; OWNER_ID_LEN]);

fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

impl OwnerId {
    /// Derive the owner id for a public key
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        let mut id = [0u8; OWNER_ID_LEN];
        id[0] = OWNER_ID_VERSION;
        id[1..21].copy_from_slice(&double_sha256(key.as_bytes())[..20]);
        let checksum = double_sha256(&id[..21]);
        id[21..].copy_from_slice(&checksum[..4]);
        Self(id)
    }

    /// Raw owner bytes
    pub fn as_bytes(&self) -> &[u8; OWNER_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for OwnerId {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self> {
        let id: [u8; OWNER_ID_LEN] = decode_fixed("owner id", s)?;
        if id[0] != OWNER_ID_VERSION {
            return Err(LoadError::configuration(format!(
                "invalid owner id '{s}': unsupported version {:#04x}",
                id[0]
            )));
        }
        if double_sha256(&id[..21])[..4] != id[21..] {
            return Err(LoadError::configuration(format!(
                "invalid owner id '{s}': checksum mismatch"
            )));
        }
        Ok(Self(id))
    }
}

/// Target of a session token: a container, optionally narrowed to one object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    container: ContainerId,
    object: Option<ObjectId>,
}

impl Address {
    /// Address covering a whole container
    pub fn container(container: ContainerId) -> Self {
        Self {
            container,
            object: None,
        }
    }

    /// Address of a single object
    pub fn object(container: ContainerId, object: ObjectId) -> Self {
        Self {
            container,
            object: Some(object),
        }
    }

    /// Container part
    pub fn container_id(&self) -> ContainerId {
        self.container
    }

    /// Object part, if any
    pub fn object_id(&self) -> Option<ObjectId> {
        self.object
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object {
            Some(object) => write!(f, "{}/{}", self.container, object),
            None => write!(f, "{}", self.container),
        }
    }
}
