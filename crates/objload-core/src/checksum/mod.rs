//! Payload checksum engine
//!
//! Pure functions: a SHA-256 content checksum plus, when the network has not
//! disabled it, a Tillich-Zémor homomorphic checksum.

mod gf127;
pub mod tz;

use sha2::{Digest, Sha256};
use std::fmt;

pub use tz::{TzDigest, TzHasher};

/// SHA-256 digest of `data`
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// A typed checksum value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// SHA-256 content checksum
    Sha256([u8; 32]),
    /// Tillich-Zémor homomorphic checksum
    TillichZemor(TzDigest),
}

impl Checksum {
    /// Wire discriminant of the checksum algorithm
    pub fn type_code(&self) -> u64 {
        match self {
            Self::TillichZemor(_) => 1,
            Self::Sha256(_) => 2,
        }
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Sha256(d) => d.as_slice(),
            Self::TillichZemor(d) => d.as_bytes(),
        }
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256(d) => write!(f, "SHA256:{}", hex::encode(d)),
            Self::TillichZemor(d) => write!(f, "TZ:{d}"),
        }
    }
}

/// Checksums computed once per payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadChecksums {
    /// SHA-256 of the payload
    pub sha256: [u8; 32],
    /// Homomorphic checksum, absent when disabled network-wide
    pub homomorphic: Option<TzDigest>,
}

impl PayloadChecksums {
    /// Compute checksums over the whole payload
    pub fn compute(payload: &[u8], homomorphic: bool) -> Self {
        Self {
            sha256: sha256(payload),
            homomorphic: homomorphic.then(|| tz::sum(payload)),
        }
    }

    /// The content checksum
    pub fn payload_checksum(&self) -> Checksum {
        Checksum::Sha256(self.sha256)
    }

    /// The homomorphic checksum, if computed
    pub fn homomorphic_checksum(&self) -> Option<Checksum> {
        self.homomorphic.map(Checksum::TillichZemor)
    }
}
