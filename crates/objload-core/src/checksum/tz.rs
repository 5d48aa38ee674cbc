//! Tillich-Zémor homomorphic hash
//!
//! The digest of a payload is the ordered product of one SL(2, GF(2^127))
//! generator per payload bit, so the digest of a concatenation is the product
//! of the digests of its parts. The store relies on this to check the
//! checksum of an object assembled from separately hashed segments.

use super::gf127::Gf127;
use std::fmt;

/// Digest length in bytes: four 16-byte field elements
pub const DIGEST_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sl2([[Gf127; 2]; 2]);

impl Sl2 {
    const IDENTITY: Self = Self([[Gf127::ONE, Gf127::ZERO], [Gf127::ZERO, Gf127::ONE]]);

    fn mul(&self, rhs: &Self) -> Self {
        let [[a, b], [c, d]] = self.0;
        let [[e, f], [g, h]] = rhs.0;
        Self([[a * e + b * g, a * f + b * h], [c * e + d * g, c * f + d * h]])
    }

    /// Right-multiply by the generator for one bit
    #[inline]
    fn mul_bit(&mut self, bit: bool) {
        for row in &mut self.0 {
            let [a, b] = *row;
            let ax = a.mul_x() + b;
            *row = if bit { [ax, ax + a] } else { [ax, a] };
        }
    }

    fn to_digest(self) -> TzDigest {
        let mut out = [0u8; DIGEST_LEN];
        let elements = [self.0[0][0], self.0[0][1], self.0[1][0], self.0[1][1]];
        for (chunk, element) in out.chunks_exact_mut(16).zip(elements) {
            chunk.copy_from_slice(&element.to_be_bytes());
        }
        TzDigest(out)
    }
}

/// Tillich-Zémor digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TzDigest([u8; DIGEST_LEN]);

impl TzDigest {
    /// Wrap raw digest bytes; `None` if any element lies outside the field
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Option<Self> {
        let digest = Self(bytes);
        digest.to_matrix().map(|_| digest)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    fn to_matrix(self) -> Option<Sl2> {
        let mut elements = [Gf127::ZERO; 4];
        for (element, chunk) in elements.iter_mut().zip(self.0.chunks_exact(16)) {
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(chunk);
            *element = Gf127::from_be_bytes(bytes)?;
        }
        let [a, b, c, d] = elements;
        Some(Sl2([[a, b], [c, d]]))
    }
}

impl fmt::Debug for TzDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TzDigest({})", hex::encode(self.0))
    }
}

impl fmt::Display for TzDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Incremental Tillich-Zémor hasher
#[derive(Debug, Clone)]
pub struct TzHasher {
    state: Sl2,
}

impl TzHasher {
    /// Hasher over the empty input
    pub fn new() -> Self {
        Self {
            state: Sl2::IDENTITY,
        }
    }

    /// Absorb more input
    pub fn update(&mut self, data: &[u8]) {
        for byte in data {
            for shift in (0..8).rev() {
                self.state.mul_bit((byte >> shift) & 1 == 1);
            }
        }
    }

    /// Digest of everything absorbed so far
    pub fn finalize(&self) -> TzDigest {
        self.state.to_digest()
    }
}

impl Default for TzHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot digest of `data`
pub fn sum(data: &[u8]) -> TzDigest {
    let mut hasher = TzHasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Digest of the concatenation of the inputs whose digests are given, in order
pub fn concat(digests: &[TzDigest]) -> Option<TzDigest> {
    let mut acc = Sl2::IDENTITY;
    for digest in digests {
        acc = acc.mul(&digest.to_matrix()?);
    }
    Some(acc.to_digest())
}

/// Check that `whole` is the digest of the concatenation of `segments`
pub fn validate(whole: &TzDigest, segments: &[TzDigest]) -> bool {
    concat(segments).is_some_and(|combined| combined == *whole)
}

/// Digests of consecutive `segment_size` slices of `data`
///
/// The last segment may be shorter. A zero segment size hashes the payload as
/// a single segment.
pub fn sum_segments(data: &[u8], segment_size: usize) -> Vec<TzDigest> {
    if segment_size == 0 || data.is_empty() {
        return vec![sum(data)];
    }
    data.chunks(segment_size).map(sum).collect()
}
