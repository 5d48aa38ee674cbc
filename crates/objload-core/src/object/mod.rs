//! Object header construction, identity and signature
//!
//! Objects are built in two steps. [`build_header`] fixes every header field
//! that depends on the payload (size, checksums) and the network (epoch).
//! [`ObjectHeader::finalize`] attaches attributes, derives the object id over
//! the canonical header encoding and signs it. Only the finalized [`Object`]
//! carries an id, so nothing identity-less reaches the transfer engine, and a
//! single header can be finalized many times with different attributes.

pub mod encoding;

use crate::checksum::{Checksum, PayloadChecksums};
use crate::types::{ContainerId, ObjectId, OwnerId};
use crate::{LoadError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use encoding::StableWriter;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Protocol version stamped into every header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
}

/// Version produced by this client
pub const CURRENT_VERSION: Version = Version {
    major: 2,
    minor: 18,
};

/// Object type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectType {
    /// Plain data object; the only type this workload produces
    #[default]
    Regular,
    /// Deletion marker
    Tombstone,
    /// Lock object
    Lock,
}

impl ObjectType {
    fn code(self) -> u64 {
        match self {
            Self::Regular => 0,
            Self::Tombstone => 1,
            Self::Lock => 3,
        }
    }
}

/// Key/value object attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    key: String,
    value: String,
}

impl Attribute {
    /// New attribute
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Attribute key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Attribute value
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for Attribute {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

/// Header fields fixed before identity derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    version: Version,
    container: ContainerId,
    owner: OwnerId,
    object_type: ObjectType,
    payload_size: u64,
    creation_epoch: u64,
    checksums: PayloadChecksums,
}

/// Assemble a regular object header
pub fn build_header(
    container: ContainerId,
    owner: OwnerId,
    payload_size: u64,
    creation_epoch: u64,
    checksums: PayloadChecksums,
) -> ObjectHeader {
    ObjectHeader {
        version: CURRENT_VERSION,
        container,
        owner,
        object_type: ObjectType::Regular,
        payload_size,
        creation_epoch,
        checksums,
    }
}

fn write_checksum(w: &mut StableWriter, checksum: &Checksum) {
    w.enumeration(1, checksum.type_code())
        .bytes(2, checksum.as_bytes());
}

impl ObjectHeader {
    /// Protocol version
    pub fn version(&self) -> Version {
        self.version
    }

    /// Owning container
    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// Object owner
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Object type
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Payload length in bytes
    pub fn payload_size(&self) -> u64 {
        self.payload_size
    }

    /// Epoch the object was created in
    pub fn creation_epoch(&self) -> u64 {
        self.creation_epoch
    }

    /// Payload checksums
    pub fn checksums(&self) -> &PayloadChecksums {
        &self.checksums
    }

    /// Canonical encoding of this header with the given attributes
    pub fn encode(&self, attributes: &[Attribute]) -> Vec<u8> {
        let mut w = StableWriter::new();
        w.message(1, |m| {
            m.uint64(1, u64::from(self.version.major))
                .uint64(2, u64::from(self.version.minor));
        })
        .message(2, |m| {
            m.bytes(1, self.container.as_bytes());
        })
        .message(3, |m| {
            m.bytes(1, self.owner.as_bytes());
        })
        .uint64(4, self.creation_epoch)
        .uint64(5, self.payload_size)
        .message(6, |m| write_checksum(m, &self.checksums.payload_checksum()))
        .enumeration(7, self.object_type.code());
        if let Some(hh) = self.checksums.homomorphic_checksum() {
            w.message(8, |m| write_checksum(m, &hh));
        }
        for attribute in attributes {
            w.repeated_message(10, |m| {
                m.bytes(1, attribute.key.as_bytes())
                    .bytes(2, attribute.value.as_bytes());
            });
        }
        w.into_bytes()
    }

    /// Attach attributes, derive the object id and sign it
    ///
    /// Attribute order is preserved and is part of the identity.
    pub fn finalize<I, A>(&self, attributes: I, key: &SigningKey) -> Result<Object>
    where
        I: IntoIterator<Item = A>,
        A: Into<Attribute>,
    {
        let attributes: Vec<Attribute> = attributes.into_iter().map(Into::into).collect();
        validate_attributes(&attributes)?;

        let id = compute_id(self, &attributes);
        let signature = key
            .try_sign(id.as_bytes())
            .map_err(|e| LoadError::signature(format!("failed to sign object {id}: {e}")))?;

        Ok(Object {
            header: self.clone(),
            attributes,
            id,
            signature: ObjectSignature {
                public_key: key.verifying_key(),
                signature,
            },
        })
    }
}

fn validate_attributes(attributes: &[Attribute]) -> Result<()> {
    let mut seen = HashSet::with_capacity(attributes.len());
    for attribute in attributes {
        if attribute.key.is_empty() {
            return Err(LoadError::identity("empty attribute key"));
        }
        if attribute.value.is_empty() {
            return Err(LoadError::identity(format!(
                "empty value for attribute {}",
                attribute.key
            )));
        }
        if !seen.insert(attribute.key.as_str()) {
            return Err(LoadError::identity(format!(
                "duplicated attribute {}",
                attribute.key
            )));
        }
    }
    Ok(())
}

fn compute_id(header: &ObjectHeader, attributes: &[Attribute]) -> ObjectId {
    ObjectId::from_bytes(Sha256::digest(header.encode(attributes)).into())
}

/// Signer public key and signature over the object id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSignature {
    /// Signer's public key
    pub public_key: VerifyingKey,
    /// Signature over the raw id bytes
    pub signature: Signature,
}

/// A finalized, signed object header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    header: ObjectHeader,
    attributes: Vec<Attribute>,
    id: ObjectId,
    signature: ObjectSignature,
}

impl Object {
    /// Header fields
    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    /// Attributes in encoding order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Object identifier
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Object signature
    pub fn signature(&self) -> &ObjectSignature {
        &self.signature
    }

    /// Recompute the identifier and check the signature
    pub fn verify(&self) -> Result<()> {
        validate_attributes(&self.attributes)?;
        let expected = compute_id(&self.header, &self.attributes);
        if expected != self.id {
            return Err(LoadError::identity(format!(
                "object id mismatch: header hashes to {expected}, object claims {}",
                self.id
            )));
        }
        self.signature
            .public_key
            .verify_strict(self.id.as_bytes(), &self.signature.signature)
            .map_err(|e| LoadError::signature(format!("invalid signature on {}: {e}", self.id)))
    }
}
