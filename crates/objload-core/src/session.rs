//! Session tokens scoped to one verb and one target
//!
//! A caller holds a long-lived [`SessionTemplate`]. Before every operation the
//! [`SessionAuthorizer`] copies it, binds it to exactly one [`Verb`] and one
//! [`Address`] and signs the binding. Tokens are never reused across
//! operations.

use crate::object::encoding::StableWriter;
use crate::types::{Address, OwnerId};
use crate::{LoadError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Operation a session token authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    /// Object upload
    Put,
    /// Object download
    Get,
}

impl Verb {
    fn code(self) -> u64 {
        match self {
            Self::Put => 1,
            Self::Get => 2,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put => f.write_str("PUT"),
            Self::Get => f.write_str("GET"),
        }
    }
}

/// Validity window in epochs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    /// Epoch the session was issued in
    pub issued_at: u64,
    /// First epoch the session is valid in
    pub not_before: u64,
    /// Last epoch the session is valid in
    pub expires_at: u64,
}

impl Lifetime {
    /// Whether `epoch` falls inside the window
    pub fn contains(&self, epoch: u64) -> bool {
        self.not_before <= epoch && epoch <= self.expires_at
    }
}

/// Unscoped session body held by the caller for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTemplate {
    id: Uuid,
    lifetime: Lifetime,
    session_key: VerifyingKey,
}

impl SessionTemplate {
    /// Template with a fresh random id
    pub fn new(lifetime: Lifetime, session_key: VerifyingKey) -> Self {
        Self::with_id(Uuid::new_v4(), lifetime, session_key)
    }

    /// Template with a caller-chosen id
    pub fn with_id(id: Uuid, lifetime: Lifetime, session_key: VerifyingKey) -> Self {
        Self {
            id,
            lifetime,
            session_key,
        }
    }

    /// Session id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Validity window
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

/// A token bound to one verb and one target, signed by the issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    template: SessionTemplate,
    issuer: OwnerId,
    verb: Verb,
    target: Address,
    public_key: VerifyingKey,
    signature: Signature,
}

fn encode_body(template: &SessionTemplate, issuer: &OwnerId, verb: Verb, target: &Address) -> Vec<u8> {
    let mut w = StableWriter::new();
    w.bytes(1, template.id.as_bytes())
        .message(2, |m| {
            m.bytes(1, issuer.as_bytes());
        })
        .message(3, |m| {
            m.uint64(1, template.lifetime.expires_at)
                .uint64(2, template.lifetime.not_before)
                .uint64(3, template.lifetime.issued_at);
        })
        .bytes(4, template.session_key.as_bytes())
        .message(5, |m| {
            m.enumeration(1, verb.code()).message(2, |t| {
                t.message(1, |c| {
                    c.bytes(1, target.container_id().as_bytes());
                });
                if let Some(object) = target.object_id() {
                    t.repeated_message(2, |o| {
                        o.bytes(1, object.as_bytes());
                    });
                }
            });
        });
    w.into_bytes()
}

impl SessionToken {
    /// Authorized verb
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Authorized target
    pub fn target(&self) -> Address {
        self.target
    }

    /// Issuer owner id
    pub fn issuer(&self) -> OwnerId {
        self.issuer
    }

    /// Session id copied from the template
    pub fn id(&self) -> Uuid {
        self.template.id
    }

    /// Check the token for presentation with `verb` against `address` at `epoch`
    ///
    /// A container-wide token covers every object in that container; an
    /// object-scoped token covers only that object.
    pub fn verify(&self, verb: Verb, address: &Address, epoch: u64) -> Result<()> {
        if self.verb != verb {
            return Err(LoadError::authorization(format!(
                "session {} is scoped to {}, presented for {verb}",
                self.template.id, self.verb
            )));
        }
        if self.target.container_id() != address.container_id() {
            return Err(LoadError::authorization(format!(
                "session {} is scoped to container {}, presented for {}",
                self.template.id,
                self.target.container_id(),
                address.container_id()
            )));
        }
        if let Some(object) = self.target.object_id() {
            if address.object_id() != Some(object) {
                return Err(LoadError::authorization(format!(
                    "session {} is scoped to {}, presented for {address}",
                    self.template.id, self.target
                )));
            }
        }
        if !self.template.lifetime.contains(epoch) {
            return Err(LoadError::authorization(format!(
                "session {} is not valid at epoch {epoch}",
                self.template.id
            )));
        }
        if OwnerId::from_public_key(&self.public_key) != self.issuer {
            return Err(LoadError::authorization(format!(
                "session {} issuer does not match signing key",
                self.template.id
            )));
        }
        let body = encode_body(&self.template, &self.issuer, self.verb, &self.target);
        self.public_key
            .verify_strict(&body, &self.signature)
            .map_err(|e| {
                LoadError::authorization(format!(
                    "session {} signature invalid: {e}",
                    self.template.id
                ))
            })
    }
}

/// Derives single-purpose tokens from a template with the caller's key
#[derive(Debug, Clone)]
pub struct SessionAuthorizer {
    key: SigningKey,
    template: SessionTemplate,
}

impl SessionAuthorizer {
    /// Authorizer for one identity and one template
    pub fn new(key: SigningKey, template: SessionTemplate) -> Self {
        Self { key, template }
    }

    /// The base template
    pub fn template(&self) -> &SessionTemplate {
        &self.template
    }

    /// Copy the template, bind it to `verb` and `target`, and sign it
    pub fn scope(&self, verb: Verb, target: Address) -> Result<SessionToken> {
        let template = self.template.clone();
        let public_key = self.key.verifying_key();
        let issuer = OwnerId::from_public_key(&public_key);
        let body = encode_body(&template, &issuer, verb, &target);
        let signature = self.key.try_sign(&body).map_err(|e| {
            LoadError::authorization(format!("failed to sign {verb} session for {target}: {e}"))
        })?;
        tracing::trace!(session = %template.id, %verb, %target, "scoped session token");

        Ok(SessionToken {
            template,
            issuer,
            verb,
            target,
            public_key,
            signature,
        })
    }
}
