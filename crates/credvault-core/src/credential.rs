//! Credential documents: the claims an issuer signs about a subject.
//!
//! A document is immutable once signed. Any change to it changes its
//! canonical bytes and therefore invalidates the signature.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::crypto::Blake3Hash;
use crate::did::Did;

/// Type tag carried by every credential.
pub const BASE_CREDENTIAL_TYPE: &str = "VerifiableCredential";

/// A single claim value.
///
/// Floats are deliberately absent so that every value has exactly one
/// canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimValue::Bool(b) => write!(f, "{b}"),
            ClaimValue::Integer(i) => write!(f, "{i}"),
            ClaimValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(s: &str) -> Self {
        ClaimValue::Text(s.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(s: String) -> Self {
        ClaimValue::Text(s)
    }
}

impl From<i64> for ClaimValue {
    fn from(i: i64) -> Self {
        ClaimValue::Integer(i)
    }
}

impl From<bool> for ClaimValue {
    fn from(b: bool) -> Self {
        ClaimValue::Bool(b)
    }
}

/// Claims, ordered by name.
pub type Claims = BTreeMap<String, ClaimValue>;

/// The subject a credential is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSubject {
    /// Subject DID.
    pub id: Did,
    /// Claims about the subject.
    pub claims: Claims,
}

/// A verifiable credential document, prior to signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDocument {
    /// DID of the issuing authority.
    pub issuer: Did,
    /// Who the credential is about.
    pub subject: CredentialSubject,
    /// Issuance time (Unix milliseconds).
    pub issued_at: i64,
    /// Credential type tags.
    pub types: BTreeSet<String>,
}

impl CredentialDocument {
    /// Start building a document.
    pub fn builder(issuer: Did, subject: Did) -> CredentialBuilder {
        CredentialBuilder::new(issuer, subject)
    }

    /// The canonical byte encoding used for signing and encryption.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical::canonicalize(self)
    }

    /// Blake3 digest of the canonical bytes.
    pub fn digest(&self) -> Blake3Hash {
        canonical::digest(self)
    }

    /// Look up a claim by name.
    pub fn claim(&self, name: &str) -> Option<&ClaimValue> {
        self.subject.claims.get(name)
    }
}

/// Builder for [`CredentialDocument`].
#[derive(Debug, Clone)]
pub struct CredentialBuilder {
    issuer: Did,
    subject: Did,
    claims: Claims,
    issued_at: i64,
    types: BTreeSet<String>,
}

impl CredentialBuilder {
    /// Start with the base credential type and no claims.
    pub fn new(issuer: Did, subject: Did) -> Self {
        let mut types = BTreeSet::new();
        types.insert(BASE_CREDENTIAL_TYPE.to_string());
        Self {
            issuer,
            subject,
            claims: Claims::new(),
            issued_at: 0,
            types,
        }
    }

    /// Add or replace a claim.
    pub fn claim(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Add every claim from a map.
    pub fn claims(mut self, claims: Claims) -> Self {
        self.claims.extend(claims);
        self
    }

    /// Add a credential type tag.
    pub fn with_type(mut self, tag: impl Into<String>) -> Self {
        self.types.insert(tag.into());
        self
    }

    /// Set the issuance timestamp (Unix milliseconds).
    pub fn issued_at(mut self, ts: i64) -> Self {
        self.issued_at = ts;
        self
    }

    /// Finish building.
    pub fn build(self) -> CredentialDocument {
        CredentialDocument {
            issuer: self.issuer,
            subject: CredentialSubject {
                id: self.subject,
                claims: self.claims,
            },
            issued_at: self.issued_at,
            types: self.types,
        }
    }
}
