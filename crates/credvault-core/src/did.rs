//! Decentralized identifiers.
//!
//! [`Did`] validates the generic `did:<method>:<method-specific-id>` shape.
//! Identities generated here use the `did:key` method with a base16
//! multibase body (`f`) over the ed25519 multicodec prefix, so a DID can be
//! resolved back to its public key without any registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::PublicKey;
use crate::error::{CoreError, Result};

/// Method name used for DIDs derived from Ed25519 keys.
pub const KEY_METHOD: &str = "key";

/// Multibase prefix for lowercase base16.
const MULTIBASE_BASE16: char = 'f';

/// Multicodec varint prefix for an Ed25519 public key (0xed).
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// A W3C decentralized identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Validate and wrap a DID string.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let s = value.into();
        validate(&s)?;
        Ok(Self(s))
    }

    /// Derive the `did:key` identifier for a public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let mut body = Vec::with_capacity(ED25519_MULTICODEC.len() + 32);
        body.extend_from_slice(&ED25519_MULTICODEC);
        body.extend_from_slice(public_key.as_bytes());
        Self(format!(
            "did:{}:{}{}",
            KEY_METHOD,
            MULTIBASE_BASE16,
            hex::encode(body)
        ))
    }

    /// The DID method (the segment after `did:`).
    pub fn method(&self) -> &str {
        self.0[4..].split(':').next().unwrap_or_default()
    }

    /// The method-specific identifier.
    pub fn method_specific_id(&self) -> &str {
        let rest = &self.0[4..];
        match rest.find(':') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        }
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the Ed25519 public key this DID commits to.
    ///
    /// Only `did:key` identifiers with a base16 ed25519 body resolve; any
    /// other method fails with [`CoreError::VerificationInput`].
    pub fn resolve_public_key(&self) -> Result<PublicKey> {
        if self.method() != KEY_METHOD {
            return Err(CoreError::VerificationInput(format!(
                "cannot resolve DID method '{}'",
                self.method()
            )));
        }

        let body = self
            .method_specific_id()
            .strip_prefix(MULTIBASE_BASE16)
            .ok_or_else(|| {
                CoreError::VerificationInput(format!("unsupported multibase in {}", self.0))
            })?;
        let bytes = hex::decode(body)
            .map_err(|e| CoreError::VerificationInput(format!("bad key encoding: {e}")))?;

        if bytes.len() != ED25519_MULTICODEC.len() + 32 || bytes[..2] != ED25519_MULTICODEC {
            return Err(CoreError::VerificationInput(format!(
                "{} does not encode an ed25519 key",
                self.0
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[2..]);
        Ok(PublicKey(key))
    }
}

fn validate(s: &str) -> Result<()> {
    let rest = s
        .strip_prefix("did:")
        .ok_or_else(|| CoreError::InvalidDid(s.to_string()))?;
    let (method, id) = rest
        .split_once(':')
        .ok_or_else(|| CoreError::InvalidDid(s.to_string()))?;

    let method_ok = !method.is_empty()
        && method
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let id_ok = !id.is_empty() && !id.chars().any(|c| c.is_whitespace() || c.is_control());

    if method_ok && id_ok {
        Ok(())
    } else {
        Err(CoreError::InvalidDid(s.to_string()))
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
