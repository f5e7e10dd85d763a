//! Content identifiers.
//!
//! A [`Cid`] is the storage handle of an encrypted blob: a CIDv1 with the raw
//! codec and a Blake3 multihash, rendered as base32-lower with the `b`
//! multibase prefix.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Blake3Hash;
use crate::error::CoreError;

/// CID prefix: version 1, raw codec (0x55), blake3 multihash (0x1e), 32 bytes.
const CID_PREFIX: [u8; 4] = [0x01, 0x55, 0x1e, 0x20];

/// Multibase prefix for base32-lower.
const MULTIBASE_BASE32: char = 'b';

const BASE32_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Content address of a stored blob.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cid([u8; 32]);

impl Cid {
    /// Compute the content address of `bytes`.
    pub fn for_bytes(bytes: &[u8]) -> Self {
        Self(*Blake3Hash::hash(bytes).as_bytes())
    }

    /// Wrap an existing Blake3 digest.
    pub const fn from_digest(digest: Blake3Hash) -> Self {
        Self(digest.0)
    }

    /// The Blake3 digest this CID commits to.
    pub fn digest(&self) -> Blake3Hash {
        Blake3Hash::from_bytes(self.0)
    }

    /// Whether `bytes` hash to this CID.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        *self == Self::for_bytes(bytes)
    }

    /// The binary CID (prefix plus digest).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CID_PREFIX.len() + 32);
        out.extend_from_slice(&CID_PREFIX);
        out.extend_from_slice(&self.0);
        out
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MULTIBASE_BASE32, base32_encode(&self.to_bytes()))
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self)
    }
}

impl FromStr for Cid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidCid(s.to_string());

        let body = s.strip_prefix(MULTIBASE_BASE32).ok_or_else(invalid)?;
        let bytes = base32_decode(body).ok_or_else(invalid)?;

        if bytes.len() != CID_PREFIX.len() + 32 || bytes[..4] != CID_PREFIX {
            return Err(invalid());
        }

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes[4..]);
        Ok(Self(digest))
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// RFC 4648 Base32 encoding (lowercase, no padding)
fn base32_encode(data: &[u8]) -> String {
    let mut result = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u64 = 0;
    let mut bits = 0;

    for &byte in data {
        buffer = (buffer << 8) | u64::from(byte);
        bits += 8;

        while bits >= 5 {
            bits -= 5;
            let index = ((buffer >> bits) & 0x1f) as usize;
            result.push(BASE32_ALPHABET[index] as char);
        }
    }

    if bits > 0 {
        let index = ((buffer << (5 - bits)) & 0x1f) as usize;
        result.push(BASE32_ALPHABET[index] as char);
    }

    result
}

fn base32_decode(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits = 0;

    for c in s.bytes() {
        let value = BASE32_ALPHABET.iter().position(|&a| a == c)? as u64;
        buffer = (buffer << 5) | value;
        bits += 5;

        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }

    // Leftover bits must be zero padding.
    if bits >= 5 || buffer & ((1 << bits) - 1) != 0 {
        return None;
    }

    Some(out)
}
