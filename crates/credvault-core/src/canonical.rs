//! Canonical CBOR encoding for credential documents.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by bytewise comparison of their encodings
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 milliseconds)
//!
//! The canonical bytes are what the issuer signs and what the holder
//! encrypts. [`parse`] accepts only canonical input: decoding followed by
//! re-encoding must reproduce the input exactly.

use std::collections::{BTreeMap, BTreeSet};

use ciborium::value::Value;

use crate::credential::{ClaimValue, CredentialDocument, CredentialSubject};
use crate::crypto::Blake3Hash;
use crate::did::Did;
use crate::error::{CoreError, Result};

/// Version of the canonical document layout.
pub const DOCUMENT_FORMAT_VERSION: u64 = 1;

/// Document field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const ISSUER: u64 = 1;
    pub const SUBJECT_ID: u64 = 2;
    pub const CLAIMS: u64 = 3;
    pub const ISSUED_AT: u64 = 4;
    pub const TYPES: u64 = 5;
}

/// The subset of CBOR a document can contain.
enum Node<'a> {
    Uint(u64),
    Int(i64),
    Bool(bool),
    Text(&'a str),
    Array(Vec<Node<'a>>),
    Map(Vec<(Node<'a>, Node<'a>)>),
}

/// Encode a document to its canonical bytes.
pub fn canonicalize(doc: &CredentialDocument) -> Vec<u8> {
    let claims = doc
        .subject
        .claims
        .iter()
        .map(|(name, value)| (Node::Text(name), claim_node(value)))
        .collect();

    let types = doc.types.iter().map(|t| Node::Text(t)).collect();

    let root = Node::Map(vec![
        (Node::Uint(keys::VERSION), Node::Uint(DOCUMENT_FORMAT_VERSION)),
        (Node::Uint(keys::ISSUER), Node::Text(doc.issuer.as_str())),
        (Node::Uint(keys::SUBJECT_ID), Node::Text(doc.subject.id.as_str())),
        (Node::Uint(keys::CLAIMS), Node::Map(claims)),
        (Node::Uint(keys::ISSUED_AT), Node::Int(doc.issued_at)),
        (Node::Uint(keys::TYPES), Node::Array(types)),
    ]);

    let mut buf = Vec::new();
    encode_node(&mut buf, &root);
    buf
}

/// Blake3 hash of a document's canonical bytes.
pub fn digest(doc: &CredentialDocument) -> Blake3Hash {
    Blake3Hash::hash(&canonicalize(doc))
}

fn claim_node(value: &ClaimValue) -> Node<'_> {
    match value {
        ClaimValue::Bool(b) => Node::Bool(*b),
        ClaimValue::Integer(i) => Node::Int(*i),
        ClaimValue::Text(s) => Node::Text(s),
    }
}

/// Recursively encode a node.
fn encode_node(buf: &mut Vec<u8>, node: &Node<'_>) {
    match node {
        Node::Uint(n) => encode_uint(buf, 0, *n),
        Node::Int(i) => encode_int(buf, *i),
        Node::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Node::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Node::Array(items) => {
            encode_uint(buf, 4, items.len() as u64);
            for item in items {
                encode_node(buf, item);
            }
        }
        Node::Map(entries) => encode_map_canonical(buf, entries),
    }
}

/// Encode a signed integer (major types 0 and 1).
fn encode_int(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map canonically (major type 5).
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Node<'_>, Node<'_>)]) {
    let mut pairs: Vec<(Vec<u8>, &Node<'_>)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_node(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_node(buf, value);
    }
}

/// Decode a document from canonical bytes.
pub fn parse(bytes: &[u8]) -> Result<CredentialDocument> {
    let value: Value = ciborium::from_reader(bytes).map_err(|e| malformed(e.to_string()))?;
    let doc = value_to_document(&value)?;

    if canonicalize(&doc) != bytes {
        return Err(malformed("input is not in canonical form"));
    }

    Ok(doc)
}

fn malformed(msg: impl Into<String>) -> CoreError {
    CoreError::MalformedDocument(msg.into())
}

fn value_to_document(value: &Value) -> Result<CredentialDocument> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(malformed("expected map")),
    };

    let get = |key: u64| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
            .map(|(_, v)| v)
    };

    match get(keys::VERSION) {
        Some(Value::Integer(i)) if i128::from(*i) == DOCUMENT_FORMAT_VERSION as i128 => {}
        Some(Value::Integer(i)) => {
            return Err(malformed(format!(
                "unsupported format version {}",
                i128::from(*i)
            )))
        }
        _ => return Err(malformed("missing version")),
    }

    let issuer = did_field(get(keys::ISSUER), "issuer")?;
    let subject_id = did_field(get(keys::SUBJECT_ID), "subject id")?;

    let claims = match get(keys::CLAIMS) {
        Some(Value::Map(entries)) => {
            let mut claims = BTreeMap::new();
            for (k, v) in entries {
                let name = match k {
                    Value::Text(s) => s.clone(),
                    _ => return Err(malformed("claim name must be text")),
                };
                claims.insert(name, value_to_claim(v)?);
            }
            claims
        }
        _ => return Err(malformed("missing claims")),
    };

    let issued_at = match get(keys::ISSUED_AT) {
        Some(Value::Integer(i)) => i64::try_from(i128::from(*i))
            .map_err(|_| malformed("issued_at out of range"))?,
        _ => return Err(malformed("missing issued_at")),
    };

    let types = match get(keys::TYPES) {
        Some(Value::Array(items)) => {
            let mut types = BTreeSet::new();
            for item in items {
                match item {
                    Value::Text(s) => {
                        types.insert(s.clone());
                    }
                    _ => return Err(malformed("type tag must be text")),
                }
            }
            types
        }
        _ => return Err(malformed("missing types")),
    };

    Ok(CredentialDocument {
        issuer,
        subject: CredentialSubject {
            id: subject_id,
            claims,
        },
        issued_at,
        types,
    })
}

fn did_field(value: Option<&Value>, field: &str) -> Result<Did> {
    match value {
        Some(Value::Text(s)) => {
            Did::new(s.as_str()).map_err(|_| malformed(format!("{field} is not a DID: {s}")))
        }
        Some(_) => Err(malformed(format!("{field} must be text"))),
        None => Err(malformed(format!("missing {field}"))),
    }
}

fn value_to_claim(value: &Value) -> Result<ClaimValue> {
    match value {
        Value::Bool(b) => Ok(ClaimValue::Bool(*b)),
        Value::Integer(i) => i64::try_from(i128::from(*i))
            .map(ClaimValue::Integer)
            .map_err(|_| malformed("claim integer out of range")),
        Value::Text(s) => Ok(ClaimValue::Text(s.clone())),
        _ => Err(malformed("unsupported claim value type")),
    }
}
