//! # credvault core
//!
//! Pure primitives for credvault: identities, DIDs, canonical credential
//! documents, issuer signatures and content identifiers.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Identity`] - Ed25519 keypair with its derived DID and address
//! - [`Did`] - Validated decentralized identifier
//! - [`CredentialDocument`] - The claims an issuer signs about a subject
//! - [`Signature`] - Detached issuer signature over canonical bytes
//! - [`Cid`] - Content address of a stored blob
//!
//! ## Canonicalization
//!
//! Documents are signed and encrypted in deterministic CBOR. See the
//! [`canonical`] module.

pub mod canonical;
pub mod credential;
pub mod crypto;
pub mod did;
pub mod error;
pub mod identity;
pub mod signature;
pub mod time;
pub mod types;

pub use canonical::{canonicalize, parse};
pub use credential::{
    ClaimValue, Claims, CredentialBuilder, CredentialDocument, CredentialSubject,
    BASE_CREDENTIAL_TYPE,
};
pub use crypto::{Blake3Hash, Keypair, PublicKey};
pub use did::Did;
pub use error::{CoreError, Result};
pub use identity::{address_from_public_key, did_from_public_key, Identity};
pub use signature::{sign, verify, Signature, SignatureAlgorithm};
pub use time::now_millis;
pub use types::Cid;
