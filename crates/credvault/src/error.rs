//! Error types for credential lifecycle operations.

use std::fmt;

use credvault_cipher::CipherError;
use credvault_core::{Cid, CoreError};
use credvault_store::StoreError;
use thiserror::Error;

use crate::issuer::IssuerError;

/// Errors surfaced to callers of the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The random source could not provide key material or a nonce.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// A credential document is missing fields, mistyped or not canonical.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Private key bytes are unusable.
    #[error("invalid signing key: {0}")]
    SigningKey(String),

    /// Verification was handed structurally invalid input.
    #[error("invalid verification input: {0}")]
    VerificationInput(String),

    /// Encryption could not be performed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Wrong holder key or tampered ciphertext.
    #[error("decryption failed")]
    Decryption,

    /// Nothing stored under the handle, locally or remotely.
    #[error("not found: {0}")]
    NotFound(String),

    /// Retries were exhausted.
    #[error("{operation} timed out after {attempts} attempt(s)")]
    Timeout { operation: String, attempts: u32 },

    /// A write to local or remote storage was refused.
    #[error("storage write failed: {0}")]
    StorageWrite(String),

    /// Storage returned bytes that do not hash to the requested handle.
    #[error("content mismatch: expected {expected}, got {actual}")]
    ContentMismatch { expected: Cid, actual: Cid },

    /// The issuer returned a signature that does not verify.
    #[error("issuer signature does not verify")]
    SignatureMismatch,

    /// The issuer refused or failed the request.
    #[error("issuer error: {0}")]
    Issuer(IssuerError),

    /// The caller aborted the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// No identity is persisted on this device.
    #[error("no identity on this device")]
    NoIdentity,

    /// Any other storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// The state machine was driven out of order.
    #[error("illegal state transition: {0}")]
    IllegalTransition(String),
}

impl From<CoreError> for VaultError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Entropy(msg) => VaultError::Entropy(msg),
            CoreError::MalformedDocument(msg) => VaultError::MalformedDocument(msg),
            CoreError::SigningKey(msg) => VaultError::SigningKey(msg),
            CoreError::VerificationInput(msg) => VaultError::VerificationInput(msg),
            CoreError::InvalidDid(did) => VaultError::MalformedDocument(format!("invalid DID: {did}")),
            CoreError::InvalidCid(cid) => VaultError::NotFound(format!("invalid handle: {cid}")),
        }
    }
}

impl From<CipherError> for VaultError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::Entropy(msg) => VaultError::Entropy(msg),
            CipherError::Encryption(msg) => VaultError::Encryption(msg),
            CipherError::Decryption => VaultError::Decryption,
            CipherError::Serialization(msg) => {
                VaultError::MalformedDocument(format!("envelope: {msg}"))
            }
        }
    }
}

impl From<StoreError> for VaultError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(key) => VaultError::NotFound(key),
            StoreError::Write(msg) => VaultError::StorageWrite(msg),
            other => VaultError::Storage(other.to_string()),
        }
    }
}

impl From<IssuerError> for VaultError {
    fn from(e: IssuerError) -> Self {
        VaultError::Issuer(e)
    }
}

/// A step of the Issue or Verify protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Asking the issuer for a signed document.
    Request,
    /// Checking the issuer's document and signature.
    Sign,
    Encrypt,
    Publish,
    /// Writing the vault record.
    Persist,
    Fetch,
    Decrypt,
    Validate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Request => "request",
            Stage::Sign => "sign",
            Stage::Encrypt => "encrypt",
            Stage::Publish => "publish",
            Stage::Persist => "persist",
            Stage::Fetch => "fetch",
            Stage::Decrypt => "decrypt",
            Stage::Validate => "validate",
        };
        f.write_str(name)
    }
}

/// A lifecycle operation that stopped at `stage`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    pub error: VaultError,
}

impl StageFailure {
    pub fn new(stage: Stage, error: impl Into<VaultError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        assert_eq!(
            VaultError::from(StoreError::NotFound("bafk".into())),
            VaultError::NotFound("bafk".into())
        );
        assert_eq!(
            VaultError::from(StoreError::Write("disk full".into())),
            VaultError::StorageWrite("disk full".into())
        );
        assert!(matches!(
            VaultError::from(StoreError::Poisoned("x".into())),
            VaultError::Storage(_)
        ));
    }

    #[test]
    fn test_cipher_errors_map_to_taxonomy() {
        assert_eq!(VaultError::from(CipherError::Decryption), VaultError::Decryption);
        assert!(matches!(
            VaultError::from(CipherError::Entropy("no rng".into())),
            VaultError::Entropy(_)
        ));
    }

    #[test]
    fn test_stage_failure_display() {
        let failure = StageFailure::new(Stage::Decrypt, CipherError::Decryption);
        assert_eq!(failure.to_string(), "decrypt failed: decryption failed");
    }
}
