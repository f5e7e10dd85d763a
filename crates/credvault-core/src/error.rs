//! Error types for credvault core.

use thiserror::Error;

/// Errors raised by the pure credential primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The operating system random source could not provide key material.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// A credential document is missing fields, has wrong types, or is not
    /// in canonical form.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Private key bytes could not be turned into a signing key.
    #[error("invalid signing key: {0}")]
    SigningKey(String),

    /// Signature verification was handed structurally invalid input.
    #[error("invalid verification input: {0}")]
    VerificationInput(String),

    /// A string is not a well-formed DID.
    #[error("invalid DID: {0}")]
    InvalidDid(String),

    /// A content identifier could not be parsed.
    #[error("invalid content identifier: {0}")]
    InvalidCid(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
