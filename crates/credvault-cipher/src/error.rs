//! Error types for the vault cipher.

use thiserror::Error;

/// Errors raised while sealing or opening credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// The random source could not provide a nonce.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Wrong key or tampered ciphertext. The two cases are indistinguishable.
    #[error("decryption failed")]
    Decryption,

    /// Envelope bytes could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for cipher operations.
pub type Result<T> = std::result::Result<T, CipherError>;
