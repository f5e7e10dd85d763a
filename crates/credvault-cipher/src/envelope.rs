//! Encrypted credential envelope.
//!
//! A serialized credential is sealed into an [`EncryptedEnvelope`] before it
//! leaves the holder. The envelope's CBOR bytes are what the content store
//! sees and what the storage handle is computed over.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::crypto::{VaultKey, VaultNonce, TAG_LEN};
use crate::error::{CipherError, Result};

/// Format identifier for encrypted envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EncryptionFormat {
    /// ChaCha20-Poly1305 with 256-bit key.
    ChaCha20Poly1305 = 1,
}

/// Ciphertext plus the metadata needed to open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// Encryption algorithm used.
    pub format: EncryptionFormat,

    /// Fresh per encryption.
    pub nonce: VaultNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Encrypt plaintext under a fresh random nonce.
    pub fn encrypt(plaintext: &[u8], key: &VaultKey) -> Result<Self> {
        let nonce = VaultNonce::generate()?;
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        Ok(Self {
            format: EncryptionFormat::ChaCha20Poly1305,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt with the given key.
    ///
    /// Any failure, whether a wrong key or altered bytes, is reported as
    /// [`CipherError::Decryption`].
    pub fn decrypt(&self, key: &VaultKey) -> Result<Vec<u8>> {
        if self.ciphertext.len() < TAG_LEN {
            return Err(CipherError::Decryption);
        }
        match self.format {
            EncryptionFormat::ChaCha20Poly1305 => key.decrypt(&self.ciphertext, &self.nonce),
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CipherError::Serialization(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CipherError::Serialization(e.to_string()))
    }

    /// Get the size of the ciphertext.
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}
