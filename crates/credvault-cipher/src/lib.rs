//! # credvault cipher
//!
//! Symmetric sealing of credentials for private storage.
//!
//! ## Encryption Model
//!
//! 1. **Vault Key**: Blake3 `derive_key` over the holder's private key
//! 2. **Envelope**: ChaCha20-Poly1305 ciphertext with a fresh 96-bit nonce
//!
//! Only the holder can reopen an envelope. Decryption failures never say
//! whether the key was wrong or the bytes were altered.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use credvault_cipher::{derive_key, EncryptedEnvelope};
//!
//! let key = derive_key(&[0u8; 32]);
//! let envelope = EncryptedEnvelope::encrypt(b"credential", &key).unwrap();
//! assert_eq!(envelope.decrypt(&key).unwrap(), b"credential");
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;

pub use crypto::{derive_key, VaultKey, VaultNonce, VAULT_KEY_CONTEXT};
pub use envelope::{EncryptedEnvelope, EncryptionFormat};
pub use error::{CipherError, Result};
