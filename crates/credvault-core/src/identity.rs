//! Holder and issuer identities.
//!
//! An [`Identity`] is a keypair plus the two values derived from its public
//! key: the DID and a short address. Both derivations are pure, so an
//! identity recreated from its secret key is indistinguishable from the
//! original.

use std::fmt;

use crate::crypto::{Blake3Hash, Keypair, PublicKey, SECRET_KEY_LEN};
use crate::did::Did;
use crate::error::Result;

/// Number of hash bytes kept in an address.
pub const ADDRESS_LEN: usize = 20;

/// A keypair with its derived DID and address.
#[derive(Clone)]
pub struct Identity {
    keypair: Keypair,
    did: Did,
    address: String,
}

impl Identity {
    /// Generate a fresh identity.
    ///
    /// Fails with [`CoreError::Entropy`](crate::CoreError::Entropy) when the
    /// random source is unavailable.
    pub fn generate() -> Result<Self> {
        Ok(Self::from_keypair(Keypair::generate()?))
    }

    /// Recreate an identity from its 32-byte secret key.
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        Ok(Self::from_keypair(Keypair::from_secret_bytes(secret)?))
    }

    /// Create from a fixed seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LEN]) -> Self {
        Self::from_keypair(Keypair::from_seed(seed))
    }

    fn from_keypair(keypair: Keypair) -> Self {
        let public_key = keypair.public_key();
        Self {
            did: did_from_public_key(&public_key),
            address: address_from_public_key(&public_key),
            keypair,
        }
    }

    /// The identity's DID.
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// Short public fingerprint.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The public key.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// The underlying keypair.
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Raw secret key bytes. Never leaves the holder's device.
    pub fn secret_bytes(&self) -> [u8; SECRET_KEY_LEN] {
        self.keypair.secret_bytes()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("did", &self.did)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for Identity {}

/// Derive the DID for a public key.
pub fn did_from_public_key(public_key: &PublicKey) -> Did {
    Did::from_public_key(public_key)
}

/// Derive the address for a public key: `0x` + hex of the first 20 bytes of
/// Blake3(public key).
pub fn address_from_public_key(public_key: &PublicKey) -> String {
    let hash = Blake3Hash::hash(public_key.as_bytes());
    format!("0x{}", hex::encode(&hash.as_bytes()[..ADDRESS_LEN]))
}
