//! Issuer signatures over canonical credential bytes.
//!
//! The signed message is `SIGN_DOMAIN || Blake3(canonical)`. Verification
//! resolves the issuer's key from its DID, so a signature carries no key
//! material of its own.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{Blake3Hash, Keypair, SIGNATURE_LEN};
use crate::did::Did;
use crate::error::{CoreError, Result};

/// Domain separator for credential signatures.
pub const SIGN_DOMAIN: &[u8] = b"credvault/credential-sig/v1";

/// Supported signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    Ed25519,
}

/// A detached signature bound to one canonical serialization.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub algorithm: SignatureAlgorithm,
    /// DID derived from the signing key.
    pub signer: Did,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.bytes);
        f.debug_struct("Signature")
            .field("algorithm", &self.algorithm)
            .field("signer", &self.signer)
            .field("bytes", &&hex[..hex.len().min(16)])
            .finish()
    }
}

/// Build the message to sign (with domain separation).
pub fn sign_message(canonical: &[u8]) -> Vec<u8> {
    let digest = Blake3Hash::hash(canonical);
    let mut msg = Vec::with_capacity(SIGN_DOMAIN.len() + 32);
    msg.extend_from_slice(SIGN_DOMAIN);
    msg.extend_from_slice(digest.as_bytes());
    msg
}

/// Sign canonical document bytes with an issuer's 32-byte secret key.
///
/// Ed25519 is deterministic: the same key and bytes always produce the
/// same signature.
pub fn sign(canonical: &[u8], issuer_private_key: &[u8]) -> Result<Signature> {
    let keypair = Keypair::from_secret_bytes(issuer_private_key)?;
    Ok(sign_with(canonical, &keypair))
}

/// Sign with an already-parsed keypair.
pub fn sign_with(canonical: &[u8], keypair: &Keypair) -> Signature {
    Signature {
        algorithm: SignatureAlgorithm::Ed25519,
        signer: Did::from_public_key(&keypair.public_key()),
        bytes: keypair.sign(&sign_message(canonical)).to_vec(),
    }
}

/// Check `signature` over `canonical` for the claimed `issuer`.
///
/// Returns `Ok(false)` when the signature does not match, was made by a
/// different signer, or the bytes were altered. Errors are reserved for
/// input that cannot be checked at all.
pub fn verify(canonical: &[u8], signature: &Signature, issuer: &Did) -> Result<bool> {
    let bytes: [u8; SIGNATURE_LEN] = signature.bytes.as_slice().try_into().map_err(|_| {
        CoreError::VerificationInput(format!(
            "signature must be {} bytes, got {}",
            SIGNATURE_LEN,
            signature.bytes.len()
        ))
    })?;

    let public_key = issuer.resolve_public_key()?;

    if signature.signer != *issuer {
        return Ok(false);
    }

    public_key.verify(&sign_message(canonical), &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use proptest::prelude::*;

    const DOC: &[u8] = b"\xa1\x00\x01canonical document";

    #[test]
    fn test_sign_verify() {
        let issuer = Identity::from_seed(&[1u8; 32]);
        let sig = sign(DOC, &issuer.secret_bytes()).unwrap();

        assert_eq!(sig.algorithm, SignatureAlgorithm::Ed25519);
        assert_eq!(&sig.signer, issuer.did());
        assert_eq!(sig.bytes.len(), SIGNATURE_LEN);
        assert!(verify(DOC, &sig, issuer.did()).unwrap());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let issuer = Identity::from_seed(&[2u8; 32]);
        let a = sign(DOC, &issuer.secret_bytes()).unwrap();
        let b = sign(DOC, &issuer.secret_bytes()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_issuer_is_false() {
        let issuer = Identity::from_seed(&[3u8; 32]);
        let other = Identity::from_seed(&[4u8; 32]);
        let sig = sign(DOC, &issuer.secret_bytes()).unwrap();

        assert!(!verify(DOC, &sig, other.did()).unwrap());
    }

    #[test]
    fn test_relabelled_signer_is_false() {
        let issuer = Identity::from_seed(&[5u8; 32]);
        let other = Identity::from_seed(&[6u8; 32]);
        let mut sig = sign(DOC, &issuer.secret_bytes()).unwrap();
        sig.signer = other.did().clone();

        assert!(!verify(DOC, &sig, other.did()).unwrap());
    }

    #[test]
    fn test_bad_key_length() {
        assert!(matches!(
            sign(DOC, &[0u8; 12]),
            Err(CoreError::SigningKey(_))
        ));
    }

    #[test]
    fn test_short_signature_is_input_error() {
        let issuer = Identity::from_seed(&[7u8; 32]);
        let mut sig = sign(DOC, &issuer.secret_bytes()).unwrap();
        sig.bytes.truncate(63);

        assert!(matches!(
            verify(DOC, &sig, issuer.did()),
            Err(CoreError::VerificationInput(_))
        ));
    }

    #[test]
    fn test_unresolvable_issuer_is_input_error() {
        let issuer = Identity::from_seed(&[8u8; 32]);
        let sig = sign(DOC, &issuer.secret_bytes()).unwrap();
        let web = Did::new("did:web:example.com").unwrap();

        assert!(matches!(
            verify(DOC, &sig, &web),
            Err(CoreError::VerificationInput(_))
        ));
    }

    #[test]
    fn test_domain_separation_changes_signature() {
        let keypair = Keypair::from_seed(&[9u8; 32]);
        let with_domain = sign_with(DOC, &keypair);
        let raw = keypair.sign(DOC);
        assert_ne!(with_domain.bytes, raw.to_vec());
    }

    proptest! {
        #[test]
        fn any_single_byte_change_breaks_verification(
            doc in prop::collection::vec(any::<u8>(), 1..128),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let issuer = Identity::from_seed(&[10u8; 32]);
            let sig = sign(&doc, &issuer.secret_bytes()).unwrap();

            let mut tampered = doc.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= flip;

            prop_assert!(verify(&doc, &sig, issuer.did()).unwrap());
            prop_assert!(!verify(&tampered, &sig, issuer.did()).unwrap());
        }
    }
}
