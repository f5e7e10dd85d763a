//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical document encoding and the `did:key`
//! derivation, so that every implementation signs and hashes the same
//! bytes.

use credvault_core::{
    canonicalize, ClaimValue, CredentialDocument, CredentialSubject, Did, Identity,
};

/// A claim value in a vector.
#[derive(Debug, Clone, Copy)]
pub enum VectorClaim {
    Text(&'static str),
    Integer(i64),
    Bool(bool),
}

impl From<VectorClaim> for ClaimValue {
    fn from(claim: VectorClaim) -> Self {
        match claim {
            VectorClaim::Text(s) => ClaimValue::Text(s.to_string()),
            VectorClaim::Integer(i) => ClaimValue::Integer(i),
            VectorClaim::Bool(b) => ClaimValue::Bool(b),
        }
    }
}

/// A document with its expected canonical encoding.
#[derive(Debug, Clone)]
pub struct CanonicalVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub issuer: &'static str,
    pub subject: &'static str,
    pub claims: &'static [(&'static str, VectorClaim)],
    pub issued_at: i64,
    pub types: &'static [&'static str],
    /// Expected canonical bytes (hex).
    pub expected_canonical: &'static str,
}

impl CanonicalVector {
    /// Build the document described by this vector.
    pub fn document(&self) -> CredentialDocument {
        CredentialDocument {
            issuer: Did::new(self.issuer).expect("vector issuer is a DID"),
            subject: CredentialSubject {
                id: Did::new(self.subject).expect("vector subject is a DID"),
                claims: self
                    .claims
                    .iter()
                    .map(|(name, value)| (name.to_string(), ClaimValue::from(*value)))
                    .collect(),
            },
            issued_at: self.issued_at,
            types: self.types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Get all canonical encoding vectors.
pub fn all_vectors() -> Vec<CanonicalVector> {
    vec![
        CanonicalVector {
            name: "minimal",
            issuer: "did:x:i",
            subject: "did:x:s",
            claims: &[("a", VectorClaim::Text("b"))],
            issued_at: 0,
            types: &["T"],
            expected_canonical: "a6000101676469643a783a6902676469643a783a7303a161616162040005816154",
        },
        CanonicalVector {
            name: "university degree",
            issuer: "did:example:university",
            subject: "did:example:abc",
            claims: &[("degree", VectorClaim::Text("BSc"))],
            issued_at: 1_767_225_600_000, // 2026-01-01T00:00:00Z
            types: &["VerifiableCredential", "UniversityDegreeCredential"],
            expected_canonical: concat!(
                "a6000101766469643a6578616d706c653a756e6976657273697479",
                "026f6469643a6578616d706c653a616263",
                "03a16664656772656563425363",
                "041b0000019b76daa800",
                "0582781a556e697665727369747944656772656543726564656e7469616c",
                "7456657269666961626c6543726564656e7469616c"
            ),
        },
        CanonicalVector {
            name: "mixed claim types",
            issuer: "did:example:issuer",
            subject: "did:example:holder",
            claims: &[
                ("age", VectorClaim::Integer(42)),
                ("over18", VectorClaim::Bool(true)),
                ("name", VectorClaim::Text("Ada")),
                ("delta", VectorClaim::Integer(-5)),
            ],
            issued_at: 0,
            types: &["VerifiableCredential"],
            // Claim keys sort by encoded length first: age, name, delta, over18.
            expected_canonical: concat!(
                "a6000101726469643a6578616d706c653a697373756572",
                "02726469643a6578616d706c653a686f6c646572",
                "03a463616765182a646e616d65634164616564656c746124666f7665723138f5",
                "0400",
                "05817456657269666961626c6543726564656e7469616c"
            ),
        },
        CanonicalVector {
            name: "no claims, negative time",
            issuer: "did:example:i",
            subject: "did:example:s",
            claims: &[],
            issued_at: -1,
            types: &["VerifiableCredential"],
            expected_canonical: concat!(
                "a60001016d6469643a6578616d706c653a69",
                "026d6469643a6578616d706c653a73",
                "03a0",
                "0420",
                "05817456657269666961626c6543726564656e7469616c"
            ),
        },
    ]
}

/// Verify all vectors encode to their expected bytes.
///
/// Returns `(name, matches, actual_hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let hex = hex::encode(canonicalize(&v.document()));
            (v.name.to_string(), hex == v.expected_canonical, hex)
        })
        .collect()
}

/// A seed with its expected `did:key`.
#[derive(Debug, Clone)]
pub struct KeyVector {
    pub seed: [u8; 32],
    pub expected_did: &'static str,
}

/// Get all key derivation vectors.
pub fn key_vectors() -> Vec<KeyVector> {
    vec![KeyVector {
        seed: [0x42; 32],
        expected_did: "did:key:fed012152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
    }]
}

/// Derive the identity described by a key vector.
pub fn identity_from_vector(vector: &KeyVector) -> Identity {
    Identity::from_seed(&vector.seed)
}
