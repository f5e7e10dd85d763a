//! Golden signing vectors for cross-implementation verification.
//!
//! Every implementation of credvault must produce identical:
//! - canonical document bytes
//! - signed_message (SIGN_DOMAIN || blake3(canonical))
//! - signature (deterministic Ed25519)
//! - document cid

use credvault::core::signature::{sign, sign_message, verify, SIGN_DOMAIN};
use credvault::core::{
    canonicalize, parse, Cid, ClaimValue, CredentialBuilder, CredentialDocument, CoreError, Did,
    Identity,
};
use serde::Serialize;

/// A single golden vector.
#[derive(Debug, Serialize)]
pub struct GoldenVector {
    pub name: String,
    pub description: String,

    // Inputs
    pub issuer_seed: String, // 32 bytes hex
    pub issuer_did: String,  // derived
    pub subject: String,
    pub issued_at: i64,

    // Derived outputs (hex except cid)
    pub canonical: String,
    pub signed_message: String,
    pub signature: String,
    pub cid: String,
}

fn generate_vector(
    name: &str,
    description: &str,
    seed: [u8; 32],
    build: impl FnOnce(Did) -> CredentialDocument,
) -> GoldenVector {
    let issuer = Identity::from_seed(&seed);
    let document = build(issuer.did().clone());

    let canonical = canonicalize(&document);
    let signature = sign(&canonical, &seed).unwrap();

    GoldenVector {
        name: name.to_string(),
        description: description.to_string(),
        issuer_seed: hex::encode(seed),
        issuer_did: issuer.did().to_string(),
        subject: document.subject.id.to_string(),
        issued_at: document.issued_at,
        canonical: hex::encode(&canonical),
        signed_message: hex::encode(sign_message(&canonical)),
        signature: hex::encode(&signature.bytes),
        cid: Cid::for_bytes(&canonical).to_string(),
    }
}

fn did(s: &str) -> Did {
    Did::new(s).unwrap()
}

pub fn generate_all_vectors() -> Vec<GoldenVector> {
    vec![
        generate_vector(
            "no_claims",
            "Base type only, no claims, epoch timestamp",
            [0x01; 32],
            |issuer| CredentialBuilder::new(issuer, did("did:example:abc")).build(),
        ),
        generate_vector(
            "university_degree",
            "The degree credential from the usage guide",
            [0x02; 32],
            |issuer| {
                CredentialBuilder::new(issuer, did("did:example:abc"))
                    .claim("degree", "BSc")
                    .with_type("UniversityDegreeCredential")
                    .issued_at(1_767_225_600_000)
                    .build()
            },
        ),
        generate_vector(
            "mixed_claims",
            "Text, integer and boolean claims including a negative integer",
            [0x03; 32],
            |issuer| {
                CredentialBuilder::new(issuer, did("did:example:holder"))
                    .claim("name", "Ada")
                    .claim("age", 36i64)
                    .claim("balance", -1200i64)
                    .claim("verified", true)
                    .issued_at(1_736_870_400_000)
                    .build()
            },
        ),
        generate_vector(
            "key_subject",
            "Subject is itself a did:key",
            [0x04; 32],
            |issuer| {
                let subject = Identity::from_seed(&[0x05; 32]).did().clone();
                CredentialBuilder::new(issuer, subject)
                    .claim("member", true)
                    .with_type("MembershipCredential")
                    .with_type("AlumniCredential")
                    .issued_at(1)
                    .build()
            },
        ),
        generate_vector(
            "unicode_claim",
            "Non-ASCII claim text",
            [0x06; 32],
            |issuer| {
                CredentialBuilder::new(issuer, did("did:example:abc"))
                    .claim("city", "Zürich")
                    .issued_at(1_767_225_600_000)
                    .build()
            },
        ),
    ]
}

#[test]
fn test_vectors_deterministic() {
    let v1 = generate_all_vectors();
    let v2 = generate_all_vectors();

    for (a, b) in v1.iter().zip(v2.iter()) {
        assert_eq!(a.canonical, b.canonical, "canonical mismatch for {}", a.name);
        assert_eq!(a.signature, b.signature, "signature mismatch for {}", a.name);
        assert_eq!(a.cid, b.cid, "cid mismatch for {}", a.name);
    }
}

#[test]
fn test_vectors_verify() {
    for v in generate_all_vectors() {
        let canonical = hex::decode(&v.canonical).unwrap();
        let document = parse(&canonical).unwrap();
        assert_eq!(document.issuer.as_str(), v.issuer_did, "{}", v.name);

        let seed: [u8; 32] = hex::decode(&v.issuer_seed).unwrap().try_into().unwrap();
        let signature = sign(&canonical, &seed).unwrap();
        assert_eq!(hex::encode(&signature.bytes), v.signature, "{}", v.name);
        assert!(verify(&canonical, &signature, &document.issuer).unwrap(), "{}", v.name);

        assert_eq!(v.cid.parse::<Cid>().unwrap(), Cid::for_bytes(&canonical));
    }
}

#[test]
fn test_domain_prefix_exact_bytes() {
    assert_eq!(SIGN_DOMAIN, b"credvault/credential-sig/v1");

    let canonical = canonicalize(
        &CredentialBuilder::new(did("did:x:i"), did("did:x:s")).build(),
    );
    let message = sign_message(&canonical);
    assert_eq!(message.len(), SIGN_DOMAIN.len() + 32);
    assert_eq!(&message[..SIGN_DOMAIN.len()], SIGN_DOMAIN);
    assert_eq!(
        &message[SIGN_DOMAIN.len()..],
        blake3_of(&canonical).as_slice()
    );
}

fn blake3_of(bytes: &[u8]) -> [u8; 32] {
    *credvault::core::Blake3Hash::hash(bytes).as_bytes()
}

#[test]
fn print_golden_vectors_json() {
    #[derive(Serialize)]
    struct VectorFile {
        version: String,
        description: String,
        domain_sign: String,
        vectors: Vec<GoldenVector>,
    }

    let file = VectorFile {
        version: "0.1.0".to_string(),
        description: "Golden signing vectors for credvault documents.".to_string(),
        domain_sign: String::from_utf8_lossy(SIGN_DOMAIN).to_string(),
        vectors: generate_all_vectors(),
    };

    let json = serde_json::to_string_pretty(&file).unwrap();
    assert!(json.contains("university_degree"));
    println!("{}", json);
}

// =============================================================================
// REJECTION VECTORS
// =============================================================================

#[test]
fn test_reject_non_canonical_map_order() {
    // {1: .., 0: 1, ...}: version and issuer swapped.
    let canonical = canonicalize(
        &CredentialBuilder::new(did("did:x:i"), did("did:x:s")).build(),
    );
    let mut swapped = vec![canonical[0]];
    swapped.extend_from_slice(&canonical[3..12]);
    swapped.extend_from_slice(&canonical[1..3]);
    swapped.extend_from_slice(&canonical[12..]);
    assert_eq!(swapped.len(), canonical.len());

    assert!(matches!(parse(&swapped), Err(CoreError::MalformedDocument(_))));
}

#[test]
fn test_reject_short_signature() {
    let issuer = Identity::from_seed(&[0x01; 32]);
    let canonical = canonicalize(
        &CredentialBuilder::new(issuer.did().clone(), did("did:x:s")).build(),
    );
    let mut signature = sign(&canonical, &issuer.secret_bytes()).unwrap();
    signature.bytes.truncate(63);

    assert!(matches!(
        verify(&canonical, &signature, issuer.did()),
        Err(CoreError::VerificationInput(_))
    ));
}

#[test]
fn test_reject_unresolvable_issuer() {
    let issuer = Identity::from_seed(&[0x01; 32]);
    let canonical = canonicalize(
        &CredentialBuilder::new(did("did:web:example.org"), did("did:x:s")).build(),
    );
    let signature = sign(&canonical, &issuer.secret_bytes()).unwrap();

    assert!(matches!(
        verify(&canonical, &signature, &did("did:web:example.org")),
        Err(CoreError::VerificationInput(_))
    ));
}

#[test]
fn test_reject_bad_private_key() {
    assert!(matches!(
        sign(b"doc", &[0u8; 31]),
        Err(CoreError::SigningKey(_))
    ));
}

#[test]
fn test_claim_value_types() {
    let doc = CredentialBuilder::new(did("did:x:i"), did("did:x:s"))
        .claim("t", "x")
        .claim("i", 7i64)
        .claim("b", false)
        .build();
    let parsed = parse(&canonicalize(&doc)).unwrap();
    assert_eq!(parsed.claim("t"), Some(&ClaimValue::Text("x".into())));
    assert_eq!(parsed.claim("i"), Some(&ClaimValue::Integer(7)));
    assert_eq!(parsed.claim("b"), Some(&ClaimValue::Bool(false)));
}
