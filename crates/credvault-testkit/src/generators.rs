//! Proptest generators for property-based testing.

use std::collections::BTreeSet;

use proptest::prelude::*;

use credvault_core::{
    ClaimValue, Claims, CredentialDocument, CredentialSubject, Did, Identity, Keypair, PublicKey,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    any::<[u8; 32]>().prop_map(|seed| Identity::from_seed(&seed))
}

/// Generate a random public key.
pub fn public_key() -> impl Strategy<Value = PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a resolvable `did:key` DID.
pub fn key_did() -> impl Strategy<Value = Did> {
    public_key().prop_map(|pk| Did::from_public_key(&pk))
}

/// Generate a DID of some other method.
pub fn opaque_did() -> impl Strategy<Value = Did> {
    ("[a-z]{1,8}", "[A-Za-z0-9.]{1,24}").prop_map(|(method, id)| {
        Did::new(format!("did:{method}:{id}")).expect("generated DID is valid")
    })
}

/// Generate any DID.
pub fn did() -> impl Strategy<Value = Did> {
    prop_oneof![key_did(), opaque_did()]
}

/// Generate a claim value.
pub fn claim_value() -> impl Strategy<Value = ClaimValue> {
    prop_oneof![
        any::<bool>().prop_map(ClaimValue::Bool),
        any::<i64>().prop_map(ClaimValue::Integer),
        "\\PC{0,32}".prop_map(ClaimValue::Text),
    ]
}

/// Generate a claim set.
pub fn claims() -> impl Strategy<Value = Claims> {
    prop::collection::btree_map("[a-zA-Z_][a-zA-Z0-9_]{0,15}", claim_value(), 0..8)
}

/// Generate credential type tags.
pub fn type_tags() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[A-Z][A-Za-z]{0,31}", 0..4)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Parameters for generating a document.
#[derive(Debug, Clone)]
pub struct DocumentParams {
    pub issuer: Did,
    pub subject: Did,
    pub claims: Claims,
    pub issued_at: i64,
    pub types: BTreeSet<String>,
}

impl Arbitrary for DocumentParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (did(), did(), claims(), any::<i64>(), type_tags())
            .prop_map(|(issuer, subject, claims, issued_at, types)| DocumentParams {
                issuer,
                subject,
                claims,
                issued_at,
                types,
            })
            .boxed()
    }
}

/// Build a document from parameters, exactly as given.
pub fn document_from_params(params: &DocumentParams) -> CredentialDocument {
    CredentialDocument {
        issuer: params.issuer.clone(),
        subject: CredentialSubject {
            id: params.subject.clone(),
            claims: params.claims.clone(),
        },
        issued_at: params.issued_at,
        types: params.types.clone(),
    }
}
