//! The issuer signing service.
//!
//! The holder never signs its own credentials. It sends an
//! [`IssuanceRequest`] to an [`IssuerService`] and checks what comes back.
//! [`LocalIssuer`] is an in-process issuer holding its own identity.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use credvault_core::{
    now_millis, signature, Claims, CredentialBuilder, CredentialDocument, Did, Identity,
    PublicKey, Signature,
};
use thiserror::Error;
use tracing::info;

/// What the holder asks the issuer to attest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceRequest {
    pub subject: Did,
    pub subject_public_key: PublicKey,
    pub claims: Claims,
    /// Extra type tags on top of the base credential type.
    pub types: BTreeSet<String>,
}

/// A signed document from the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceResponse {
    pub document: CredentialDocument,
    pub signature: Signature,
}

/// Errors reported by an issuer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssuerError {
    /// The issuer could not be reached. Safe to retry.
    #[error("issuer unavailable: {0}")]
    Unavailable(String),

    /// The issuer refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The issuer failed while handling the request.
    #[error("issuer internal error: {0}")]
    Internal(String),
}

impl IssuerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, IssuerError::Unavailable(_))
    }
}

/// Signs credential documents on request.
///
/// Implementations must tolerate duplicate requests: the lifecycle retries
/// on timeout, and a duplicate issuance only produces another record.
#[async_trait]
pub trait IssuerService: Send + Sync {
    async fn issue(&self, request: IssuanceRequest) -> Result<IssuanceResponse, IssuerError>;
}

#[async_trait]
impl<T: IssuerService + ?Sized> IssuerService for Arc<T> {
    async fn issue(&self, request: IssuanceRequest) -> Result<IssuanceResponse, IssuerError> {
        (**self).issue(request).await
    }
}

/// Time source for issuance timestamps (Unix ms).
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// An issuer running in-process with its own keypair.
pub struct LocalIssuer {
    identity: Identity,
    clock: Clock,
}

impl LocalIssuer {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            clock: Arc::new(now_millis),
        }
    }

    /// Stamp every document with `issued_at`.
    pub fn with_fixed_time(mut self, issued_at: i64) -> Self {
        self.clock = Arc::new(move || issued_at);
        self
    }

    pub fn did(&self) -> &Did {
        self.identity.did()
    }
}

#[async_trait]
impl IssuerService for LocalIssuer {
    async fn issue(&self, request: IssuanceRequest) -> Result<IssuanceResponse, IssuerError> {
        // A did:key subject must commit to the key presented with it.
        if let Ok(key) = request.subject.resolve_public_key() {
            if key != request.subject_public_key {
                return Err(IssuerError::Rejected(format!(
                    "{} does not match the presented public key",
                    request.subject
                )));
            }
        }

        let mut builder = CredentialBuilder::new(self.identity.did().clone(), request.subject)
            .claims(request.claims)
            .issued_at((self.clock)());
        for tag in request.types {
            builder = builder.with_type(tag);
        }
        let document = builder.build();

        let signature = signature::sign_with(&document.canonical_bytes(), self.identity.keypair());

        info!(issuer = %self.identity.did(), subject = %document.subject.id, "issued credential");

        Ok(IssuanceResponse {
            document,
            signature,
        })
    }
}
