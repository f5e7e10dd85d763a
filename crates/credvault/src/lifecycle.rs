//! The credential lifecycle: Issue and Verify.
//!
//! Issue asks the issuer for a signed document, checks it, encrypts its
//! canonical bytes under the holder's vault key, publishes the envelope to
//! the content store and finally writes a [`VaultRecord`]. Verify walks the
//! same path backwards.
//!
//! Operations on one lifecycle are serialized. Only the issuer and content
//! store calls suspend, and both honour the configured timeouts, retries
//! and a caller's [`CancelToken`]. The vault record is always the last
//! write, so an aborted or dropped operation leaves nothing behind.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use credvault_cipher::{EncryptedEnvelope, VaultKey};
use credvault_core::{
    canonical, now_millis, signature, Cid, ClaimValue, Claims, Did, Identity, Signature,
};
use credvault_store::{ContentStore, DeviceStore};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::LifecycleConfig;
use crate::error::{Result, Stage, StageFailure, VaultError};
use crate::issuer::{IssuanceRequest, IssuanceResponse, IssuerService};
use crate::record::VaultRecord;
use crate::retry::{CancelToken, RetryPolicy};
use crate::state::{IssueState, Machine, VerifyState};
use crate::wallet::Wallet;

/// What the holder wants attested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialRequest {
    /// Defaults to the holder's own DID.
    pub subject: Option<Did>,
    pub claims: Claims,
    pub types: BTreeSet<String>,
}

impl CredentialRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the credential for another DID the holder controls.
    pub fn subject(mut self, subject: Did) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn claim(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    pub fn with_type(mut self, tag: impl Into<String>) -> Self {
        self.types.insert(tag.into());
        self
    }
}

/// Why a credential was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The signature does not verify for the document's issuer.
    SignatureMismatch,
    /// The local record names a different issuer than the document.
    IssuerMismatch,
    /// The subject is a `did:key` of someone other than this holder.
    SubjectMismatch,
    /// No signature is known for this handle.
    MissingSignature,
}

/// Outcome of a completed Verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub handle: Cid,
    pub verified: bool,
    pub issuer: Did,
    pub subject: Did,
    pub types: BTreeSet<String>,
    pub claims: Claims,
    pub issued_at: i64,
    /// Set exactly when `verified` is false.
    pub reason: Option<RejectReason>,
}

/// Issue and Verify for one holder identity.
pub struct CredentialLifecycle {
    identity: Identity,
    vault_key: VaultKey,
    wallet: Wallet,
    content: Arc<dyn ContentStore>,
    issuer: Arc<dyn IssuerService>,
    config: LifecycleConfig,
    op_lock: Mutex<()>,
}

impl CredentialLifecycle {
    /// Open the lifecycle for the identity on `device`, creating one if the
    /// device has none yet.
    pub fn open(
        device: Arc<dyn DeviceStore>,
        content: Arc<dyn ContentStore>,
        issuer: Arc<dyn IssuerService>,
        config: LifecycleConfig,
    ) -> Result<Self> {
        let wallet = Wallet::new(device);
        let identity = wallet.load_or_create_identity()?;
        info!(did = %identity.did(), address = identity.address(), "opened credential lifecycle");

        Ok(Self {
            vault_key: VaultKey::for_identity(&identity),
            identity,
            wallet,
            content,
            issuer,
            config,
            op_lock: Mutex::new(()),
        })
    }

    /// The holder identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Issue
    // ─────────────────────────────────────────────────────────────────────────

    /// Obtain, seal, publish and record a credential.
    pub async fn issue(
        &self,
        request: CredentialRequest,
    ) -> std::result::Result<VaultRecord, StageFailure> {
        self.issue_with_cancel(request, &CancelToken::new()).await
    }

    /// [`issue`](Self::issue), abortable through `cancel`.
    pub async fn issue_with_cancel(
        &self,
        request: CredentialRequest,
        cancel: &CancelToken,
    ) -> std::result::Result<VaultRecord, StageFailure> {
        let mut machine = Machine::<IssueState>::new();

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(machine.fail(VaultError::Cancelled)),
            guard = self.op_lock.lock() => guard,
        };

        let issuance = IssuanceRequest {
            subject: request
                .subject
                .unwrap_or_else(|| self.identity.did().clone()),
            subject_public_key: self.identity.public_key(),
            claims: request.claims,
            types: request.types,
        };

        // Request
        let response = RetryPolicy::for_issuer(&self.config)
            .run("issuer.issue", cancel, || self.issuer.issue(issuance.clone()))
            .await
            .map_err(|e| machine.fail(e))?;
        machine.advance(IssueState::Requested)?;

        // Sign
        let canonical = check_issuance(&issuance, &response).map_err(|e| machine.fail(e))?;
        machine.advance(IssueState::Signed)?;

        // Encrypt
        let envelope: Bytes = EncryptedEnvelope::encrypt(&canonical, &self.vault_key)
            .and_then(|env| env.to_bytes())
            .map_err(|e| machine.fail(e))?;
        machine.advance(IssueState::Encrypted)?;

        // Publish
        let expected = Cid::for_bytes(&envelope);
        let handle = RetryPolicy::for_store(&self.config)
            .run("content.put", cancel, || self.content.put(envelope.clone()))
            .await
            .map_err(|e| machine.fail(e))?;
        if handle != expected {
            return Err(machine.fail(VaultError::ContentMismatch {
                expected,
                actual: handle,
            }));
        }
        machine.advance(IssueState::Published)?;

        // Persist
        if cancel.is_cancelled() {
            return Err(machine.fail(VaultError::Cancelled));
        }
        let IssuanceResponse {
            document,
            signature: issuer_signature,
        } = response;
        let mut record = VaultRecord::new(handle, &document, issuer_signature, now_millis());
        if self.config.cache_envelopes {
            record = record.with_envelope(envelope.to_vec());
        }
        self.wallet
            .put_record(record.clone())
            .map_err(|e| machine.fail(e))?;
        machine.advance(IssueState::Done)?;

        info!(%handle, issuer = %record.issuer, subject = %record.subject, "credential issued");
        Ok(record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verify
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch, decrypt and check the credential stored under `handle`.
    pub async fn verify(
        &self,
        handle: &Cid,
    ) -> std::result::Result<VerificationReport, StageFailure> {
        self.run_verify(handle, None, &CancelToken::new()).await
    }

    /// [`verify`](Self::verify), abortable through `cancel`.
    pub async fn verify_with_cancel(
        &self,
        handle: &Cid,
        cancel: &CancelToken,
    ) -> std::result::Result<VerificationReport, StageFailure> {
        self.run_verify(handle, None, cancel).await
    }

    /// Verify a handle against an explicitly supplied signature, for
    /// envelopes this device holds no record of.
    pub async fn verify_handle_with(
        &self,
        handle: &Cid,
        signature: &Signature,
    ) -> std::result::Result<VerificationReport, StageFailure> {
        self.run_verify(handle, Some(signature), &CancelToken::new())
            .await
    }

    async fn run_verify(
        &self,
        handle: &Cid,
        supplied: Option<&Signature>,
        cancel: &CancelToken,
    ) -> std::result::Result<VerificationReport, StageFailure> {
        let mut machine = Machine::<VerifyState>::new();

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(machine.fail(VaultError::Cancelled)),
            guard = self.op_lock.lock() => guard,
        };

        // Fetch
        machine.advance(VerifyState::Fetching)?;
        let record = self.wallet.record(handle).map_err(|e| machine.fail(e))?;
        let bytes = match record.as_ref().and_then(|r| r.envelope.clone()) {
            Some(cached) => Bytes::from(cached),
            None => RetryPolicy::for_store(&self.config)
                .run("content.get", cancel, || self.content.get(handle))
                .await
                .map_err(|e| machine.fail(e))?,
        };
        let actual = Cid::for_bytes(&bytes);
        if actual != *handle {
            return Err(machine.fail(VaultError::ContentMismatch {
                expected: *handle,
                actual,
            }));
        }

        // Decrypt
        machine.advance(VerifyState::Decrypting)?;
        let plaintext = EncryptedEnvelope::from_bytes(&bytes)
            .map_err(|_| VaultError::Decryption)
            .and_then(|env| env.decrypt(&self.vault_key).map_err(VaultError::from))
            .map_err(|e| machine.fail(e))?;

        // Validate
        machine.advance(VerifyState::Validating)?;
        let document = canonical::parse(&plaintext).map_err(|e| machine.fail(e))?;

        let signature = supplied
            .cloned()
            .or_else(|| record.as_ref().map(|r| r.signature.clone()));

        let reason = match (&record, signature) {
            (Some(r), _) if r.issuer != document.issuer => Some(RejectReason::IssuerMismatch),
            _ if !self.holds_subject(&document.subject.id) => {
                Some(RejectReason::SubjectMismatch)
            }
            (_, None) => Some(RejectReason::MissingSignature),
            (_, Some(sig)) => {
                let canonical = canonical::canonicalize(&document);
                match signature::verify(&canonical, &sig, &document.issuer) {
                    Ok(true) => None,
                    Ok(false) => Some(RejectReason::SignatureMismatch),
                    Err(e) => return Err(machine.fail(e)),
                }
            }
        };

        let verified = reason.is_none();
        if verified {
            machine.advance(VerifyState::Verified)?;
            info!(%handle, issuer = %document.issuer, "credential verified");
        } else {
            machine.advance(VerifyState::Rejected)?;
            warn!(%handle, issuer = %document.issuer, ?reason, "credential rejected");
        }

        Ok(VerificationReport {
            handle: *handle,
            verified,
            issuer: document.issuer,
            subject: document.subject.id,
            types: document.types,
            claims: document.subject.claims,
            issued_at: document.issued_at,
            reason,
        })
    }

    /// Whether this holder may present a credential about `subject`.
    ///
    /// A `did:key` subject must be the holder's own key. Other DID methods
    /// cannot be resolved here; they were bound to this holder when the
    /// credential was requested and are accepted.
    fn holds_subject(&self, subject: &Did) -> bool {
        subject
            .resolve_public_key()
            .map_or(true, |key| key == self.identity.public_key())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────

    /// All credentials recorded on this device.
    pub fn list_credentials(&self) -> Result<Vec<VaultRecord>> {
        self.wallet.records()
    }

    pub fn get_credential(&self, handle: &Cid) -> Result<Option<VaultRecord>> {
        self.wallet.record(handle)
    }

    /// Forget a credential locally. The published envelope is untouched.
    pub async fn remove_credential(&self, handle: &Cid) -> Result<bool> {
        let _guard = self.op_lock.lock().await;
        let removed = self.wallet.remove_record(handle)?;
        if removed {
            info!(%handle, "credential removed");
        }
        Ok(removed)
    }
}

/// Check an issuer response against the request; returns the canonical
/// bytes that were signed.
fn check_issuance(request: &IssuanceRequest, response: &IssuanceResponse) -> Result<Vec<u8>> {
    let document = &response.document;

    if document.subject.id != request.subject {
        return Err(VaultError::MalformedDocument(format!(
            "issued for {} instead of {}",
            document.subject.id, request.subject
        )));
    }
    if document.subject.claims != request.claims {
        return Err(VaultError::MalformedDocument(
            "issued claims differ from the request".into(),
        ));
    }
    if !request.types.is_subset(&document.types) {
        return Err(VaultError::MalformedDocument(
            "issued document is missing requested types".into(),
        ));
    }

    let canonical = canonical::canonicalize(document);
    if signature::verify(&canonical, &response.signature, &document.issuer)? {
        Ok(canonical)
    } else {
        Err(VaultError::SignatureMismatch)
    }
}
