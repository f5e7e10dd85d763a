//! Fault-injecting stores and issuers.
//!
//! Each double wraps a working implementation and breaks it in one
//! specific way, so lifecycle tests can drive every failure path.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use credvault::{IssuanceRequest, IssuanceResponse, IssuerError, IssuerService};
use credvault_core::{Cid, ClaimValue};
use credvault_store::{ContentStore, MemoryContentStore, Result, StoreError};

// ─────────────────────────────────────────────────────────────────────────────
// Content stores
// ─────────────────────────────────────────────────────────────────────────────

/// Fails the first `failures` calls with [`StoreError::Unavailable`].
#[derive(Debug, Default)]
pub struct FlakyContentStore {
    inner: MemoryContentStore,
    failures_left: AtomicU32,
    calls: AtomicU32,
}

impl FlakyContentStore {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: MemoryContentStore::new(),
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    /// Total calls seen, failed or not.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn trip(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tripped = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(StoreError::Unavailable("injected outage".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContentStore for FlakyContentStore {
    async fn put(&self, bytes: Bytes) -> Result<Cid> {
        self.trip()?;
        self.inner.put(bytes).await
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes> {
        self.trip()?;
        self.inner.get(cid).await
    }

    async fn has(&self, cid: &Cid) -> Result<bool> {
        self.trip()?;
        self.inner.has(cid).await
    }
}

/// Sleeps before every call.
#[derive(Debug)]
pub struct SlowContentStore {
    inner: MemoryContentStore,
    delay: Duration,
}

impl SlowContentStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryContentStore::new(),
            delay,
        }
    }

    /// Whether anything reached the backing store.
    pub fn is_empty(&self) -> Result<bool> {
        self.inner.is_empty()
    }
}

#[async_trait]
impl ContentStore for SlowContentStore {
    async fn put(&self, bytes: Bytes) -> Result<Cid> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(bytes).await
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(cid).await
    }

    async fn has(&self, cid: &Cid) -> Result<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.has(cid).await
    }
}

/// How a [`LyingContentStore`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lie {
    /// `put` reports a handle for different bytes.
    Handle,
    /// `get` returns the stored bytes with one bit flipped.
    Content,
}

/// Returns results that do not match what was stored.
#[derive(Debug)]
pub struct LyingContentStore {
    inner: MemoryContentStore,
    lie: Lie,
}

impl LyingContentStore {
    pub fn new(lie: Lie) -> Self {
        Self {
            inner: MemoryContentStore::new(),
            lie,
        }
    }
}

#[async_trait]
impl ContentStore for LyingContentStore {
    async fn put(&self, bytes: Bytes) -> Result<Cid> {
        let cid = self.inner.put(bytes).await?;
        match self.lie {
            Lie::Handle => Ok(Cid::for_bytes(cid.to_string().as_bytes())),
            Lie::Content => Ok(cid),
        }
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes> {
        let bytes = self.inner.get(cid).await?;
        match self.lie {
            Lie::Handle => Ok(bytes),
            Lie::Content => {
                let mut altered = bytes.to_vec();
                if let Some(last) = altered.last_mut() {
                    *last ^= 0x01;
                }
                Ok(Bytes::from(altered))
            }
        }
    }

    async fn has(&self, cid: &Cid) -> Result<bool> {
        self.inner.has(cid).await
    }
}

/// Refuses every write with [`StoreError::Write`].
#[derive(Debug, Default)]
pub struct ReadOnlyContentStore {
    inner: MemoryContentStore,
}

impl ReadOnlyContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for ReadOnlyContentStore {
    async fn put(&self, _bytes: Bytes) -> Result<Cid> {
        Err(StoreError::Write("store is read-only".into()))
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes> {
        self.inner.get(cid).await
    }

    async fn has(&self, cid: &Cid) -> Result<bool> {
        self.inner.has(cid).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Issuers
// ─────────────────────────────────────────────────────────────────────────────

/// Fails the first `failures` requests with [`IssuerError::Unavailable`].
pub struct FlakyIssuer {
    inner: Arc<dyn IssuerService>,
    failures_left: AtomicU32,
    calls: AtomicU32,
}

impl FlakyIssuer {
    pub fn new(inner: Arc<dyn IssuerService>, failures: u32) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssuerService for FlakyIssuer {
    async fn issue(
        &self,
        request: IssuanceRequest,
    ) -> std::result::Result<IssuanceResponse, IssuerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tripped = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            return Err(IssuerError::Unavailable("injected outage".into()));
        }
        self.inner.issue(request).await
    }
}

/// Sleeps before answering.
pub struct SlowIssuer {
    inner: Arc<dyn IssuerService>,
    delay: Duration,
}

impl SlowIssuer {
    pub fn new(inner: Arc<dyn IssuerService>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl IssuerService for SlowIssuer {
    async fn issue(
        &self,
        request: IssuanceRequest,
    ) -> std::result::Result<IssuanceResponse, IssuerError> {
        tokio::time::sleep(self.delay).await;
        self.inner.issue(request).await
    }
}

/// Refuses every request.
pub struct RejectingIssuer {
    reason: String,
}

impl RejectingIssuer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl IssuerService for RejectingIssuer {
    async fn issue(
        &self,
        _request: IssuanceRequest,
    ) -> std::result::Result<IssuanceResponse, IssuerError> {
        Err(IssuerError::Rejected(self.reason.clone()))
    }
}

/// What a [`TamperingIssuer`] alters after signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tamper {
    /// Flip a bit of the signature.
    Signature,
    /// Shift the issuance time, leaving the request fields intact.
    IssuedAt,
    /// Add a claim nobody asked for.
    ExtraClaim,
}

/// Signs honestly, then alters the response.
pub struct TamperingIssuer {
    inner: Arc<dyn IssuerService>,
    tamper: Tamper,
}

impl TamperingIssuer {
    pub fn new(inner: Arc<dyn IssuerService>, tamper: Tamper) -> Self {
        Self { inner, tamper }
    }
}

#[async_trait]
impl IssuerService for TamperingIssuer {
    async fn issue(
        &self,
        request: IssuanceRequest,
    ) -> std::result::Result<IssuanceResponse, IssuerError> {
        let mut response = self.inner.issue(request).await?;
        match self.tamper {
            Tamper::Signature => {
                if let Some(first) = response.signature.bytes.first_mut() {
                    *first ^= 0x01;
                }
            }
            Tamper::IssuedAt => response.document.issued_at += 1,
            Tamper::ExtraClaim => {
                response
                    .document
                    .subject
                    .claims
                    .insert("admin".into(), ClaimValue::Bool(true));
            }
        }
        Ok(response)
    }
}
