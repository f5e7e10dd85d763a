//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use credvault::{
    CredentialLifecycle, CredentialRequest, IssuerService, LifecycleConfig, LocalIssuer, Wallet,
};
use credvault_core::{Did, Identity};
use credvault_store::{ContentStore, MemoryContentStore, MemoryDeviceStore};
use tracing_subscriber::filter::LevelFilter;

/// Seed of the issuer used by [`test_issuer`].
pub const ISSUER_SEED: [u8; 32] = [0x15; 32];

/// Issuance time stamped by [`test_issuer`]: 2026-01-01T00:00:00Z.
pub const ISSUED_AT: i64 = 1_767_225_600_000;

/// Install a test-friendly subscriber. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(LevelFilter::DEBUG)
        .try_init();
}

/// Short timeouts and backoff, so failure tests finish quickly even
/// on a real clock.
pub fn fast_config() -> LifecycleConfig {
    LifecycleConfig {
        issuer_timeout_ms: 200,
        store_timeout_ms: 200,
        max_attempts: 3,
        initial_backoff_ms: 10,
        backoff_factor: 2.0,
        max_backoff_ms: 40,
        cache_envelopes: true,
    }
}

/// A deterministic issuer with a fixed clock.
pub fn test_issuer() -> LocalIssuer {
    LocalIssuer::new(Identity::from_seed(&ISSUER_SEED)).with_fixed_time(ISSUED_AT)
}

/// The university degree request used throughout the scenarios.
pub fn degree_request() -> CredentialRequest {
    let subject = Did::new("did:example:abc").expect("valid DID");
    CredentialRequest::new()
        .subject(subject)
        .claim("degree", "BSc")
        .with_type("UniversityDegreeCredential")
}

/// A holder wired to in-memory stores.
pub struct HolderFixture {
    pub device: Arc<MemoryDeviceStore>,
    pub content: Arc<dyn ContentStore>,
    pub issuer: Arc<dyn IssuerService>,
    pub lifecycle: CredentialLifecycle,
}

impl HolderFixture {
    /// A fresh holder with [`test_issuer`] and [`fast_config`].
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HolderFixtureBuilder {
        HolderFixtureBuilder::default()
    }

    /// A second holder publishing to the same content store and issuer.
    pub fn sibling(&self) -> Self {
        Self::builder()
            .content(self.content.clone())
            .issuer(self.issuer.clone())
            .config(self.lifecycle.config().clone())
            .build()
    }

    pub fn did(&self) -> &Did {
        self.lifecycle.identity().did()
    }
}

impl Default for HolderFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`HolderFixture`].
#[derive(Default)]
pub struct HolderFixtureBuilder {
    holder_seed: Option<[u8; 32]>,
    device: Option<Arc<MemoryDeviceStore>>,
    content: Option<Arc<dyn ContentStore>>,
    issuer: Option<Arc<dyn IssuerService>>,
    config: Option<LifecycleConfig>,
}

impl HolderFixtureBuilder {
    /// Use a deterministic holder identity.
    pub fn holder_seed(mut self, seed: [u8; 32]) -> Self {
        self.holder_seed = Some(seed);
        self
    }

    /// Reuse an existing device store, e.g. to reopen a holder.
    pub fn device(mut self, device: Arc<MemoryDeviceStore>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn content(mut self, content: Arc<dyn ContentStore>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn issuer(mut self, issuer: Arc<dyn IssuerService>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> HolderFixture {
        let device = self
            .device
            .unwrap_or_else(|| Arc::new(MemoryDeviceStore::new()));
        if let Some(seed) = self.holder_seed {
            Wallet::new(device.clone())
                .import_identity(&Identity::from_seed(&seed).secret_bytes())
                .expect("import holder identity");
        }

        let content = self
            .content
            .unwrap_or_else(|| Arc::new(MemoryContentStore::new()) as Arc<dyn ContentStore>);
        let issuer = self
            .issuer
            .unwrap_or_else(|| Arc::new(test_issuer()) as Arc<dyn IssuerService>);

        let lifecycle = CredentialLifecycle::open(
            device.clone(),
            content.clone(),
            issuer.clone(),
            self.config.unwrap_or_else(fast_config),
        )
        .expect("open lifecycle");

        HolderFixture {
            device,
            content,
            issuer,
            lifecycle,
        }
    }
}
