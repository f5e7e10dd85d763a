//! # credvault
//!
//! A holder-side engine for verifiable credentials. A holder asks an
//! issuer to sign a credential, seals it under a key only the holder can
//! derive, publishes the sealed envelope to content-addressed storage and
//! keeps a local record. Later the holder can fetch the envelope back by
//! its handle, open it and check the issuer's signature.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use credvault::{CredentialLifecycle, CredentialRequest, LifecycleConfig, LocalIssuer};
//! use credvault::core::Identity;
//! use credvault::store::{MemoryContentStore, MemoryDeviceStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let issuer = LocalIssuer::new(Identity::generate()?);
//!
//!     let lifecycle = CredentialLifecycle::open(
//!         Arc::new(MemoryDeviceStore::new()),
//!         Arc::new(MemoryContentStore::new()),
//!         Arc::new(issuer),
//!         LifecycleConfig::default(),
//!     )?;
//!
//!     let record = lifecycle
//!         .issue(CredentialRequest::new().claim("degree", "BSc"))
//!         .await?;
//!
//!     let report = lifecycle.verify(&record.handle).await?;
//!     assert!(report.verified);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `credvault::core` - identities, documents, signatures and handles
//! - `credvault::cipher` - the holder vault key and envelopes
//! - `credvault::store` - content and device storage

pub mod config;
pub mod error;
pub mod issuer;
pub mod lifecycle;
pub mod record;
pub mod retry;
pub mod state;
pub mod wallet;

pub use credvault_cipher as cipher;
pub use credvault_core as core;
pub use credvault_store as store;

pub use config::LifecycleConfig;
pub use error::{Result, Stage, StageFailure, VaultError};
pub use issuer::{IssuanceRequest, IssuanceResponse, IssuerError, IssuerService, LocalIssuer};
pub use lifecycle::{CredentialLifecycle, CredentialRequest, RejectReason, VerificationReport};
pub use record::VaultRecord;
pub use retry::{CancelToken, RetryPolicy};
pub use state::{IssueState, Machine, ProtocolState, VerifyState};
pub use wallet::Wallet;

pub use credvault_core::{Cid, ClaimValue, Claims, CredentialDocument, Did, Identity, Signature};
