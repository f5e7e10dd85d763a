//! # credvault testkit
//!
//! Testing utilities for credvault.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: canonical encodings and key derivations with known outputs
//! - **Generators**: Proptest strategies for documents, claims and identities
//! - **Fixtures**: a holder wired to memory stores and a local issuer
//! - **Faults**: stores and issuers that fail, stall, lie or tamper on purpose
//!
//! ## Golden Vectors
//!
//! ```rust
//! use credvault_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, hex) in verify_all_vectors() {
//!     assert!(ok, "{name}: {hex}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use credvault_testkit::generators::{document_from_params, DocumentParams};
//!
//! proptest! {
//!     #[test]
//!     fn canonical_bytes_parse_back(params: DocumentParams) {
//!         let doc = document_from_params(&params);
//!         prop_assert_eq!(credvault_core::parse(&doc.canonical_bytes()).unwrap(), doc);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use credvault_testkit::fixtures::{degree_request, HolderFixture};
//!
//! async fn example() {
//!     let holder = HolderFixture::new();
//!     let record = holder.lifecycle.issue(degree_request()).await.unwrap();
//!     assert!(holder.lifecycle.verify(&record.handle).await.unwrap().verified);
//! }
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use faults::{
    FlakyContentStore, FlakyIssuer, Lie, LyingContentStore, ReadOnlyContentStore, RejectingIssuer,
    SlowContentStore, SlowIssuer, Tamper, TamperingIssuer,
};
pub use fixtures::{degree_request, fast_config, init_tracing, test_issuer, HolderFixture};
pub use generators::{document_from_params, DocumentParams};
pub use vectors::{all_vectors, verify_all_vectors, CanonicalVector};
