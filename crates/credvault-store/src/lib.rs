//! # credvault store
//!
//! Storage abstractions for credvault, with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`ContentStore`] - Async content-addressed blob storage
//! - [`DeviceStore`] - Sync key-value storage on the holder's device
//! - [`SqliteContentStore`] / [`SqliteDeviceStore`] - Persistent backends
//! - [`MemoryContentStore`] / [`MemoryDeviceStore`] - In-memory backends for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use credvault_store::{ContentStore, SqliteContentStore};
//!
//! async fn example() {
//!     let store = SqliteContentStore::open("vault.db").unwrap();
//!     let cid = store.put(Bytes::from_static(b"ciphertext")).await.unwrap();
//!     let bytes = store.get(&cid).await.unwrap();
//!     assert_eq!(&bytes[..], b"ciphertext");
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryContentStore, MemoryDeviceStore};
pub use sqlite::{SqliteContentStore, SqliteDeviceStore};
pub use traits::{ContentStore, DeviceStore};
