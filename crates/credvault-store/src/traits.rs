//! Storage interfaces.
//!
//! [`ContentStore`] holds encrypted blobs addressed by their [`Cid`]; it is
//! the only place credentials leave the device, and it only ever sees
//! ciphertext. [`DeviceStore`] is the holder's small local key-value area.

use async_trait::async_trait;
use bytes::Bytes;
use credvault_core::Cid;

use crate::error::Result;

/// Content-addressed blob storage.
///
/// # Design Notes
///
/// - **Content addressing**: `put` returns the [`Cid`] of exactly the bytes
///   given. Identical bytes always map to the same handle.
/// - **Idempotent puts**: storing the same bytes twice is not an error.
/// - **Stable reads**: `get` returns byte-identical results for a handle.
/// - **Transient errors**: callers may retry when
///   [`StoreError::is_transient`](crate::StoreError::is_transient) holds.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a blob and return its handle.
    async fn put(&self, bytes: Bytes) -> Result<Cid>;

    /// Fetch a blob. Fails with `NotFound` when the handle is unknown.
    async fn get(&self, cid: &Cid) -> Result<Bytes>;

    /// Check whether a blob is present.
    async fn has(&self, cid: &Cid) -> Result<bool>;
}

/// Synchronous key-value storage local to the holder's device.
///
/// Each call is atomic for its key. There are no cross-key transactions,
/// so callers order their writes. Read-modify-write of a single key goes
/// through [`update`](DeviceStore::update), never `get` followed by `set`.
pub trait DeviceStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value. Returns whether it existed.
    fn remove(&self, key: &str) -> Result<bool>;

    /// Replace the value under `key` with `f(current)`.
    ///
    /// No other write to the store lands between the read and the write.
    /// `f` returning `Ok(None)` leaves the value as it is; an error from `f`
    /// aborts the update and is returned unchanged.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&[u8]>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()>;
}
