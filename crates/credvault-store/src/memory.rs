//! In-memory store implementations.
//!
//! These are primarily for testing. They have the same semantics as the
//! SQLite backends but keep everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use credvault_core::Cid;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::{ContentStore, DeviceStore};

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Poisoned(e.to_string())
}

/// In-memory content store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<Cid, Bytes>>,
}

impl MemoryContentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> Result<usize> {
        Ok(self.blobs.read().map_err(poisoned)?.len())
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, bytes: Bytes) -> Result<Cid> {
        let cid = Cid::for_bytes(&bytes);
        let size = bytes.len();
        let mut blobs = self.blobs.write().map_err(poisoned)?;
        blobs.entry(cid).or_insert(bytes);
        debug!(%cid, size, "stored blob");
        Ok(cid)
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes> {
        let blobs = self.blobs.read().map_err(poisoned)?;
        blobs
            .get(cid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(cid.to_string()))
    }

    async fn has(&self, cid: &Cid) -> Result<bool> {
        let blobs = self.blobs.read().map_err(poisoned)?;
        Ok(blobs.contains_key(cid))
    }
}

/// In-memory device store.
#[derive(Debug, Default)]
pub struct MemoryDeviceStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryDeviceStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All keys currently set, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let values = self.values.read().map_err(poisoned)?;
        let mut keys: Vec<String> = values.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl DeviceStore for MemoryDeviceStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let values = self.values.read().map_err(poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut values = self.values.write().map_err(poisoned)?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut values = self.values.write().map_err(poisoned)?;
        Ok(values.remove(key).is_some())
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&[u8]>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()> {
        let mut values = self.values.write().map_err(poisoned)?;
        if let Some(next) = f(values.get(key).map(Vec::as_slice))? {
            values.insert(key.to_string(), next);
        }
        Ok(())
    }
}
