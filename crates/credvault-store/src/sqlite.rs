//! SQLite implementations of the store traits.
//!
//! These use rusqlite with bundled SQLite. The content store is wrapped in
//! async via tokio::spawn_blocking; the device store is synchronous.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use credvault_core::{now_millis, Cid};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ContentStore, DeviceStore};

/// How long a connection waits on another writer to the same file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn open_connection(path: impl AsRef<Path>) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    migration::migrate(&mut conn)?;
    Ok(conn)
}

fn open_memory_connection() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    migration::migrate(&mut conn)?;
    Ok(conn)
}

/// Busy/locked stay retryable; anything else is a refused write.
fn write_error(e: rusqlite::Error) -> StoreError {
    let err = StoreError::from(e);
    if err.is_transient() {
        err
    } else {
        StoreError::Write(err.to_string())
    }
}

/// SQLite-backed content store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteContentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContentStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Arc::new(Mutex::new(open_connection(path)?)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        Ok(Self {
            conn: Arc::new(Mutex::new(open_memory_connection()?)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn put(&self, bytes: Bytes) -> Result<Cid> {
        let cid = Cid::for_bytes(&bytes);
        let key = cid.to_string();

        let size = bytes.len();
        let changed = self
            .blocking(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO blobs (cid, bytes, size, stored_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![key, bytes.as_ref(), size as i64, now_millis()],
                )
                .map_err(write_error)
            })
            .await?;

        // Duplicate blobs are a no-op, not an error.
        debug!(%cid, size, new = changed > 0, "stored blob");
        Ok(cid)
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes> {
        let key = cid.to_string();

        self.blocking(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT bytes FROM blobs WHERE cid = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            bytes.map(Bytes::from).ok_or(StoreError::NotFound(key))
        })
        .await
    }

    async fn has(&self, cid: &Cid) -> Result<bool> {
        let key = cid.to_string();

        self.blocking(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM blobs WHERE cid = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }
}

const UPSERT_DEVICE_KV: &str = "INSERT INTO device_kv (key, value, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                    updated_at = excluded.updated_at";

/// SQLite-backed device store.
pub struct SqliteDeviceStore {
    conn: Mutex<Connection>,
}

impl SqliteDeviceStore {
    /// Open a SQLite database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_connection(path)?),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_memory_connection()?),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&conn)
    }
}

impl DeviceStore for SqliteDeviceStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM device_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(UPSERT_DEVICE_KV, params![key, value, now_millis()])
                .map_err(write_error)?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM device_kv WHERE key = ?1", params![key])?;
            Ok(removed > 0)
        })
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&[u8]>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        // IMMEDIATE takes the write lock up front, so another connection to
        // the same file cannot write between our read and our write.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<Vec<u8>> = tx
            .query_row(
                "SELECT value FROM device_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(next) = f(current.as_deref())? {
            tx.execute(UPSERT_DEVICE_KV, params![key, next, now_millis()])
                .map_err(write_error)?;
        }
        tx.commit().map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get_blob() {
        let store = SqliteContentStore::open_memory().unwrap();
        let cid = store.put(Bytes::from_static(b"envelope")).await.unwrap();

        assert_eq!(cid, Cid::for_bytes(b"envelope"));
        assert!(store.has(&cid).await.unwrap());
        assert_eq!(store.get(&cid).await.unwrap(), Bytes::from_static(b"envelope"));
    }

    #[tokio::test]
    async fn test_idempotent_put() {
        let store = SqliteContentStore::open_memory().unwrap();
        let a = store.put(Bytes::from_static(b"dup")).await.unwrap();
        let b = store.put(Bytes::from_static(b"dup")).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let store = SqliteContentStore::open_memory().unwrap();
        let cid = Cid::for_bytes(b"absent");

        assert!(!store.has(&cid).await.unwrap());
        assert!(matches!(store.get(&cid).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_blobs_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");

        let cid = {
            let store = SqliteContentStore::open(&path).unwrap();
            store.put(Bytes::from_static(b"durable")).await.unwrap()
        };

        let store = SqliteContentStore::open(&path).unwrap();
        assert_eq!(store.get(&cid).await.unwrap(), Bytes::from_static(b"durable"));
    }

    #[test]
    fn test_device_store_roundtrip() {
        let store = SqliteDeviceStore::open_memory().unwrap();

        assert_eq!(store.get("credentials").unwrap(), None);
        store.set("credentials", b"[]").unwrap();
        store.set("credentials", b"[1]").unwrap();
        assert_eq!(store.get("credentials").unwrap(), Some(b"[1]".to_vec()));

        assert!(store.remove("credentials").unwrap());
        assert!(!store.remove("credentials").unwrap());
    }

    #[test]
    fn test_device_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.db");

        SqliteDeviceStore::open(&path)
            .unwrap()
            .set("identity", b"secret")
            .unwrap();

        let store = SqliteDeviceStore::open(&path).unwrap();
        assert_eq!(store.get("identity").unwrap(), Some(b"secret".to_vec()));
    }

    #[test]
    fn test_device_update_rolls_back_on_error() {
        let store = SqliteDeviceStore::open_memory().unwrap();
        store.set("credentials", b"[]").unwrap();

        let err = store
            .update("credentials", &mut |_| Err(StoreError::Write("refused".into())))
            .unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert_eq!(store.get("credentials").unwrap(), Some(b"[]".to_vec()));

        store
            .update("credentials", &mut |current| {
                assert_eq!(current, Some(&b"[]"[..]));
                Ok(Some(b"[1]".to_vec()))
            })
            .unwrap();
        assert_eq!(store.get("credentials").unwrap(), Some(b"[1]".to_vec()));
    }

    #[test]
    fn test_device_updates_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.db");
        // Create the schema once before the writers race.
        SqliteDeviceStore::open(&path).unwrap();

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = SqliteDeviceStore::open(&path).unwrap();
                    for _ in 0..25 {
                        store
                            .update("counter", &mut |current| {
                                let n = current
                                    .map_or(0, |b| u32::from_le_bytes(b.try_into().unwrap()));
                                Ok(Some((n + 1).to_le_bytes().to_vec()))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let store = SqliteDeviceStore::open(&path).unwrap();
        let bytes = store.get("counter").unwrap().unwrap();
        assert_eq!(u32::from_le_bytes(bytes.try_into().unwrap()), 100);
    }

    #[tokio::test]
    async fn test_stores_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");

        let blobs = SqliteContentStore::open(&path).unwrap();
        let device = SqliteDeviceStore::open(&path).unwrap();

        let cid = blobs.put(Bytes::from_static(b"x")).await.unwrap();
        device.set("last", cid.to_string().as_bytes()).unwrap();

        assert_eq!(device.get("last").unwrap(), Some(cid.to_string().into_bytes()));
    }
}
