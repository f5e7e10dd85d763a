//! Typed access to the holder's device store.
//!
//! Two keys are used: `identity` holds the holder's secret key and
//! `credentials` holds the list of [`VaultRecord`]s. The device store has
//! no cross-key transactions, so the wallet orders its writes: the identity
//! is always written before any record, and records are refused while no
//! identity exists. Every change to the record list is a single
//! [`DeviceStore::update`], so wallets sharing a device store never lose
//! each other's records.

use std::sync::Arc;

use credvault_core::{Cid, Identity};
use credvault_store::{DeviceStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, VaultError};
use crate::record::VaultRecord;

/// Device store key for the holder identity.
pub const IDENTITY_KEY: &str = "identity";

/// Device store key for the vault record list.
pub const CREDENTIALS_KEY: &str = "credentials";

const IDENTITY_FORMAT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    version: u8,
    secret: Vec<u8>,
}

/// The holder's local state.
#[derive(Clone)]
pub struct Wallet {
    device: Arc<dyn DeviceStore>,
}

impl Wallet {
    pub fn new(device: Arc<dyn DeviceStore>) -> Self {
        Self { device }
    }

    /// The persisted identity, if any.
    pub fn identity(&self) -> Result<Option<Identity>> {
        let Some(bytes) = self.device.get(IDENTITY_KEY)? else {
            return Ok(None);
        };
        let stored: StoredIdentity = decode(&bytes, IDENTITY_KEY)?;
        if stored.version != IDENTITY_FORMAT_VERSION {
            return Err(VaultError::Storage(format!(
                "unsupported identity format version {}",
                stored.version
            )));
        }
        Ok(Some(Identity::from_secret(&stored.secret)?))
    }

    /// Load the persisted identity, generating and storing one if absent.
    pub fn load_or_create_identity(&self) -> Result<Identity> {
        if let Some(identity) = self.identity()? {
            return Ok(identity);
        }
        let identity = Identity::generate()?;
        self.store_identity(&identity)?;
        info!(did = %identity.did(), "created holder identity");
        Ok(identity)
    }

    /// Recreate an identity from a backed-up secret key and persist it.
    ///
    /// Replacing an identity that already has records would orphan them,
    /// so this is refused unless the secret matches the stored one.
    pub fn import_identity(&self, secret: &[u8]) -> Result<Identity> {
        let identity = Identity::from_secret(secret)?;
        match self.identity()? {
            Some(existing) if existing == identity => return Ok(existing),
            Some(_) if !self.records()?.is_empty() => {
                return Err(VaultError::StorageWrite(
                    "a different identity with credentials is already stored".into(),
                ))
            }
            _ => {}
        }
        self.store_identity(&identity)?;
        Ok(identity)
    }

    fn store_identity(&self, identity: &Identity) -> Result<()> {
        let stored = StoredIdentity {
            version: IDENTITY_FORMAT_VERSION,
            secret: identity.secret_bytes().to_vec(),
        };
        self.device.set(IDENTITY_KEY, &encode(&stored)?)?;
        Ok(())
    }

    /// All vault records, oldest first.
    pub fn records(&self) -> Result<Vec<VaultRecord>> {
        match self.device.get(CREDENTIALS_KEY)? {
            Some(bytes) => decode(&bytes, CREDENTIALS_KEY),
            None => Ok(Vec::new()),
        }
    }

    /// Look up one record by handle.
    pub fn record(&self, handle: &Cid) -> Result<Option<VaultRecord>> {
        Ok(self.records()?.into_iter().find(|r| &r.handle == handle))
    }

    /// Insert a record, replacing any with the same handle.
    pub fn put_record(&self, record: VaultRecord) -> Result<()> {
        if self.device.get(IDENTITY_KEY)?.is_none() {
            return Err(VaultError::NoIdentity);
        }

        self.update_records(|records| {
            match records.iter_mut().find(|r| r.handle == record.handle) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
            true
        })
    }

    /// Delete a record. Returns whether it existed.
    pub fn remove_record(&self, handle: &Cid) -> Result<bool> {
        let mut removed = false;
        self.update_records(|records| {
            let before = records.len();
            records.retain(|r| &r.handle != handle);
            removed = records.len() != before;
            removed
        })?;
        Ok(removed)
    }

    /// Apply `change` to the record list as one atomic device store update.
    /// `change` returns whether it modified the list.
    fn update_records(&self, mut change: impl FnMut(&mut Vec<VaultRecord>) -> bool) -> Result<()> {
        let mut failure = None;
        let mut written = None;

        let outcome = self.device.update(CREDENTIALS_KEY, &mut |current| {
            let step = current
                .map_or_else(
                    || Ok(Vec::new()),
                    |bytes| decode::<Vec<VaultRecord>>(bytes, CREDENTIALS_KEY),
                )
                .and_then(|mut records| {
                    if !change(&mut records) {
                        return Ok(None);
                    }
                    written = Some(records.len());
                    encode(&records).map(Some)
                });
            step.map_err(|e| {
                let message = e.to_string();
                failure = Some(e);
                StoreError::Write(message)
            })
        });

        if let Some(e) = failure {
            return Err(e);
        }
        outcome.map_err(|e| VaultError::StorageWrite(e.to_string()))?;
        if let Some(count) = written {
            debug!(count, "wrote vault records");
        }
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| VaultError::StorageWrite(e.to_string()))?;
    Ok(buf)
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8], key: &str) -> Result<T> {
    ciborium::from_reader(bytes)
        .map_err(|e| VaultError::Storage(format!("corrupt '{key}' entry: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use credvault_core::signature::sign_with;
    use credvault_core::CredentialDocument;
    use credvault_store::MemoryDeviceStore;

    fn wallet() -> (Wallet, Arc<MemoryDeviceStore>) {
        let device = Arc::new(MemoryDeviceStore::new());
        (Wallet::new(device.clone()), device)
    }

    fn record(identity: &Identity, n: u8) -> VaultRecord {
        let doc = CredentialDocument::builder(identity.did().clone(), identity.did().clone())
            .claim("n", i64::from(n))
            .build();
        let sig = sign_with(&doc.canonical_bytes(), identity.keypair());
        VaultRecord::new(Cid::for_bytes(&[n]), &doc, sig, 1000 + i64::from(n))
    }

    #[test]
    fn test_identity_created_once() {
        let (wallet, _) = wallet();
        assert!(wallet.identity().unwrap().is_none());

        let a = wallet.load_or_create_identity().unwrap();
        let b = wallet.load_or_create_identity().unwrap();
        assert_eq!(a, b);
        assert_eq!(wallet.identity().unwrap(), Some(a));
    }

    #[test]
    fn test_records_require_identity() {
        let (wallet, device) = wallet();
        let issuer = Identity::from_seed(&[1u8; 32]);

        assert_eq!(
            wallet.put_record(record(&issuer, 1)),
            Err(VaultError::NoIdentity)
        );
        assert_eq!(device.get(CREDENTIALS_KEY).unwrap(), None);
    }

    #[test]
    fn test_put_list_remove() {
        let (wallet, _) = wallet();
        let identity = wallet.load_or_create_identity().unwrap();

        let r1 = record(&identity, 1);
        let r2 = record(&identity, 2);
        wallet.put_record(r1.clone()).unwrap();
        wallet.put_record(r2.clone()).unwrap();
        // Same handle replaces.
        wallet.put_record(r1.clone()).unwrap();

        assert_eq!(wallet.records().unwrap(), vec![r1.clone(), r2.clone()]);
        assert_eq!(wallet.record(&r2.handle).unwrap(), Some(r2.clone()));

        assert!(wallet.remove_record(&r1.handle).unwrap());
        assert!(!wallet.remove_record(&r1.handle).unwrap());
        assert_eq!(wallet.records().unwrap(), vec![r2]);
    }

    #[test]
    fn test_import_identity() {
        let (wallet, _) = wallet();
        let original = Identity::from_seed(&[9u8; 32]);

        let imported = wallet.import_identity(&original.secret_bytes()).unwrap();
        assert_eq!(imported, original);
        assert_eq!(wallet.identity().unwrap(), Some(original.clone()));

        wallet.put_record(record(&original, 1)).unwrap();
        let other = Identity::from_seed(&[8u8; 32]);
        assert!(wallet.import_identity(&other.secret_bytes()).is_err());
        // Re-importing the same secret is fine.
        assert!(wallet.import_identity(&original.secret_bytes()).is_ok());
    }

    #[test]
    fn test_corrupt_entry() {
        let (wallet, device) = wallet();
        device.set(CREDENTIALS_KEY, b"\xff\xff").unwrap();
        assert!(matches!(wallet.records(), Err(VaultError::Storage(_))));

        wallet.load_or_create_identity().unwrap();
        let issuer = Identity::from_seed(&[1u8; 32]);
        assert!(matches!(
            wallet.put_record(record(&issuer, 1)),
            Err(VaultError::Storage(_))
        ));
        assert_eq!(
            device.get(CREDENTIALS_KEY).unwrap(),
            Some(b"\xff\xff".to_vec())
        );
    }

    #[test]
    fn test_wallets_sharing_a_device_keep_every_record() {
        let (first, device) = wallet();
        let identity = first.load_or_create_identity().unwrap();
        let second = Wallet::new(device);

        let threads: Vec<_> = (0..4u8)
            .map(|t| {
                let wallet = if t % 2 == 0 { first.clone() } else { second.clone() };
                let identity = identity.clone();
                std::thread::spawn(move || {
                    for i in 0..25u8 {
                        wallet.put_record(record(&identity, t * 25 + i)).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(first.records().unwrap().len(), 100);
    }
}
