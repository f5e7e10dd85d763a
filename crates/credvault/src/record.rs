//! Vault records: the holder's local index of issued credentials.

use std::collections::BTreeSet;

use credvault_core::{Cid, CredentialDocument, Did, Signature};
use serde::{Deserialize, Serialize};

/// Metadata kept on the device for one published credential.
///
/// The credential itself lives encrypted in the content store under
/// `handle`. `envelope` is an optional local copy of those bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    pub handle: Cid,
    pub signature: Signature,
    pub issuer: Did,
    pub subject: Did,
    pub types: BTreeSet<String>,
    /// Issuance time (Unix ms), copied from the document.
    pub issued_at: i64,
    /// When the record was written (Unix ms).
    pub stored_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<Vec<u8>>,
}

impl VaultRecord {
    pub fn new(
        handle: Cid,
        document: &CredentialDocument,
        signature: Signature,
        stored_at: i64,
    ) -> Self {
        Self {
            handle,
            signature,
            issuer: document.issuer.clone(),
            subject: document.subject.id.clone(),
            types: document.types.clone(),
            issued_at: document.issued_at,
            stored_at,
            envelope: None,
        }
    }

    /// Attach a local copy of the envelope bytes.
    pub fn with_envelope(mut self, envelope: Vec<u8>) -> Self {
        self.envelope = Some(envelope);
        self
    }
}
