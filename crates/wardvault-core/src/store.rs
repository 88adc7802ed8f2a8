use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    records::{sort_for_display, PatientRecord},
    seed::seed_records,
};

/// Errors produced by record-store implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The underlying database could not be opened or created.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
    /// AEAD authentication failed; the data was written under a different
    /// key (wrong PIN) or has been tampered with.
    #[error("decryption failed: wrong PIN or corrupted data")]
    DecryptionFailed,
    /// A stored nonce could not be normalized to the expected 12 bytes.
    #[error("malformed IV: {reason}")]
    MalformedIv { reason: String },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Contract for an encrypted-at-rest ward record store. The dashboard, backup
/// exporter, and admin console all consume plaintext [`PatientRecord`]s
/// through this interface and never see key material.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Return the full decrypted ward list, newest admission first. Seeds the
    /// demo dataset when the store is empty (demo mode).
    async fn all_records(&self) -> Result<Vec<PatientRecord>, StoreError>;

    /// Encrypt and upsert one record by id, overwriting any existing entry.
    async fn save_record(&self, record: &PatientRecord) -> Result<(), StoreError>;

    /// Re-key the whole store under a new PIN and a fresh salt.
    async fn change_pin(&self, new_pin: &str) -> Result<(), StoreError>;

    /// Replace the entire record set with an imported plaintext backup.
    async fn restore_from_backup(&self, records: Vec<PatientRecord>) -> Result<(), StoreError>;
}

/// In-memory record store for UI and CLI tests. Holds plaintext only; the
/// production implementation lives in `wardvault-storage`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    inner: Arc<Mutex<HashMap<String, PatientRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, PatientRecord>>, StoreError> {
        self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn all_records(&self) -> Result<Vec<PatientRecord>, StoreError> {
        let mut map = self.lock()?;
        if map.is_empty() {
            for record in seed_records() {
                map.insert(record.id.clone(), record);
            }
        }
        let mut records: Vec<PatientRecord> = map.values().cloned().collect();
        sort_for_display(&mut records);
        Ok(records)
    }

    async fn save_record(&self, record: &PatientRecord) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        map.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn change_pin(&self, _new_pin: &str) -> Result<(), StoreError> {
        // No key material to rotate in the plaintext double.
        Ok(())
    }

    async fn restore_from_backup(&self, records: Vec<PatientRecord>) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        map.clear();
        for record in records {
            map.insert(record.id.clone(), record);
        }
        Ok(())
    }
}
