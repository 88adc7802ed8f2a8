use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sled::{
    transaction::{ConflictableTransactionError, TransactionError},
    IVec, Transactional,
};
use tracing::{info, instrument, warn};
use wardvault_core::{
    records::{sort_for_display, PatientRecord},
    seed::{ids_are_seed_subset, seed_records},
    store::{RecordStore, StoreError},
};

use crate::key_material::{derive_key, generate_salt, KeyMaterial, SALT_LEN};

const RECORDS_TREE: &str = "records";
const META_TREE: &str = "meta";
const STAGING_TREE: &str = "records_staging";
const SALT_KEY: &str = "salt";
const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Bump when the on-disk layout changes. Unlock clears the record namespace on
/// a mismatch rather than risk decrypting against a stale salt.
const SCHEMA_VERSION: u32 = 1;

/// AES-256-GCM nonce length. The one canonical on-disk IV size; anything else
/// read back from storage is rejected.
const NONCE_LEN: usize = 12;

/// On-disk envelope for one encrypted record. Keyed by `id` in the record
/// tree; `ciphertext` carries the GCM tag.
#[derive(Debug, Serialize, Deserialize)]
struct StoredBlob {
    id: String,
    ciphertext: String,
    iv: String,
}

/// Behavior toggles for a store instance.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// When set, an empty store is seeded with the demo dataset and a store
    /// whose undecryptable records are all demo ids is wiped and re-seeded
    /// instead of failing. Never enables discarding non-demo data.
    pub demo_mode: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { demo_mode: true }
    }
}

/// Encrypted-at-rest ward record store over a sled database.
///
/// A value of this type is an unlocked session: construction derives the key,
/// dropping it ends the session. There is no "locked" handle to misuse.
/// Assumes a single writer; sled serializes individual operations but
/// application-level sequences are not protected against concurrent callers.
pub struct SecureRecordStore {
    db: sled::Db,
    records: sled::Tree,
    meta: sled::Tree,
    key: Mutex<KeyMaterial>,
    options: StoreOptions,
    path: PathBuf,
}

impl std::fmt::Debug for SecureRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureRecordStore")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SecureRecordStore {
    /// Open (or create) the database at `path` and derive the session key
    /// from `pin` and the persisted salt, generating and persisting a fresh
    /// salt on first use. Any failure to open surfaces as
    /// [`StoreError::Unavailable`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn unlock(
        path: impl AsRef<Path>,
        pin: &str,
        options: StoreOptions,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path).map_err(unavailable_err)?;
        let records = db.open_tree(RECORDS_TREE).map_err(unavailable_err)?;
        let meta = db.open_tree(META_TREE).map_err(unavailable_err)?;

        check_schema_version(&records, &meta)?;
        let salt = load_or_create_salt(&meta)?;
        let key = derive_key(pin, &salt);

        Ok(Self {
            db,
            records,
            meta,
            key: Mutex::new(key),
            options,
            path,
        })
    }

    /// Flush and close the session.
    pub async fn close(self) -> Result<(), StoreError> {
        self.db.flush_async().await.map_err(storage_err)?;
        Ok(())
    }

    /// Factory reset: close the database and delete it wholesale, salt
    /// included. Irreversible; the next unlock starts from scratch.
    #[instrument(skip_all)]
    pub async fn reset(self) -> Result<(), StoreError> {
        let path = self.path.clone();
        self.db.flush_async().await.map_err(storage_err)?;
        drop(self);
        fs::remove_dir_all(&path).map_err(storage_err)?;
        info!(path = %path.display(), "store reset");
        Ok(())
    }

    fn encrypt_record(&self, record: &PatientRecord) -> Result<StoredBlob, StoreError> {
        let key = self.key.lock().map_err(|e| StoreError::Storage {
            reason: format!("lock poisoned: {e}"),
        })?;
        encrypt_with(&key, record)
    }

    fn decrypt_blob(&self, blob: &StoredBlob) -> Result<PatientRecord, StoreError> {
        let iv = URL_SAFE_NO_PAD
            .decode(&blob.iv)
            .map_err(|e| StoreError::MalformedIv {
                reason: format!("base64 decode failed: {e}"),
            })?;
        if iv.len() != NONCE_LEN {
            return Err(StoreError::MalformedIv {
                reason: format!("expected {NONCE_LEN} bytes, got {}", iv.len()),
            });
        }

        let ciphertext = URL_SAFE_NO_PAD
            .decode(&blob.ciphertext)
            .map_err(|_| StoreError::DecryptionFailed)?;

        let key = self.key.lock().map_err(|e| StoreError::Storage {
            reason: format!("lock poisoned: {e}"),
        })?;
        let cipher = build_cipher(&key)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
            .map_err(|_| StoreError::DecryptionFailed)?;

        serde_json::from_slice(&plaintext).map_err(|e| StoreError::Storage {
            reason: format!("plaintext decode failed: {e}"),
        })
    }

    fn read_raw(&self) -> Result<Vec<(String, IVec)>, StoreError> {
        let mut entries = Vec::new();
        for item in self.records.iter() {
            let (key, value) = item.map_err(storage_err)?;
            entries.push((String::from_utf8_lossy(&key).into_owned(), value));
        }
        Ok(entries)
    }

    /// Decrypt every entry independently. Per-record failures are logged and
    /// collected by id; isolated corruption must not abort the whole read.
    fn decrypt_entries(&self, entries: &[(String, IVec)]) -> (Vec<PatientRecord>, Vec<String>) {
        let mut records = Vec::new();
        let mut failed = Vec::new();
        for (id, value) in entries {
            let blob: StoredBlob = match serde_json::from_slice(value) {
                Ok(blob) => blob,
                Err(err) => {
                    warn!(%id, %err, "dropping record with unreadable envelope");
                    failed.push(id.clone());
                    continue;
                }
            };
            match self.decrypt_blob(&blob) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(%id, %err, "dropping undecryptable record");
                    failed.push(id.clone());
                }
            }
        }
        (records, failed)
    }

    /// Encrypt the demo dataset under the current key and insert it as one
    /// atomic batch.
    async fn seed_database(&self) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for record in seed_records() {
            let blob = self.encrypt_record(&record)?;
            let bytes = serde_json::to_vec(&blob).map_err(storage_err)?;
            batch.insert(record.id.as_bytes(), bytes);
        }
        self.records.apply_batch(batch).map_err(storage_err)?;
        self.db.flush_async().await.map_err(storage_err)?;
        info!("seeded demo dataset");
        Ok(())
    }

    /// Wipe the record namespace and re-seed under the current key. Only ever
    /// reached for all-demo-id stores in demo mode.
    async fn heal_seed_data(&self) -> Result<Vec<PatientRecord>, StoreError> {
        self.records.clear().map_err(storage_err)?;
        self.seed_database().await?;
        let raw = self.read_raw()?;
        let (mut records, _) = self.decrypt_entries(&raw);
        sort_for_display(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl RecordStore for SecureRecordStore {
    #[instrument(skip_all)]
    async fn all_records(&self) -> Result<Vec<PatientRecord>, StoreError> {
        let raw = self.read_raw()?;

        if raw.is_empty() {
            if !self.options.demo_mode {
                return Ok(Vec::new());
            }
            self.seed_database().await?;
            let raw = self.read_raw()?;
            let (mut records, _) = self.decrypt_entries(&raw);
            sort_for_display(&mut records);
            return Ok(records);
        }

        let (mut records, failed) = self.decrypt_entries(&raw);

        if records.is_empty() && !failed.is_empty() {
            // Nothing decrypted at all: either the key is wrong, or a demo
            // store's salt drifted. Only the latter is recoverable, and only
            // when every failing id belongs to the disposable seed set.
            if self.options.demo_mode && ids_are_seed_subset(failed.iter().map(String::as_str)) {
                warn!("all demo records undecryptable; wiping and re-seeding");
                return self.heal_seed_data().await;
            }
            return Err(StoreError::DecryptionFailed);
        }

        sort_for_display(&mut records);
        Ok(records)
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn save_record(&self, record: &PatientRecord) -> Result<(), StoreError> {
        let blob = self.encrypt_record(record)?;
        let bytes = serde_json::to_vec(&blob).map_err(storage_err)?;
        self.records
            .insert(record.id.as_bytes(), bytes)
            .map_err(storage_err)?;
        self.db.flush_async().await.map_err(storage_err)?;
        Ok(())
    }

    /// Full re-key. Stages the record set encrypted under the new key first,
    /// then swaps salt and records in a single transaction, so an interrupted
    /// rotation leaves the store readable under the old PIN rather than half
    /// migrated.
    #[instrument(skip_all)]
    async fn change_pin(&self, new_pin: &str) -> Result<(), StoreError> {
        // Fails closed: nothing is touched unless the current set decrypts.
        let current = self.all_records().await?;

        let new_salt = generate_salt();
        let new_key = derive_key(new_pin, &new_salt);

        let staging = self.db.open_tree(STAGING_TREE).map_err(storage_err)?;
        staging.clear().map_err(storage_err)?;

        let mut staged: Vec<(String, Vec<u8>)> = Vec::with_capacity(current.len());
        for record in &current {
            let blob = encrypt_with(&new_key, record)?;
            let bytes = serde_json::to_vec(&blob).map_err(storage_err)?;
            staged.push((record.id.clone(), bytes));
        }
        let mut staging_batch = sled::Batch::default();
        for (id, bytes) in &staged {
            staging_batch.insert(id.as_bytes(), bytes.clone());
        }
        staging.apply_batch(staging_batch).map_err(storage_err)?;

        let old_ids: Vec<IVec> = self
            .records
            .iter()
            .keys()
            .collect::<Result<_, _>>()
            .map_err(storage_err)?;

        (&self.records, &staging, &self.meta)
            .transaction(|(records, staging, meta)| {
                meta.insert(SALT_KEY, &new_salt[..])?;
                for id in &old_ids {
                    records.remove(id.clone())?;
                }
                for (id, bytes) in &staged {
                    records.insert(id.as_bytes(), bytes.clone())?;
                    staging.remove(id.as_bytes())?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(transaction_err)?;

        {
            let mut key = self.key.lock().map_err(|e| StoreError::Storage {
                reason: format!("lock poisoned: {e}"),
            })?;
            *key = new_key;
        }

        drop(staging);
        self.db.drop_tree(STAGING_TREE).map_err(storage_err)?;
        self.db.flush_async().await.map_err(storage_err)?;
        info!(records = current.len(), "PIN rotated, record set re-encrypted");
        Ok(())
    }

    #[instrument(skip_all, fields(count = records.len()))]
    async fn restore_from_backup(&self, records: Vec<PatientRecord>) -> Result<(), StoreError> {
        let mut incoming: Vec<(String, Vec<u8>)> = Vec::with_capacity(records.len());
        for record in &records {
            let blob = self.encrypt_record(record)?;
            let bytes = serde_json::to_vec(&blob).map_err(storage_err)?;
            incoming.push((record.id.clone(), bytes));
        }

        let old_ids: Vec<IVec> = self
            .records
            .iter()
            .keys()
            .collect::<Result<_, _>>()
            .map_err(storage_err)?;

        self.records
            .transaction(|tree| {
                for id in &old_ids {
                    tree.remove(id.clone())?;
                }
                for (id, bytes) in &incoming {
                    tree.insert(id.as_bytes(), bytes.clone())?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(transaction_err)?;
        self.db.flush_async().await.map_err(storage_err)?;
        Ok(())
    }
}

fn encrypt_with(key: &KeyMaterial, record: &PatientRecord) -> Result<StoredBlob, StoreError> {
    let plaintext = serde_json::to_vec(record).map_err(storage_err)?;
    let cipher = build_cipher(key)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_ref())
        .map_err(|e| StoreError::Storage {
            reason: format!("encrypt failed: {e}"),
        })?;

    Ok(StoredBlob {
        id: record.id.clone(),
        ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
        iv: URL_SAFE_NO_PAD.encode(nonce.as_slice()),
    })
}

fn build_cipher(key: &KeyMaterial) -> Result<Aes256Gcm, StoreError> {
    Aes256Gcm::new_from_slice(key.bytes()).map_err(|e| StoreError::Storage {
        reason: format!("cipher init failed: {e}"),
    })
}

fn check_schema_version(records: &sled::Tree, meta: &sled::Tree) -> Result<(), StoreError> {
    let stored = meta.get(SCHEMA_VERSION_KEY).map_err(unavailable_err)?;
    let matches = stored
        .as_ref()
        .and_then(|v| <[u8; 4]>::try_from(v.as_ref()).ok())
        .map(u32::from_le_bytes)
        == Some(SCHEMA_VERSION);

    if !matches {
        if stored.is_some() {
            // Accepts data loss: records written under an older layout would
            // otherwise be decrypted against a stale salt.
            warn!("schema version mismatch, clearing record namespace");
            records.clear().map_err(unavailable_err)?;
        }
        meta.insert(SCHEMA_VERSION_KEY, &SCHEMA_VERSION.to_le_bytes()[..])
            .map_err(unavailable_err)?;
    }
    Ok(())
}

fn load_or_create_salt(meta: &sled::Tree) -> Result<[u8; SALT_LEN], StoreError> {
    if let Some(stored) = meta.get(SALT_KEY).map_err(unavailable_err)? {
        return <[u8; SALT_LEN]>::try_from(stored.as_ref()).map_err(|_| StoreError::Unavailable {
            reason: format!("persisted salt has unexpected length {}", stored.len()),
        });
    }

    let salt = generate_salt();
    meta.insert(SALT_KEY, &salt[..]).map_err(unavailable_err)?;
    Ok(salt)
}

fn unavailable_err<E: ToString>(err: E) -> StoreError {
    StoreError::Unavailable {
        reason: err.to_string(),
    }
}

fn storage_err<E: ToString>(err: E) -> StoreError {
    StoreError::Storage {
        reason: err.to_string(),
    }
}

fn transaction_err(err: TransactionError<()>) -> StoreError {
    match err {
        TransactionError::Abort(()) => StoreError::Storage {
            reason: "transaction aborted".to_string(),
        },
        TransactionError::Storage(e) => storage_err(e),
    }
}
