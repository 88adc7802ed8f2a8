use std::{fs, path::Path};

use color_eyre::Result;
use wardvault_core::{records::PatientRecord, store::RecordStore};

use crate::storage::friendly_error;

/// Export the decrypted record set as a plaintext JSON array. The file is the
/// whole backup format: no envelope, no checksum. Handle with care.
pub async fn export<S: RecordStore>(store: &S, file: impl AsRef<Path>) -> Result<()> {
    let records = store.all_records().await.map_err(friendly_error)?;
    let body = serde_json::to_string_pretty(&records)?;
    fs::write(file.as_ref(), body)?;
    println!(
        "Exported {} records to {}",
        records.len(),
        file.as_ref().display()
    );
    Ok(())
}

/// Replace the store contents from a plaintext JSON backup file.
pub async fn import<S: RecordStore>(store: &S, file: impl AsRef<Path>) -> Result<()> {
    let body = fs::read_to_string(file.as_ref())?;
    let records: Vec<PatientRecord> = serde_json::from_str(&body)?;
    let count = records.len();
    store
        .restore_from_backup(records)
        .await
        .map_err(friendly_error)?;
    println!("Imported {count} records from {}", file.as_ref().display());
    Ok(())
}
