use std::path::PathBuf;

use color_eyre::Result;
use dirs::data_dir;
use tracing::debug;
use wardvault_core::store::StoreError;
use wardvault_storage::secure_record_store::{SecureRecordStore, StoreOptions};

use crate::config::Config;

/// Resolve the default data directory for Wardvault.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("wardvault"))
}

/// Resolve the store directory, honoring a config override.
pub fn data_dir_from_config(config: &Config) -> Result<PathBuf> {
    match &config.data_dir {
        Some(root) => Ok(root.clone()),
        None => default_data_dir(),
    }
}

/// Unlock the encrypted store with the session PIN.
pub fn unlock_store(config: &Config, pin: &str) -> Result<SecureRecordStore> {
    let root = data_dir_from_config(config)?;
    debug!(?root, demo_mode = config.demo_mode, "unlocking record store");
    let options = StoreOptions {
        demo_mode: config.demo_mode,
    };
    SecureRecordStore::unlock(&root, pin, options).map_err(friendly_error)
}

/// Map store errors to operator-facing messages.
pub fn friendly_error(err: StoreError) -> color_eyre::Report {
    match err {
        StoreError::Unavailable { reason } => {
            color_eyre::eyre::eyre!("failed to open the record store: {reason}")
        }
        StoreError::DecryptionFailed => {
            color_eyre::eyre::eyre!("wrong PIN (or the store is corrupted); re-enter the PIN or run `wardvault reset --yes`")
        }
        other => color_eyre::eyre::eyre!(other.to_string()),
    }
}
