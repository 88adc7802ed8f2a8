//! PIN-based key derivation.
//!
//! The PIN is the only credential. A per-installation random salt is persisted
//! in the store's metadata namespace; the 256-bit AEAD key is derived fresh on
//! every unlock and lives only in memory for the session.

use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Salt length in bytes. Stored next to the ciphertext; not secret.
pub const SALT_LEN: usize = 16;

/// PBKDF2-HMAC-SHA256 work factor. Fixed; changing it invalidates every
/// existing installation's key, so treat it like a schema version.
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// 256-bit symmetric key derived from the user's PIN. Zeroized on drop;
/// deliberately has no Debug impl so key bytes cannot end up in logs.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: [u8; 32],
}

impl KeyMaterial {
    pub fn bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

/// Derive the session key from `(pin, salt)`. Deterministic: the same pair
/// always yields the same key.
pub fn derive_key(pin: &str, salt: &[u8; SALT_LEN]) -> KeyMaterial {
    let mut bytes = [0u8; 32];
    pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt, PBKDF2_ROUNDS, &mut bytes);
    KeyMaterial { bytes }
}

/// Generate a fresh random salt. Called once on first unlock and again on
/// every PIN rotation.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_pin_and_salt_derive_the_same_key() {
        let salt = [7u8; SALT_LEN];
        let a = derive_key("1234", &salt);
        let b = derive_key("1234", &salt);
        assert_eq!(a.bytes(), b.bytes());
    }

    #[test]
    fn different_pin_or_salt_changes_the_key() {
        let salt = [7u8; SALT_LEN];
        let base = derive_key("1234", &salt);

        let other_pin = derive_key("4321", &salt);
        assert_ne!(base.bytes(), other_pin.bytes());

        let other_salt = derive_key("1234", &[8u8; SALT_LEN]);
        assert_ne!(base.bytes(), other_salt.bytes());
    }

    #[test]
    fn generated_salts_are_unique() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
