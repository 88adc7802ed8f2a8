//! Concrete record storage with encryption at rest.
//! AES-256-GCM over a sled database, keyed by a PIN-derived key.

pub mod key_material;
pub mod secure_record_store;
