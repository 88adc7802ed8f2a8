//! Core abstractions for Wardvault: the ward record model, the built-in demo
//! dataset, and the encrypted record-store contract.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod records;
pub mod seed;
pub mod store;
