//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 / HASH160 hashing
//! - Base58Check address derivation for threshold wallets

pub mod address;
pub mod hash;

pub use address::{
    base58check_encode, name_digest_address, threshold_key_address, AddressPolicy,
    NAME_DIGEST_VERSION, THRESHOLD_KEY_VERSION,
};
pub use hash::{double_sha256, hash160, sha256};
