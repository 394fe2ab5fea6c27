//! Address derivation for threshold wallets
//!
//! Two policies exist and are NOT interchangeable: the same wallet yields a
//! different address under each. A deployment picks one and keeps it.

use super::hash::{double_sha256, hash160};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version byte for name-derived addresses (produces addresses starting with '1')
pub const NAME_DIGEST_VERSION: u8 = 0x00;

/// Version byte for key-set-derived addresses (P2SH-style, starts with '3')
pub const THRESHOLD_KEY_VERSION: u8 = 0x05;

/// How a wallet's address is derived
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AddressPolicy {
    /// Hash of the wallet name only
    NameDigest,
    /// Hash of the threshold and the canonical key set
    #[default]
    ThresholdKey,
}

impl fmt::Display for AddressPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressPolicy::NameDigest => write!(f, "name-digest"),
            AddressPolicy::ThresholdKey => write!(f, "threshold-key"),
        }
    }
}

impl FromStr for AddressPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name-digest" | "name_digest" => Ok(AddressPolicy::NameDigest),
            "threshold-key" | "threshold_key" => Ok(AddressPolicy::ThresholdKey),
            other => Err(format!("unknown address policy: {}", other)),
        }
    }
}

/// Base58Check(version || payload || checksum)
///
/// The checksum is the first 4 bytes of double SHA-256 over version || payload.
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut address_bytes = Vec::with_capacity(payload.len() + 5);
    address_bytes.push(version);
    address_bytes.extend_from_slice(payload);

    let checksum = double_sha256(&address_bytes);
    address_bytes.extend_from_slice(&checksum[..4]);

    bs58::encode(address_bytes).into_string()
}

/// Address = Base58Check(0x00 || HASH160(name))
pub fn name_digest_address(name: &str) -> String {
    base58check_encode(NAME_DIGEST_VERSION, &hash160(name.as_bytes()))
}

/// Address = Base58Check(0x05 || HASH160(k || n || len(pk) || pk ...))
///
/// `sorted_keys` must already be in canonical order. `n` and each key length
/// are 4-byte big-endian; `None` if either does not fit.
pub fn threshold_key_address(min_signatures: u8, sorted_keys: &[String]) -> Option<String> {
    let mut script_data = vec![min_signatures];
    script_data.extend_from_slice(&length_prefix(sorted_keys.len())?);
    for key in sorted_keys {
        script_data.extend_from_slice(&length_prefix(key.len())?);
        script_data.extend_from_slice(key.as_bytes());
    }

    Some(base58check_encode(THRESHOLD_KEY_VERSION, &hash160(&script_data)))
}

fn length_prefix(len: usize) -> Option<[u8; 4]> {
    u32::try_from(len).ok().map(u32::to_be_bytes)
}
