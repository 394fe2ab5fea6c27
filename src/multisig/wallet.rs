//! Threshold wallet records
//!
//! A wallet is k-of-n over a canonically sorted key set. The position of a key
//! in that order is its slot, which the codec later uses as a bit position.

use crate::crypto::{name_digest_address, threshold_key_address, AddressPolicy};
use crate::multisig::error::MultisigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated input for a new wallet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletConfig {
    name: String,
    min_signatures: u8,
    public_keys: Vec<String>,
}

impl WalletConfig {
    /// Validate and canonicalize a wallet definition
    ///
    /// # Errors
    /// `InvalidThreshold` unless `1 <= min_signatures <= public_keys.len()`,
    /// then `InvalidRequest` for an empty name or key, `DuplicateSigner` for a
    /// repeated key.
    pub fn new(
        name: &str,
        public_keys: Vec<String>,
        min_signatures: u8,
    ) -> Result<Self, MultisigError> {
        if min_signatures == 0 {
            return Err(MultisigError::InvalidThreshold(
                "must require at least 1 signature".to_string(),
            ));
        }
        if min_signatures as usize > public_keys.len() {
            return Err(MultisigError::InvalidThreshold(format!(
                "threshold {} exceeds key count {}",
                min_signatures,
                public_keys.len()
            )));
        }
        if name.trim().is_empty() {
            return Err(MultisigError::invalid("name cannot be empty"));
        }
        if public_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(MultisigError::invalid("public keys cannot be blank"));
        }

        let mut public_keys = public_keys;
        public_keys.sort();
        if let Some(pair) = public_keys.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(MultisigError::DuplicateSigner(pair[0].clone()));
        }

        Ok(Self {
            name: name.to_string(),
            min_signatures,
            public_keys,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_signatures(&self) -> u8 {
        self.min_signatures
    }

    /// Keys in canonical (slot) order
    pub fn public_keys(&self) -> &[String] {
        &self.public_keys
    }

    /// Derive the address this definition would be registered under
    pub fn address(&self, policy: AddressPolicy) -> Result<String, MultisigError> {
        match policy {
            AddressPolicy::NameDigest => Ok(name_digest_address(&self.name)),
            AddressPolicy::ThresholdKey => {
                threshold_key_address(self.min_signatures, &self.public_keys).ok_or_else(|| {
                    MultisigError::invalid("key set too large for a 32-bit length prefix")
                })
            }
        }
    }
}

/// A registered threshold wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wallet {
    pub name: String,
    pub min_signatures: u8,
    /// Canonical key order; index = slot
    pub public_keys: Vec<String>,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(config: WalletConfig, policy: AddressPolicy) -> Result<Self, MultisigError> {
        let address = config.address(policy)?;
        Ok(Self {
            name: config.name,
            min_signatures: config.min_signatures,
            public_keys: config.public_keys,
            address,
            created_at: Utc::now(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Slot of a key, if it belongs to this wallet
    pub fn slot_of(&self, public_key: &str) -> Option<usize> {
        self.public_keys.iter().position(|k| k == public_key)
    }

    pub fn is_signer(&self, public_key: &str) -> bool {
        self.slot_of(public_key).is_some()
    }

    pub fn threshold(&self) -> u8 {
        self.min_signatures
    }

    pub fn signer_count(&self) -> usize {
        self.public_keys.len()
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.min_signatures, self.public_keys.len())
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wallet: {} ({} of {}): {}",
            self.name,
            self.min_signatures,
            self.public_keys.len(),
            self.address
        )
    }
}
