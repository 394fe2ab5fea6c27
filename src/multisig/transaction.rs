//! Pending threshold-wallet transactions
//!
//! Tracks a transfer from creation through signature collection to completion.

use crate::codec::{AggregatedSignature, CodecError};
use crate::multisig::error::MultisigError;
use crate::multisig::wallet::Wallet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Amount of a single denomination
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coin {
    pub amount: u128,
    pub denom: String,
}

impl Coin {
    pub fn new(amount: u128, denom: &str) -> Self {
        Self {
            amount,
            denom: denom.to_string(),
        }
    }

    /// Positive amount and a lowercase alphanumeric denom starting with a letter
    pub fn validate(&self) -> Result<(), MultisigError> {
        if self.amount == 0 {
            return Err(MultisigError::invalid("amount must be positive"));
        }
        let mut chars = self.denom.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            && self.denom.len() >= 3
            && self.denom.len() <= 16;
        if !valid {
            return Err(MultisigError::invalid(format!(
                "invalid denom: {:?}",
                self.denom
            )));
        }
        Ok(())
    }
}

impl FromStr for Coin {
    type Err = MultisigError;

    /// Parse "100stake"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MultisigError::invalid("amount cannot be empty"));
        }
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| MultisigError::invalid(format!("missing denom in {:?}", s)))?;
        let (digits, denom) = s.split_at(split);
        let amount = digits
            .parse::<u128>()
            .map_err(|_| MultisigError::invalid(format!("invalid amount in {:?}", s)))?;

        let coin = Coin::new(amount, denom);
        coin.validate()?;
        Ok(coin)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A signature submitted by one wallet key
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Signature {
    /// Base64 signature bytes
    pub signature: String,
    /// Base64 encoding of the signer's key, as the host expects it
    pub raw_pub_key: Option<String>,
}

impl Signature {
    pub fn new(signature: &str, raw_pub_key: Option<String>) -> Self {
        Self {
            signature: signature.to_string(),
            raw_pub_key,
        }
    }
}

/// One wallet key and whatever it has signed so far
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureSlot {
    pub pub_key: String,
    pub signature: Option<Signature>,
}

/// Derived lifecycle state
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Fewer than the threshold signed
    AwaitingSignatures,
    /// Threshold reached, not yet on chain
    Ready,
    /// Host ledger id attached
    Completed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::AwaitingSignatures => "awaiting signatures",
            TransactionStatus::Ready => "ready",
            TransactionStatus::Completed => "completed",
        };
        write!(f, "{}", label)
    }
}

/// A transfer out of a threshold wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub amount: Coin,
    /// One slot per wallet key, in wallet order
    pub signatures: Vec<SignatureSlot>,
    pub min_signatures: u8,
    pub chain_tx_id: Option<String>,
    pub created_at_height: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Open a transaction with an empty slot per wallet key
    pub fn new(id: Uuid, wallet: &Wallet, to: &str, amount: Coin, height: u64) -> Self {
        let now = Utc::now();
        let signatures = wallet
            .public_keys
            .iter()
            .map(|pub_key| SignatureSlot {
                pub_key: pub_key.clone(),
                signature: None,
            })
            .collect();

        Self {
            id,
            from: wallet.address.clone(),
            to: to.to_string(),
            amount,
            signatures,
            min_signatures: wallet.min_signatures,
            chain_tx_id: None,
            created_at_height: height,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a signature for `pub_key`, replacing any earlier one
    ///
    /// Returns the slot that was written.
    pub fn add_signature(
        &mut self,
        pub_key: &str,
        signature: Signature,
    ) -> Result<usize, MultisigError> {
        if self.is_completed() {
            return Err(MultisigError::AlreadyCompleted(self.id.to_string()));
        }
        let slot = self
            .signatures
            .iter()
            .position(|s| s.pub_key == pub_key)
            .ok_or_else(|| MultisigError::UnknownSigner(pub_key.to_string()))?;

        self.signatures[slot].signature = Some(signature);
        self.updated_at = Utc::now();
        Ok(slot)
    }

    /// Attach the host ledger's transaction id
    pub fn complete(&mut self, chain_tx_id: &str) -> Result<(), MultisigError> {
        if self.is_completed() {
            return Err(MultisigError::AlreadyCompleted(self.id.to_string()));
        }
        self.chain_tx_id = Some(chain_tx_id.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Get number of signatures collected
    pub fn signature_count(&self) -> usize {
        self.signatures
            .iter()
            .filter(|s| s.signature.is_some())
            .count()
    }

    /// Check if transaction has enough signatures
    pub fn is_ready(&self) -> bool {
        self.signature_count() >= self.min_signatures as usize
    }

    pub fn is_completed(&self) -> bool {
        self.chain_tx_id.is_some()
    }

    pub fn status(&self) -> TransactionStatus {
        if self.is_completed() {
            TransactionStatus::Completed
        } else if self.is_ready() {
            TransactionStatus::Ready
        } else {
            TransactionStatus::AwaitingSignatures
        }
    }

    /// Get signers who have already signed
    pub fn signed_by(&self) -> Vec<&str> {
        self.signatures
            .iter()
            .filter(|s| s.signature.is_some())
            .map(|s| s.pub_key.as_str())
            .collect()
    }

    /// Filled slots as `(slot, signature)` in slot order
    pub fn signed_slots(&self) -> impl Iterator<Item = (usize, &Signature)> + '_ {
        self.signatures
            .iter()
            .enumerate()
            .filter_map(|(slot, s)| s.signature.as_ref().map(|sig| (slot, sig)))
    }

    /// Expired once `created_at_height + max_age < current_height`
    pub fn is_stale(&self, current_height: u64, max_age: u64) -> bool {
        self.created_at_height.saturating_add(max_age) < current_height
    }

    /// Pack the collected signatures under `wallet`'s key order
    ///
    /// The threshold is not enforced here; callers check [`status`](Self::status).
    pub fn aggregate(&self, wallet: &Wallet) -> Result<AggregatedSignature, MultisigError> {
        if wallet.address != self.from {
            return Err(MultisigError::invalid(format!(
                "transaction {} does not belong to wallet {}",
                self.id, wallet.address
            )));
        }
        if wallet.signer_count() != self.signatures.len() {
            return Err(CodecError::UnsupportedWalletSize(self.signatures.len()).into());
        }
        let aggregated = AggregatedSignature::from_base64_slots(
            wallet.signer_count(),
            self.signed_slots()
                .map(|(slot, sig)| (slot, sig.signature.as_str())),
        )?;
        Ok(aggregated)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction ({}): {} --> {} {}",
            self.id, self.from, self.to, self.amount
        )
    }
}
