//! Errors raised by the registry, ledger and command handlers

use crate::codec::CodecError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors related to multisig operations
#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Duplicate signer public key: {0}")]
    DuplicateSigner(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Wallet already exists: {0}")]
    DuplicateWallet(String),
    #[error("Transaction already exists: {0}")]
    DuplicateTransaction(String),
    #[error("Transaction already completed: {0}")]
    AlreadyCompleted(String),
    #[error("Signer not authorized: {0}")]
    UnknownSigner(String),
    #[error("Encoding error: {0}")]
    Encoding(#[from] CodecError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Corrupt record {key}: {source}")]
    CorruptRecord {
        key: String,
        source: serde_json::Error,
    },
}

/// Coarse error taxonomy surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing fields
    Validation,
    /// Wallet or transaction absent
    NotFound,
    /// Duplicate wallet, duplicate transaction, double completion
    Conflict,
    /// Signature from a key outside the wallet
    UnknownSigner,
    /// Aggregate cannot be represented
    UnsupportedEncoding,
    /// Store failure; fatal for the current operation
    Storage,
}

impl MultisigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MultisigError::InvalidThreshold(_)
            | MultisigError::DuplicateSigner(_)
            | MultisigError::InvalidRequest(_) => ErrorKind::Validation,
            MultisigError::WalletNotFound(_) | MultisigError::TransactionNotFound(_) => {
                ErrorKind::NotFound
            }
            MultisigError::DuplicateWallet(_)
            | MultisigError::DuplicateTransaction(_)
            | MultisigError::AlreadyCompleted(_) => ErrorKind::Conflict,
            MultisigError::UnknownSigner(_) => ErrorKind::UnknownSigner,
            MultisigError::Encoding(_) => ErrorKind::UnsupportedEncoding,
            MultisigError::Storage(_) | MultisigError::CorruptRecord { .. } => ErrorKind::Storage,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        MultisigError::InvalidRequest(message.into())
    }
}
