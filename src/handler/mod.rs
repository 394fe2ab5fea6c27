//! Command handlers
//!
//! Every state change arrives as a [`Command`]. Stateless checks run in
//! [`Command::validate_basic`]; [`handle`] then dispatches to exactly one
//! keeper mutation.

use crate::multisig::{Coin, Keeper, MultisigError, Signature, Transaction, Wallet};
use crate::storage::KvStore;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An intent to change keeper state
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    CreateWallet {
        name: String,
        public_keys: Vec<String>,
        min_signatures: u8,
    },
    CreateTransaction {
        id: Uuid,
        from: String,
        to: String,
        amount: Coin,
    },
    SignTransaction {
        id: Uuid,
        pub_key: String,
        raw_pub_key: Option<String>,
        signature: String,
    },
    CompleteTransaction {
        id: Uuid,
        chain_tx_id: String,
    },
}

impl Command {
    pub fn create_wallet(name: &str, public_keys: Vec<String>, min_signatures: u8) -> Self {
        Command::CreateWallet {
            name: name.to_string(),
            public_keys,
            min_signatures,
        }
    }

    /// New transfer with a freshly generated id
    pub fn create_transaction(from: &str, to: &str, amount: Coin) -> Self {
        Command::CreateTransaction {
            id: Uuid::new_v4(),
            from: from.to_string(),
            to: to.to_string(),
            amount,
        }
    }

    pub fn sign_transaction(
        id: Uuid,
        pub_key: &str,
        signature: &str,
        raw_pub_key: Option<String>,
    ) -> Self {
        Command::SignTransaction {
            id,
            pub_key: pub_key.to_string(),
            raw_pub_key,
            signature: signature.to_string(),
        }
    }

    pub fn complete_transaction(id: Uuid, chain_tx_id: &str) -> Self {
        Command::CompleteTransaction {
            id,
            chain_tx_id: chain_tx_id.to_string(),
        }
    }

    /// Route name
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateWallet { .. } => "create_wallet",
            Command::CreateTransaction { .. } => "create_transaction",
            Command::SignTransaction { .. } => "sign_transaction",
            Command::CompleteTransaction { .. } => "complete_transaction",
        }
    }

    /// Checks that need no state
    pub fn validate_basic(&self) -> Result<(), MultisigError> {
        match self {
            Command::CreateWallet {
                name,
                public_keys,
                min_signatures,
            } => {
                if *min_signatures == 0 || *min_signatures as usize > public_keys.len() {
                    return Err(MultisigError::InvalidThreshold(format!(
                        "{} of {} keys",
                        min_signatures,
                        public_keys.len()
                    )));
                }
                require("name", name)?;
                for key in public_keys {
                    require("public key", key)?;
                }
            }
            Command::CreateTransaction {
                id,
                from,
                to,
                amount,
            } => {
                require_id(id)?;
                require("from address", from)?;
                require("to address", to)?;
                amount.validate()?;
            }
            Command::SignTransaction {
                id,
                pub_key,
                raw_pub_key,
                signature,
            } => {
                require_id(id)?;
                require("public key", pub_key)?;
                require("signature", signature)?;
                require_base64("signature", signature)?;
                if let Some(raw) = raw_pub_key {
                    require_base64("raw public key", raw)?;
                }
            }
            Command::CompleteTransaction { id, chain_tx_id } => {
                require_id(id)?;
                require("chain transaction id", chain_tx_id)?;
            }
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), MultisigError> {
    if value.trim().is_empty() {
        return Err(MultisigError::invalid(format!("{} cannot be blank", field)));
    }
    Ok(())
}

fn require_id(id: &Uuid) -> Result<(), MultisigError> {
    if id.is_nil() {
        return Err(MultisigError::invalid("UUID cannot be blank"));
    }
    Ok(())
}

fn require_base64(field: &str, value: &str) -> Result<(), MultisigError> {
    STANDARD
        .decode(value)
        .map(|_| ())
        .map_err(|e| MultisigError::invalid(format!("{} is not base64: {}", field, e)))
}

/// Result of a handled command
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "result", content = "record", rename_all = "snake_case")]
pub enum CommandOutcome {
    WalletCreated(Wallet),
    TransactionCreated(Transaction),
    TransactionSigned(Transaction),
    TransactionCompleted(Transaction),
}

/// Validate `command` and apply it to the keeper at block `height`
pub fn handle<S: KvStore>(
    keeper: &mut Keeper<S>,
    height: u64,
    command: Command,
) -> Result<CommandOutcome, MultisigError> {
    command.validate_basic()?;
    debug!("Handling {} at height {}", command.name(), height);

    let outcome = match command {
        Command::CreateWallet {
            name,
            public_keys,
            min_signatures,
        } => CommandOutcome::WalletCreated(keeper.create_wallet(
            &name,
            public_keys,
            min_signatures,
        )?),
        Command::CreateTransaction {
            id,
            from,
            to,
            amount,
        } => CommandOutcome::TransactionCreated(
            keeper.create_transaction(id, &from, &to, amount, height)?,
        ),
        Command::SignTransaction {
            id,
            pub_key,
            raw_pub_key,
            signature,
        } => CommandOutcome::TransactionSigned(keeper.add_signature(
            &id,
            &pub_key,
            Signature::new(&signature, raw_pub_key),
        )?),
        Command::CompleteTransaction { id, chain_tx_id } => {
            CommandOutcome::TransactionCompleted(keeper.complete_transaction(&id, &chain_tx_id)?)
        }
    };
    Ok(outcome)
}
