//! CLI commands for the multisig keeper
//!
//! Mutations go through the command handler; reads go through the query surface.

use crate::handler::{self, Command, CommandOutcome};
use crate::multisig::{Coin, Keeper, KeeperConfig, Transaction, Wallet};
use crate::query::{self, Query, QueryResponse};
use crate::storage::{FileStore, StorageConfig};
use std::path::PathBuf;
use uuid::Uuid;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub keeper: Keeper<FileStore>,
    /// Host block height used for new transactions and the sweep
    pub height: u64,
    /// Print query results as JSON
    pub json: bool,
}

impl AppState {
    /// Open the store under `data_dir`
    pub fn new(
        data_dir: PathBuf,
        keeper_config: KeeperConfig,
        height: u64,
        json: bool,
    ) -> CliResult<Self> {
        let storage_config = StorageConfig {
            data_dir,
            ..Default::default()
        };
        let store = FileStore::open(storage_config)?;

        Ok(Self {
            keeper: Keeper::new(store, keeper_config),
            height,
            json,
        })
    }

    fn apply(&mut self, command: Command) -> CliResult<CommandOutcome> {
        Ok(handler::handle(&mut self.keeper, self.height, command)?)
    }

    fn show(&self, response: &QueryResponse) -> CliResult<()> {
        if self.json {
            println!("{}", response.to_json()?);
        } else {
            println!("{}", response);
        }
        Ok(())
    }
}

fn print_wallet(wallet: &Wallet) {
    println!("   Name: {}", wallet.name);
    println!("   Address: {}", wallet.address);
    println!("   Threshold: {}", wallet.description());
    for (slot, key) in wallet.public_keys.iter().enumerate() {
        println!("   [{}] {}", slot, key);
    }
}

fn print_transaction(tx: &Transaction) {
    println!("   ID: {}", tx.id);
    println!("   {} --> {} {}", tx.from, tx.to, tx.amount);
    println!(
        "   Signatures: {}/{} ({})",
        tx.signature_count(),
        tx.min_signatures,
        tx.status()
    );
    if let Some(chain_tx_id) = &tx.chain_tx_id {
        println!("   Chain tx: {}", chain_tx_id);
    }
}

/// Register a new wallet
pub fn cmd_wallet_create(
    state: &mut AppState,
    name: &str,
    public_keys: Vec<String>,
    min_signatures: u8,
) -> CliResult<()> {
    if let CommandOutcome::WalletCreated(wallet) =
        state.apply(Command::create_wallet(name, public_keys, min_signatures))?
    {
        println!("✅ Wallet created!");
        print_wallet(&wallet);
    }
    Ok(())
}

/// Show the address a key set would get, without registering it
pub fn cmd_wallet_preview(
    state: &AppState,
    name: &str,
    public_keys: Vec<String>,
    min_signatures: u8,
) -> CliResult<()> {
    let wallet = state
        .keeper
        .preview_wallet(name, public_keys, min_signatures)?;
    println!("🔍 Wallet preview ({} policy)", state.keeper.config().address_policy);
    print_wallet(&wallet);
    Ok(())
}

pub fn cmd_wallet_get(state: &AppState, address: &str) -> CliResult<()> {
    let response = query::query(
        &state.keeper,
        &Query::GetWallet {
            address: address.to_string(),
        },
    )?;
    state.show(&response)
}

/// List wallets, optionally only those containing `pub_key`
pub fn cmd_wallet_list(state: &AppState, pub_key: Option<&str>) -> CliResult<()> {
    let response = query::query(
        &state.keeper,
        &Query::ListWallets {
            pub_key: pub_key.map(str::to_string),
        },
    )?;
    if matches!(&response, QueryResponse::Wallets(w) if w.is_empty()) && !state.json {
        println!("📭 No wallets found.");
        return Ok(());
    }
    state.show(&response)
}

/// Open a transfer from a wallet
pub fn cmd_tx_create(state: &mut AppState, from: &str, to: &str, amount: &str) -> CliResult<()> {
    let amount: Coin = amount.parse()?;
    if let CommandOutcome::TransactionCreated(tx) =
        state.apply(Command::create_transaction(from, to, amount))?
    {
        println!("📝 Transaction created at height {}", tx.created_at_height);
        print_transaction(&tx);
    }
    Ok(())
}

/// Submit a signature for one wallet key
pub fn cmd_tx_sign(
    state: &mut AppState,
    id: &Uuid,
    pub_key: &str,
    signature: &str,
    raw_pub_key: Option<String>,
) -> CliResult<()> {
    if let CommandOutcome::TransactionSigned(tx) =
        state.apply(Command::sign_transaction(*id, pub_key, signature, raw_pub_key))?
    {
        println!("✍️  Signature recorded");
        print_transaction(&tx);
        if tx.is_ready() && !tx.is_completed() {
            println!("   Threshold reached; run `tx aggregate {}`", tx.id);
        }
    }
    Ok(())
}

/// Attach the host ledger transaction id
pub fn cmd_tx_complete(state: &mut AppState, id: &Uuid, chain_tx_id: &str) -> CliResult<()> {
    if let CommandOutcome::TransactionCompleted(tx) =
        state.apply(Command::complete_transaction(*id, chain_tx_id))?
    {
        println!("✅ Transaction completed!");
        print_transaction(&tx);
    }
    Ok(())
}

pub fn cmd_tx_get(state: &AppState, id: &Uuid) -> CliResult<()> {
    let response = query::query(&state.keeper, &Query::GetTransaction { id: *id })?;
    state.show(&response)
}

pub fn cmd_tx_list(state: &AppState, address: &str) -> CliResult<()> {
    let response = query::query(
        &state.keeper,
        &Query::ListTransactions {
            address: address.to_string(),
        },
    )?;
    if matches!(&response, QueryResponse::Transactions(t) if t.is_empty()) && !state.json {
        println!("📭 No transactions for {}", address);
        return Ok(());
    }
    state.show(&response)
}

/// Print the aggregated-signature token
pub fn cmd_tx_aggregate(state: &AppState, id: &Uuid) -> CliResult<()> {
    let response = query::query(&state.keeper, &Query::AggregateSignature { id: *id })?;
    if let QueryResponse::Aggregate(agg) = &response {
        if !state.json {
            println!("🔐 Aggregated signature for {}", agg.transaction_id);
            println!("   Slots: {}", agg.mask);
            println!("   Signers: {}", agg.signers.join(", "));
            println!("   Token: {}", agg.token);
            return Ok(());
        }
    }
    state.show(&response)
}

/// Run any query route, e.g. `listWallets/<pubkey>`
pub fn cmd_query(state: &AppState, path: &str) -> CliResult<()> {
    let route = Query::from_path(path)?;
    let response = query::query(&state.keeper, &route)?;
    state.show(&response)
}

/// Purge transactions older than `max_age` blocks (configured window if `None`)
pub fn cmd_cleanup(state: &mut AppState, max_age: Option<u64>) -> CliResult<()> {
    let removed = match max_age {
        Some(age) => state.keeper.cleanup_stale(state.height, age)?,
        None => state.keeper.sweep(state.height)?,
    };
    println!(
        "🧹 Removed {} stale transaction(s) at height {}",
        removed, state.height
    );
    Ok(())
}
