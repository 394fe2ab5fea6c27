//! Threshold-wallet keeper CLI
//!
//! A command-line interface for registering k-of-n wallets, collecting
//! signatures and producing aggregated-signature tokens.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use threshold_keeper::cli::{self, AppState};
use threshold_keeper::crypto::AddressPolicy;
use threshold_keeper::multisig::{KeeperConfig, DEFAULT_MAX_TRANSACTION_AGE};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "multisig")]
#[command(version = "0.1.0")]
#[command(about = "Threshold-wallet keeper and aggregated-signature codec", long_about = None)]
struct Cli {
    /// Data directory for the record store
    #[arg(short, long, default_value = ".multisig_data")]
    data_dir: PathBuf,

    /// Current host block height
    #[arg(long, default_value = "0")]
    height: u64,

    /// Address derivation policy (threshold-key or name-digest)
    #[arg(long, default_value = "threshold-key")]
    address_policy: AddressPolicy,

    /// Blocks a transaction may live before cleanup purges it
    #[arg(long, default_value_t = DEFAULT_MAX_TRANSACTION_AGE)]
    max_age: u64,

    /// Print query results as pretty JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Threshold wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Transaction operations
    Tx {
        #[command(subcommand)]
        action: TxCommands,
    },

    /// Run a query route, e.g. `listWallets/<pubkey>`
    Query {
        /// Route path
        path: String,
    },

    /// Purge stale transactions at the current height
    Cleanup {
        /// Override the configured maximum age
        #[arg(long)]
        max_age: Option<u64>,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Register a new wallet
    Create {
        /// Human-readable name
        #[arg(short, long)]
        name: String,

        /// Signer public keys (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        keys: Vec<String>,

        /// Required signatures
        #[arg(short, long)]
        threshold: u8,
    },

    /// Show the address a wallet would get without registering it
    Preview {
        #[arg(short, long)]
        name: String,

        #[arg(short, long, value_delimiter = ',', required = true)]
        keys: Vec<String>,

        #[arg(short, long)]
        threshold: u8,
    },

    /// Show a wallet
    Get {
        /// Wallet address
        address: String,
    },

    /// List wallets
    List {
        /// Only wallets containing this public key
        #[arg(short, long)]
        pub_key: Option<String>,
    },
}

#[derive(Subcommand)]
enum TxCommands {
    /// Open a transfer from a wallet
    Create {
        /// Source wallet address
        #[arg(short, long)]
        from: String,

        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Amount with denom, e.g. 100stake
        #[arg(short, long)]
        amount: String,
    },

    /// Submit a signature
    Sign {
        /// Transaction id
        id: Uuid,

        /// Signer public key
        #[arg(short, long)]
        pub_key: String,

        /// Base64 signature
        #[arg(short, long)]
        signature: String,

        /// Base64 raw public key
        #[arg(long)]
        raw_pub_key: Option<String>,
    },

    /// Attach the host ledger transaction id
    Complete {
        id: Uuid,

        #[arg(short, long)]
        chain_tx_id: String,
    },

    /// Show a transaction
    Get { id: Uuid },

    /// List transactions drawn from a wallet
    List {
        /// Wallet address
        address: String,
    },

    /// Print the aggregated-signature token
    Aggregate { id: Uuid },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let keeper_config = KeeperConfig {
        address_policy: cli.address_policy,
        max_transaction_age: cli.max_age,
    };
    let mut state = AppState::new(cli.data_dir.clone(), keeper_config, cli.height, cli.json)?;

    // Process commands
    match cli.command {
        Commands::Wallet { action } => match action {
            WalletCommands::Create {
                name,
                keys,
                threshold,
            } => {
                cli::cmd_wallet_create(&mut state, &name, keys, threshold)?;
            }
            WalletCommands::Preview {
                name,
                keys,
                threshold,
            } => {
                cli::cmd_wallet_preview(&state, &name, keys, threshold)?;
            }
            WalletCommands::Get { address } => {
                cli::cmd_wallet_get(&state, &address)?;
            }
            WalletCommands::List { pub_key } => {
                cli::cmd_wallet_list(&state, pub_key.as_deref())?;
            }
        },

        Commands::Tx { action } => match action {
            TxCommands::Create { from, to, amount } => {
                cli::cmd_tx_create(&mut state, &from, &to, &amount)?;
            }
            TxCommands::Sign {
                id,
                pub_key,
                signature,
                raw_pub_key,
            } => {
                cli::cmd_tx_sign(&mut state, &id, &pub_key, &signature, raw_pub_key)?;
            }
            TxCommands::Complete { id, chain_tx_id } => {
                cli::cmd_tx_complete(&mut state, &id, &chain_tx_id)?;
            }
            TxCommands::Get { id } => {
                cli::cmd_tx_get(&state, &id)?;
            }
            TxCommands::List { address } => {
                cli::cmd_tx_list(&state, &address)?;
            }
            TxCommands::Aggregate { id } => {
                cli::cmd_tx_aggregate(&state, &id)?;
            }
        },

        Commands::Query { path } => {
            cli::cmd_query(&state, &path)?;
        }

        Commands::Cleanup { max_age } => {
            cli::cmd_cleanup(&mut state, max_age)?;
        }
    }

    Ok(())
}
