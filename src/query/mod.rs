//! Read-only query surface
//!
//! Queries can be built directly or parsed from a route path such as
//! `getWallet/<address>` or `aggregateSignature/<uuid>`.

use crate::codec::AggregatedSignature;
use crate::multisig::{Keeper, MultisigError, Transaction, Wallet};
use crate::storage::KvStore;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A read-only lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    GetWallet { address: String },
    /// All wallets, or only those containing `pub_key`
    ListWallets { pub_key: Option<String> },
    GetTransaction { id: Uuid },
    ListTransactions { address: String },
    AggregateSignature { id: Uuid },
}

impl Query {
    /// Parse a route like `listWallets/<pubkey>`
    pub fn from_path(path: &str) -> Result<Self, MultisigError> {
        let mut parts = path.trim_matches('/').splitn(2, '/');
        let route = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).filter(|s| !s.is_empty());

        let required = |what: &str| {
            arg.map(str::to_string)
                .ok_or_else(|| MultisigError::invalid(format!("{} requires {}", route, what)))
        };

        match route {
            "getWallet" => Ok(Query::GetWallet {
                address: required("an address")?,
            }),
            "listWallets" => Ok(Query::ListWallets {
                pub_key: arg.map(str::to_string),
            }),
            "getTransaction" => Ok(Query::GetTransaction {
                id: parse_id(&required("a transaction id")?)?,
            }),
            "listTransactions" => Ok(Query::ListTransactions {
                address: required("an address")?,
            }),
            "aggregateSignature" => Ok(Query::AggregateSignature {
                id: parse_id(&required("a transaction id")?)?,
            }),
            other => Err(MultisigError::invalid(format!(
                "unknown query endpoint: {}",
                other
            ))),
        }
    }
}

fn parse_id(raw: &str) -> Result<Uuid, MultisigError> {
    Uuid::parse_str(raw)
        .map_err(|e| MultisigError::invalid(format!("invalid transaction id {}: {}", raw, e)))
}

/// Aggregated token plus the participation it encodes
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AggregateResponse {
    pub transaction_id: Uuid,
    /// One character per slot, '1' where the key signed
    pub mask: String,
    pub signers: Vec<String>,
    pub token: String,
}

/// Typed query result
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum QueryResponse {
    Wallet(Wallet),
    Wallets(Vec<Wallet>),
    Transaction(Transaction),
    Transactions(Vec<Transaction>),
    Aggregate(AggregateResponse),
}

impl QueryResponse {
    /// Indented JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResponse::Wallet(wallet) => write!(f, "{}", wallet),
            QueryResponse::Wallets(wallets) => write_lines(f, wallets),
            QueryResponse::Transaction(tx) => write!(f, "{}", tx),
            QueryResponse::Transactions(txs) => write_lines(f, txs),
            QueryResponse::Aggregate(agg) => write!(f, "{}", agg.token),
        }
    }
}

fn write_lines<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            writeln!(f)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Answer `query` from the keeper's current state
pub fn query<S: KvStore>(
    keeper: &Keeper<S>,
    query: &Query,
) -> Result<QueryResponse, MultisigError> {
    let response = match query {
        Query::GetWallet { address } => QueryResponse::Wallet(keeper.get_wallet(address)?),
        Query::ListWallets { pub_key: Some(pk) } => {
            QueryResponse::Wallets(keeper.list_wallets_by_public_key(pk)?)
        }
        Query::ListWallets { pub_key: None } => QueryResponse::Wallets(keeper.list_wallets()?),
        Query::GetTransaction { id } => QueryResponse::Transaction(keeper.get_transaction(id)?),
        Query::ListTransactions { address } => {
            QueryResponse::Transactions(keeper.list_transactions_by_from(address)?)
        }
        Query::AggregateSignature { id } => {
            let tx = keeper.get_transaction(id)?;
            let token = keeper.aggregate_signature(id)?;
            let aggregated = AggregatedSignature::decode(&token)?;
            QueryResponse::Aggregate(AggregateResponse {
                transaction_id: tx.id,
                mask: aggregated.mask().to_string(),
                signers: tx.signed_by().into_iter().map(str::to_string).collect(),
                token,
            })
        }
    };
    Ok(response)
}
