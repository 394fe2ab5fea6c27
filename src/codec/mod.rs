//! Aggregated threshold-signature codec
//!
//! Packs the signatures collected for a subset of wallet slots into the single
//! token the host ledger accepts as a threshold signature. Pure functions, no
//! shared state.
//!
//! # Example
//!
//! ```ignore
//! use threshold_keeper::codec::aggregate;
//!
//! // 3-key wallet, slots 0 and 2 signed
//! let token = aggregate(3, vec![(0, sig0_base64), (2, sig2_base64)])?;
//! assert!(token.starts_with("CgUIAxIBoB"));
//! ```

pub mod aggregate;
pub mod bitmask;
mod wire;

#[cfg(test)]
mod conformance;

pub use aggregate::{aggregate, AggregatedSignature};
pub use bitmask::ParticipationMask;

use thiserror::Error;

/// Errors raised while building or parsing an aggregate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unsupported wallet size: {0} slot(s)")]
    UnsupportedWalletSize(usize),
    #[error("Unsupported signer pattern: {0}")]
    UnsupportedSignerPattern(String),
    #[error("Slot {slot} out of range for a {size}-slot wallet")]
    SlotOutOfRange { slot: usize, size: usize },
    #[error("Malformed signature for slot {slot}: {reason}")]
    MalformedSignature { slot: usize, reason: String },
    #[error("Malformed aggregate: {0}")]
    MalformedAggregate(String),
}
