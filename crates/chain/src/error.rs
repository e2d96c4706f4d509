//! Chain interaction errors.

use alloy::primitives::{Address, B256};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by reads, submissions and confirmation waits.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid chain configuration: {0}")]
    Config(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("call to {contract} failed: {reason}")]
    Call { contract: Address, reason: String },

    #[error("signer error: {0}")]
    Signer(String),

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error("no receipt for transaction {tx_hash} after {waited:?}")]
    ReceiptTimeout { tx_hash: B256, waited: Duration },
}

impl ChainError {
    /// Build an RPC error from any displayable transport failure.
    pub fn rpc(err: impl std::fmt::Display) -> Self {
        Self::Rpc(err.to_string())
    }

    /// Build a call error for a contract read.
    pub fn call(contract: Address, err: impl std::fmt::Display) -> Self {
        Self::Call {
            contract,
            reason: err.to_string(),
        }
    }
}
