//! Liquidator chain interaction layer.
//!
//! This crate provides:
//! - Contract bindings for the collateral market, ERC20 and router
//! - Read-only simulated calls through Alloy providers
//! - Transaction signing and sending with a cached nonce
//! - The [`ChainClient`] boundary used by the liquidation engine

mod client;
pub mod contracts;
mod error;
mod provider;
mod signer;

pub use client::{ChainClient, EvmChainClient};
pub use contracts::{ICollateral, IRouter02, WriteRequest, IERC20};
pub use error::ChainError;
pub use provider::{AccountLiquidity, ProviderManager};
pub use signer::{NonceManager, TransactionSender, TransactionSenderBuilder, WriteReceipt};
