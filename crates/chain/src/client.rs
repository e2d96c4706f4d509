//! Chain client boundary consumed by the liquidation engine.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use tracing::instrument;

use crate::contracts::WriteRequest;
use crate::error::ChainError;
use crate::provider::{AccountLiquidity, ProviderManager};
use crate::signer::{TransactionSender, WriteReceipt};

/// Reads, writes and confirmations against the lending pool contracts.
///
/// Reads are simulated calls and may run concurrently. Writes share the
/// signer's nonce, so callers must confirm one before submitting the next.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address that signs every write.
    fn signer_address(&self) -> Address;

    /// Simulate `accountLiquidity(account)` on `collateral`.
    async fn account_liquidity(
        &self,
        collateral: Address,
        account: Address,
    ) -> Result<AccountLiquidity, ChainError>;

    /// ERC20 balance of `owner`.
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    /// Sign and broadcast a write, returning its hash once accepted by the node.
    async fn submit(&self, request: &WriteRequest) -> Result<B256, ChainError>;

    /// Wait until the write is included; fails if it reverted.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<WriteReceipt, ChainError>;
}

/// [`ChainClient`] backed by an HTTP RPC endpoint.
#[derive(Debug)]
pub struct EvmChainClient {
    provider: ProviderManager,
    sender: TransactionSender,
}

impl EvmChainClient {
    pub fn new(provider: ProviderManager, sender: TransactionSender) -> Self {
        Self { provider, sender }
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn signer_address(&self) -> Address {
        self.sender.address
    }

    async fn account_liquidity(
        &self,
        collateral: Address,
        account: Address,
    ) -> Result<AccountLiquidity, ChainError> {
        self.provider.account_liquidity(collateral, account).await
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        self.provider.balance_of(token, owner).await
    }

    #[instrument(skip(self, request), fields(kind = request.kind(), to = %request.target()))]
    async fn submit(&self, request: &WriteRequest) -> Result<B256, ChainError> {
        self.sender
            .submit(request.target(), request.calldata())
            .await
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<WriteReceipt, ChainError> {
        self.sender.wait_for_receipt(tx_hash).await
    }
}
