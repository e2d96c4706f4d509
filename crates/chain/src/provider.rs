//! Read-only chain access.
//! Uses Alloy providers for type-safe `eth_call` simulation.

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::http::reqwest::Url;
use tracing::{debug, info};

use crate::contracts::{ICollateral, IERC20};
use crate::error::ChainError;

/// Liquidity and shortfall of an account, as computed by its collateral market.
///
/// A healthy account has `liquidity > 0` and zero shortfall; an
/// undercollateralized one has `shortfall > 0` and zero liquidity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountLiquidity {
    pub liquidity: U256,
    pub shortfall: U256,
}

impl AccountLiquidity {
    /// Exact integer check, no rounding involved.
    #[inline]
    pub fn has_shortfall(&self) -> bool {
        !self.shortfall.is_zero()
    }
}

/// Provider manager for read calls.
/// Every read is a simulated call: nothing is broadcast.
#[derive(Debug, Clone)]
pub struct ProviderManager {
    rpc_url: Url,
}

impl ProviderManager {
    /// Create a provider manager and verify the endpoint answers.
    pub async fn new(rpc_url: &str) -> Result<Self, ChainError> {
        let rpc_url: Url = rpc_url
            .parse()
            .map_err(|e| ChainError::Config(format!("invalid RPC url {rpc_url}: {e}")))?;

        let provider = ProviderBuilder::new().on_http(rpc_url.clone());
        let block = provider.get_block_number().await.map_err(ChainError::rpc)?;
        info!(rpc = %rpc_url, block = block, "Provider connection verified");

        Ok(Self { rpc_url })
    }

    /// Get chain ID using Alloy provider.
    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        provider.get_chain_id().await.map_err(ChainError::rpc)
    }

    /// Simulate `accountLiquidity(account)` on a collateral market.
    pub async fn account_liquidity(
        &self,
        collateral: Address,
        account: Address,
    ) -> Result<AccountLiquidity, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let contract = ICollateral::new(collateral, &provider);

        let result = contract
            .accountLiquidity(account)
            .call()
            .await
            .map_err(|e| ChainError::call(collateral, e))?;

        debug!(
            collateral = %collateral,
            account = %account,
            liquidity = %result.liquidity,
            shortfall = %result.shortfall,
            "Account liquidity fetched"
        );

        Ok(AccountLiquidity {
            liquidity: result.liquidity,
            shortfall: result.shortfall,
        })
    }

    /// Read an ERC20 balance.
    pub async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let contract = IERC20::new(token, &provider);

        let result = contract
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| ChainError::call(token, e))?;

        Ok(result.balance)
    }
}
