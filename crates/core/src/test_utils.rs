//! Shared fixtures for unit tests.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use liquidator_api::{BorrowPosition, Borrower};
use liquidator_chain::{AccountLiquidity, ChainClient, ChainError, WriteReceipt, WriteRequest};
use mockall::mock;

mock! {
    pub Chain {}

    #[async_trait]
    impl ChainClient for Chain {
        fn signer_address(&self) -> Address;
        async fn account_liquidity(
            &self,
            collateral: Address,
            account: Address,
        ) -> Result<AccountLiquidity, ChainError>;
        async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;
        async fn submit(&self, request: &WriteRequest) -> Result<B256, ChainError>;
        async fn wait_for_receipt(&self, tx_hash: B256) -> Result<WriteReceipt, ChainError>;
    }
}

pub const LIQUIDATOR: Address = Address::new([0x1d; 20]);
pub const ROUTER: Address = Address::new([0x7e; 20]);
pub const UNDERLYING: Address = Address::new([0xe7; 20]);

/// Collateral market address derived from a borrower, so each borrower gets its own.
pub fn collateral_of(borrower: Address) -> Address {
    let mut bytes = borrower.0 .0;
    bytes[0] = 0xc0;
    Address::from(bytes)
}

pub fn position(borrower: Address) -> BorrowPosition {
    BorrowPosition {
        id: format!("{borrower}-position"),
        borrower,
        borrowable: Address::repeat_byte(0xb0),
        collateral: collateral_of(borrower),
        underlying: UNDERLYING,
        underlying_symbol: Some("WETH".to_string()),
        borrow_index: 1.0,
        borrow_balance: 100.0,
    }
}

pub fn borrower(address: Address) -> Borrower {
    Borrower {
        address,
        positions: std::iter::once(position(address)).collect(),
    }
}

pub fn shortfall(amount: u64) -> AccountLiquidity {
    AccountLiquidity {
        liquidity: U256::ZERO,
        shortfall: U256::from(amount),
    }
}

pub fn healthy(liquidity: u64) -> AccountLiquidity {
    AccountLiquidity {
        liquidity: U256::from(liquidity),
        shortfall: U256::ZERO,
    }
}

pub fn receipt(tx_hash: B256) -> WriteReceipt {
    WriteReceipt {
        tx_hash,
        block_number: Some(1),
        gas_used: 21_000,
    }
}
