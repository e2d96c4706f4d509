//! Liquidation candidates: a borrow position joined with its evaluated liquidity.

use alloy::primitives::{Address, U256};
use liquidator_api::BorrowPosition;
use liquidator_chain::AccountLiquidity;

/// A position evaluated in the current cycle. Exists only while its page is processed.
#[derive(Debug, Clone)]
pub struct LiquidationCandidate {
    pub position: BorrowPosition,
    pub liquidity: AccountLiquidity,
}

impl LiquidationCandidate {
    pub fn new(position: BorrowPosition, liquidity: AccountLiquidity) -> Self {
        Self {
            position,
            liquidity,
        }
    }

    /// Borrower owning the position.
    #[inline]
    pub fn borrower(&self) -> Address {
        self.position.borrower
    }

    #[inline]
    pub fn shortfall(&self) -> U256 {
        self.liquidity.shortfall
    }

    /// Check if the account is undercollateralized (`shortfall > 0`).
    #[inline]
    pub fn has_shortfall(&self) -> bool {
        self.liquidity.has_shortfall()
    }

    /// Symbol of the underlying for logs, falling back to its address.
    pub fn underlying_label(&self) -> String {
        self.position
            .underlying_symbol
            .clone()
            .unwrap_or_else(|| self.position.underlying.to_string())
    }
}
