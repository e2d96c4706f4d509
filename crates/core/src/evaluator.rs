//! Shortfall evaluation for borrow positions.
//!
//! Each position is checked with a simulated `accountLiquidity` call on its
//! collateral market. Reads carry no ordering constraint, so a page is
//! evaluated concurrently; results keep enumeration order.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::position::LiquidationCandidate;
use liquidator_api::{BorrowPosition, Borrower};
use liquidator_chain::{AccountLiquidity, ChainClient, ChainError};

/// Outcome of evaluating every position of one page.
#[derive(Debug, Default)]
pub struct PageEvaluation {
    /// Successfully evaluated positions, healthy ones included, in enumeration order
    pub candidates: Vec<LiquidationCandidate>,
    /// Positions whose simulated call failed and were skipped
    pub failed: usize,
}

impl PageEvaluation {
    /// Number of positions evaluated successfully.
    pub fn evaluated(&self) -> usize {
        self.candidates.len()
    }

    /// Candidates with a positive shortfall.
    pub fn with_shortfall(&self) -> impl Iterator<Item = &LiquidationCandidate> {
        self.candidates.iter().filter(|c| c.has_shortfall())
    }
}

/// Evaluates account liquidity through read-only calls.
pub struct ShortfallEvaluator<C> {
    chain: Arc<C>,
    max_concurrent: usize,
}

impl<C: ChainClient> ShortfallEvaluator<C> {
    pub fn new(chain: Arc<C>, max_concurrent: usize) -> Self {
        Self {
            chain,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Evaluate a single position. No transaction is broadcast.
    pub async fn evaluate(&self, position: &BorrowPosition) -> Result<AccountLiquidity, ChainError> {
        self.chain
            .account_liquidity(position.collateral, position.borrower)
            .await
    }

    /// Evaluate every position of a page.
    ///
    /// A failed call only skips its own position.
    #[instrument(skip_all, fields(borrowers = borrowers.len()))]
    pub async fn evaluate_page(&self, borrowers: &[Borrower]) -> PageEvaluation {
        let positions = borrowers.iter().flat_map(|b| b.positions.iter());

        let results: Vec<_> = stream::iter(positions)
            .map(|position| async move { (position, self.evaluate(position).await) })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut evaluation = PageEvaluation::default();
        for (position, result) in results {
            match result {
                Ok(liquidity) => {
                    debug!(
                        position = %position.id,
                        borrower = %position.borrower,
                        liquidity = %liquidity.liquidity,
                        shortfall = %liquidity.shortfall,
                        "Position evaluated"
                    );
                    evaluation
                        .candidates
                        .push(LiquidationCandidate::new(position.clone(), liquidity));
                }
                Err(e) => {
                    warn!(
                        position = %position.id,
                        borrower = %position.borrower,
                        collateral = %position.collateral,
                        error = %e,
                        "Shortfall evaluation failed, skipping position"
                    );
                    evaluation.failed += 1;
                }
            }
        }

        evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{borrower, collateral_of, healthy, shortfall, MockChain};
    use alloy::primitives::Address;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_evaluate_uses_collateral_and_borrower() {
        let alice = Address::repeat_byte(0xa1);
        let mut chain = MockChain::new();
        chain
            .expect_account_liquidity()
            .with(eq(collateral_of(alice)), eq(alice))
            .times(1)
            .returning(|_, _| Ok(shortfall(50)));

        let evaluator = ShortfallEvaluator::new(Arc::new(chain), 4);
        let result = evaluator.evaluate(&borrower(alice).positions[0]).await.unwrap();

        assert!(result.has_shortfall());
        assert_eq!(result.shortfall, alloy::primitives::U256::from(50u64));
    }

    #[tokio::test]
    async fn test_failed_evaluation_skips_only_that_position() {
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb2);
        let carol = Address::repeat_byte(0xc3);

        let mut chain = MockChain::new();
        chain
            .expect_account_liquidity()
            .returning(move |_, account| {
                if account == bob {
                    Err(ChainError::Call {
                        contract: collateral_of(bob),
                        reason: "execution reverted".to_string(),
                    })
                } else if account == alice {
                    Ok(shortfall(10))
                } else {
                    Ok(healthy(500))
                }
            });

        let evaluator = ShortfallEvaluator::new(Arc::new(chain), 2);
        let page = vec![borrower(alice), borrower(bob), borrower(carol)];
        let evaluation = evaluator.evaluate_page(&page).await;

        assert_eq!(evaluation.failed, 1);
        assert_eq!(evaluation.evaluated(), 2);

        // Enumeration order is preserved
        let borrowers: Vec<_> = evaluation.candidates.iter().map(|c| c.borrower()).collect();
        assert_eq!(borrowers, vec![alice, carol]);

        let liquidatable: Vec<_> = evaluation.with_shortfall().map(|c| c.borrower()).collect();
        assert_eq!(liquidatable, vec![alice]);
    }

    #[tokio::test]
    async fn test_empty_page() {
        let chain = MockChain::new();
        let evaluator = ShortfallEvaluator::new(Arc::new(chain), 0);
        let evaluation = evaluator.evaluate_page(&[]).await;

        assert_eq!(evaluation.evaluated(), 0);
        assert_eq!(evaluation.failed, 0);
    }
}
