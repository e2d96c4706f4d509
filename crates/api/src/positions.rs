//! Borrower and borrow position records.

use alloy::primitives::Address;
use async_trait::async_trait;
use smallvec::SmallVec;

use crate::subgraph::SubgraphError;

/// A single borrow position as reported by the indexer.
///
/// Snapshot only: it is re-derived on every page fetch and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct BorrowPosition {
    /// Opaque position id assigned by the indexer
    pub id: String,
    /// Borrower owning the debt
    pub borrower: Address,
    /// Borrowable market the funds were drawn from
    pub borrowable: Address,
    /// Collateral market of the same lending pool
    pub collateral: Address,
    /// Underlying asset of the borrowable market
    pub underlying: Address,
    /// Underlying token symbol, when the indexer knows it
    pub underlying_symbol: Option<String>,
    /// Interest accrual checkpoint
    pub borrow_index: f64,
    /// Outstanding debt in underlying units (display only)
    pub borrow_balance: f64,
}

/// A borrower together with their active borrow positions.
#[derive(Debug, Clone)]
pub struct Borrower {
    pub address: Address,
    pub positions: SmallVec<[BorrowPosition; 4]>,
}

impl Borrower {
    /// Check if the borrower has at least one active position.
    pub fn has_positions(&self) -> bool {
        !self.positions.is_empty()
    }
}

/// Result of fetching one page of borrowers.
///
/// Exhaustion is a normal outcome, not an error: callers must never be able
/// to confuse it with a failed query.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    /// Borrowers with at least one active position, in indexer order.
    /// May be empty when the raw page only held borrowers without debt.
    Page(Vec<Borrower>),
    /// The raw result set was empty: there are no more borrowers.
    Exhausted,
}

impl PageOutcome {
    /// Number of positions contained in the page.
    pub fn position_count(&self) -> usize {
        match self {
            Self::Page(borrowers) => borrowers.iter().map(|b| b.positions.len()).sum(),
            Self::Exhausted => 0,
        }
    }
}

/// Paginated source of borrowers with active positions.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Number of borrowers requested per page.
    fn page_size(&self) -> u64;

    /// Fetch page `page` (offset `page * page_size`).
    async fn fetch_page(&self, page: u64) -> Result<PageOutcome, SubgraphError>;
}
