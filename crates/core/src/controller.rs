//! Pagination controller: drives the fetch → evaluate → execute cycle page by page.
//!
//! The run starts at page 0 and ends either when the position source reports
//! exhaustion (success) or when a page query keeps failing (abort). Failures
//! of individual positions or candidates are counted and logged, never fatal.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::BotConfig;
use crate::evaluator::ShortfallEvaluator;
use crate::liquidator::{LiquidationOutcome, Liquidator};
use liquidator_api::{Borrower, PageOutcome, PositionSource, SubgraphError};
use liquidator_chain::ChainClient;

/// The only error that ends a run early.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("query for page {page} failed: {source}")]
    Query {
        page: u64,
        #[source]
        source: SubgraphError,
    },
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Next page to fetch
    Running { page: u64 },
    /// Every page was processed
    Exhausted,
    /// A page query failed after all retries
    Aborted,
}

/// Counters for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: u64,
    pub positions_evaluated: usize,
    pub evaluation_failures: usize,
    pub liquidations: usize,
    pub skipped: usize,
    pub execution_failures: usize,
}

/// Controller tuning.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Retries of a failed page query before aborting
    pub max_fetch_retries: u32,
    /// First retry delay, doubled on each attempt up to 8x
    pub retry_base_delay: Duration,
    /// Concurrent simulated calls per page
    pub max_concurrent_calls: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&BotConfig::default())
    }
}

impl From<&BotConfig> for ControllerConfig {
    fn from(config: &BotConfig) -> Self {
        Self {
            max_fetch_retries: config.paging.max_fetch_retries,
            retry_base_delay: config.paging.retry_base_delay(),
            max_concurrent_calls: config.evaluation.max_concurrent_calls,
        }
    }
}

/// Backoff before retry number `attempt` (0-based).
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(3))
}

/// Pagination controller.
pub struct PaginationController<S, C> {
    source: S,
    evaluator: ShortfallEvaluator<C>,
    liquidator: Liquidator<C>,
    config: ControllerConfig,
    state: RunState,
}

impl<S: PositionSource, C: ChainClient> PaginationController<S, C> {
    pub fn new(
        source: S,
        chain: Arc<C>,
        liquidator: Liquidator<C>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            source,
            evaluator: ShortfallEvaluator::new(chain, config.max_concurrent_calls),
            liquidator,
            config,
            state: RunState::Running { page: 0 },
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run until the source is exhausted or a query fails for good.
    #[instrument(skip(self), fields(page_size = self.source.page_size()))]
    pub async fn run(&mut self) -> Result<RunSummary, RunError> {
        let run_start = Instant::now();
        let mut summary = RunSummary::default();

        while let RunState::Running { page } = self.state {
            let outcome = match self.fetch_with_retry(page).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(page = page, error = %e, "Page query failed, aborting run");
                    self.state = RunState::Aborted;
                    return Err(e);
                }
            };

            match outcome {
                PageOutcome::Exhausted => {
                    info!(
                        page = page,
                        pages = summary.pages,
                        elapsed_ms = run_start.elapsed().as_millis(),
                        "No more borrowers, run complete"
                    );
                    self.state = RunState::Exhausted;
                }
                PageOutcome::Page(borrowers) => {
                    self.process_page(page, &borrowers, &mut summary).await;
                    summary.pages += 1;
                    self.state = RunState::Running { page: page + 1 };
                }
            }
        }

        Ok(summary)
    }

    /// Fetch a page, retrying query failures with backoff. Exhaustion is returned as is.
    async fn fetch_with_retry(&self, page: u64) -> Result<PageOutcome, RunError> {
        let mut attempt = 0;
        loop {
            match self.source.fetch_page(page).await {
                Ok(outcome) => return Ok(outcome),
                Err(source) if attempt >= self.config.max_fetch_retries => {
                    return Err(RunError::Query { page, source });
                }
                Err(e) => {
                    let delay = retry_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        page = page,
                        attempt = attempt + 1,
                        max_retries = self.config.max_fetch_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Page query failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Evaluate every position of the page, then execute candidates one at a time.
    async fn process_page(&self, page: u64, borrowers: &[Borrower], summary: &mut RunSummary) {
        let positions: usize = borrowers.iter().map(|b| b.positions.len()).sum();
        info!(
            page = page,
            borrowers = borrowers.len(),
            positions = positions,
            "Processing page"
        );

        let evaluation = self.evaluator.evaluate_page(borrowers).await;
        summary.positions_evaluated += evaluation.evaluated();
        summary.evaluation_failures += evaluation.failed;

        for candidate in evaluation.with_shortfall() {
            match self.liquidator.process(candidate).await {
                Ok(LiquidationOutcome::Executed(result)) => {
                    summary.liquidations += 1;
                    debug!(
                        borrower = %result.borrower,
                        liquidation_tx = %result.liquidation_tx(),
                        "Candidate liquidated"
                    );
                }
                Ok(LiquidationOutcome::Skipped(reason)) => {
                    summary.skipped += 1;
                    info!(
                        borrower = %candidate.borrower(),
                        reason = %reason,
                        "Candidate skipped"
                    );
                }
                Err(e) => {
                    summary.execution_failures += 1;
                    warn!(
                        borrower = %candidate.borrower(),
                        position = %candidate.position.id,
                        error = %e,
                        "Liquidation attempt failed, continuing"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{borrower, healthy, MockChain, LIQUIDATOR, ROUTER};
    use alloy::primitives::Address;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays scripted responses; exhausted once the script runs out.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<PageOutcome, SubgraphError>>>,
        requested: Mutex<Vec<u64>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<PageOutcome, SubgraphError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PositionSource for ScriptedSource {
        fn page_size(&self) -> u64 {
            25
        }

        async fn fetch_page(&self, page: u64) -> Result<PageOutcome, SubgraphError> {
            self.requested.lock().push(page);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or(Ok(PageOutcome::Exhausted))
        }
    }

    fn config(max_fetch_retries: u32) -> ControllerConfig {
        ControllerConfig {
            max_fetch_retries,
            retry_base_delay: Duration::ZERO,
            max_concurrent_calls: 4,
        }
    }

    fn controller(
        source: ScriptedSource,
        chain: MockChain,
        max_fetch_retries: u32,
    ) -> PaginationController<ScriptedSource, MockChain> {
        let chain = Arc::new(chain);
        let liquidator = Liquidator::new(chain.clone(), ROUTER, LIQUIDATOR);
        PaginationController::new(source, chain, liquidator, config(max_fetch_retries))
    }

    fn unavailable() -> SubgraphError {
        SubgraphError::Status { status: 503 }
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let base = Duration::from_millis(100);
        assert_eq!(retry_delay(base, 0), Duration::from_millis(100));
        assert_eq!(retry_delay(base, 1), Duration::from_millis(200));
        assert_eq!(retry_delay(base, 3), Duration::from_millis(800));
        assert_eq!(retry_delay(base, 9), Duration::from_millis(800));
    }

    #[test]
    fn test_retry_delay_saturates_on_huge_base() {
        let base = Duration::from_millis(u64::MAX);
        assert_eq!(retry_delay(base, 3), Duration::MAX);
    }

    #[tokio::test]
    async fn test_empty_first_page_exhausts() {
        let mut chain = MockChain::new();
        chain.expect_account_liquidity().never();
        chain.expect_submit().never();

        let mut controller = controller(ScriptedSource::new(vec![]), chain, 0);
        assert_eq!(controller.state(), RunState::Running { page: 0 });

        let summary = controller.run().await.unwrap();

        assert_eq!(controller.state(), RunState::Exhausted);
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    async fn test_pages_advance_until_exhausted() {
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb2);

        let mut chain = MockChain::new();
        chain
            .expect_account_liquidity()
            .times(2)
            .returning(|_, _| Ok(healthy(100)));
        chain.expect_submit().never();

        let source = ScriptedSource::new(vec![
            Ok(PageOutcome::Page(vec![borrower(alice)])),
            Ok(PageOutcome::Page(vec![])),
            Ok(PageOutcome::Page(vec![borrower(bob)])),
        ]);
        let mut controller = controller(source, chain, 0);
        let summary = controller.run().await.unwrap();

        assert_eq!(summary.pages, 3);
        assert_eq!(summary.positions_evaluated, 2);
        assert_eq!(summary.liquidations, 0);
        assert_eq!(*controller.source.requested.lock(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_query_failure_aborts_after_retries() {
        let mut chain = MockChain::new();
        chain.expect_account_liquidity().never();

        let source = ScriptedSource::new(vec![
            Ok(PageOutcome::Page(vec![])),
            Err(unavailable()),
            Err(unavailable()),
            Err(unavailable()),
        ]);
        let mut controller = controller(source, chain, 2);
        let err = controller.run().await.unwrap_err();

        assert!(matches!(err, RunError::Query { page: 1, .. }));
        assert_eq!(controller.state(), RunState::Aborted);
        assert_eq!(*controller.source.requested.lock(), vec![0, 1, 1, 1]);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let chain = MockChain::new();
        let source = ScriptedSource::new(vec![Err(unavailable()), Ok(PageOutcome::Exhausted)]);
        let mut controller = controller(source, chain, 1);

        controller.run().await.unwrap();

        assert_eq!(controller.state(), RunState::Exhausted);
        assert_eq!(*controller.source.requested.lock(), vec![0, 0]);
    }
}
