//! Liquidation executor: approval and liquidation transactions for one candidate.

use alloy::primitives::{Address, B256, U256};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::ExecutionConfig;
use crate::position::LiquidationCandidate;
use liquidator_chain::{ChainClient, ChainError, WriteReceipt, WriteRequest};

/// Failure while executing a single candidate. Never fatal to the run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to read balance of {token}: {source}")]
    Balance {
        token: Address,
        #[source]
        source: ChainError,
    },

    #[error("approval failed: {source}")]
    Approval {
        #[source]
        source: ChainError,
    },

    #[error("liquidation failed after approval {approve_tx}: {source}")]
    Liquidation {
        approve_tx: B256,
        #[source]
        source: ChainError,
    },

    #[error("earlier write {tx_hash} is still unconfirmed, nothing submitted")]
    PendingWrite { tx_hash: B256 },
}

/// Why a candidate produced no transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The position is healthy
    NoShortfall,
    /// The liquidator holds none of the underlying
    NoBalance,
    /// Writes are disabled; `amount` would have been submitted
    DryRun { amount: U256 },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoShortfall => write!(f, "no shortfall"),
            Self::NoBalance => write!(f, "no balance of underlying"),
            Self::DryRun { amount } => write!(f, "dry run (amount {amount})"),
        }
    }
}

/// A confirmed liquidation.
#[derive(Debug, Clone)]
pub struct LiquidationResult {
    pub borrower: Address,
    pub borrowable: Address,
    pub underlying: Address,
    pub shortfall: U256,
    /// Amount approved and repaid, `min(shortfall, balance)`
    pub amount: U256,
    pub approve_tx: B256,
    pub receipt: WriteReceipt,
}

impl LiquidationResult {
    pub fn liquidation_tx(&self) -> B256 {
        self.receipt.tx_hash
    }
}

#[derive(Debug, Clone)]
pub enum LiquidationOutcome {
    Executed(LiquidationResult),
    Skipped(SkipReason),
}

/// Amount submitted for liquidation: the shortfall, clamped to what the liquidator holds.
#[inline]
pub fn liquidation_amount(shortfall: U256, balance: U256) -> U256 {
    shortfall.min(balance)
}

/// Router deadline `secs` after the unix timestamp `now`.
#[inline]
pub fn deadline_from(now: u64, secs: u64) -> u64 {
    now.saturating_add(secs)
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

/// Liquidation executor.
///
/// Every write goes through `write_lock`, held from the balance read to the
/// liquidation receipt. Writes from one signer therefore never overlap and the
/// clamped amount is never stale by the time it is submitted.
///
/// The lock also holds the hash of a write whose receipt timed out. That write
/// is still in flight, so no new write is sent until it is settled.
pub struct Liquidator<C> {
    chain: Arc<C>,
    /// Router02 contract performing the liquidation
    router: Address,
    /// Receiver of the seized collateral
    receiver: Address,
    deadline_secs: u64,
    dry_run: bool,
    write_lock: Mutex<Option<B256>>,
}

impl<C: ChainClient> Liquidator<C> {
    pub fn new(chain: Arc<C>, router: Address, receiver: Address) -> Self {
        let defaults = ExecutionConfig::default();
        Self {
            chain,
            router,
            receiver,
            deadline_secs: defaults.deadline_secs,
            dry_run: defaults.dry_run,
            write_lock: Mutex::new(None),
        }
    }

    /// Apply deadline and dry-run settings.
    pub fn with_config(mut self, config: &ExecutionConfig) -> Self {
        self.deadline_secs = config.deadline_secs;
        self.dry_run = config.dry_run;
        self
    }

    /// Execute one candidate: approve the router for the clamped amount,
    /// wait for it, then liquidate and wait again.
    #[instrument(skip(self, candidate), fields(borrower = %candidate.borrower(), position = %candidate.position.id))]
    pub async fn process(
        &self,
        candidate: &LiquidationCandidate,
    ) -> Result<LiquidationOutcome, ExecutionError> {
        if !candidate.has_shortfall() {
            return Ok(LiquidationOutcome::Skipped(SkipReason::NoShortfall));
        }

        let position = &candidate.position;
        let shortfall = candidate.shortfall();
        let liquidator = self.chain.signer_address();

        let mut in_flight = self.write_lock.lock().await;
        if let Some(tx_hash) = *in_flight {
            self.settle(tx_hash).await?;
            *in_flight = None;
        }
        let execution_start = Instant::now();

        let balance = self
            .chain
            .token_balance(position.underlying, liquidator)
            .await
            .map_err(|source| ExecutionError::Balance {
                token: position.underlying,
                source,
            })?;

        let amount = liquidation_amount(shortfall, balance);
        if amount.is_zero() {
            warn!(
                underlying = %candidate.underlying_label(),
                shortfall = %shortfall,
                "Liquidator holds none of the underlying, skipping"
            );
            return Ok(LiquidationOutcome::Skipped(SkipReason::NoBalance));
        }

        debug!(
            shortfall = %shortfall,
            balance = %balance,
            amount = %amount,
            "Liquidation amount computed"
        );

        if self.dry_run {
            info!(
                underlying = %candidate.underlying_label(),
                amount = %amount,
                "Dry run, not submitting"
            );
            return Ok(LiquidationOutcome::Skipped(SkipReason::DryRun { amount }));
        }

        let approve = WriteRequest::Approve {
            token: position.underlying,
            spender: self.router,
            amount,
        };
        let approve_tx = self
            .chain
            .submit(&approve)
            .await
            .map_err(|source| ExecutionError::Approval { source })?;
        self.confirm(&mut *in_flight, approve_tx)
            .await
            .map_err(|source| ExecutionError::Approval { source })?;

        info!(approve_tx = %approve_tx, amount = %amount, "Approval confirmed");

        let liquidate = WriteRequest::Liquidate {
            router: self.router,
            borrowable: position.borrowable,
            amount,
            borrower: position.borrower,
            receiver: self.receiver,
            deadline: deadline_from(unix_now(), self.deadline_secs),
        };
        let liquidation_err =
            move |source: ChainError| ExecutionError::Liquidation { approve_tx, source };
        let liquidation_tx = self
            .chain
            .submit(&liquidate)
            .await
            .map_err(liquidation_err)?;
        let receipt = self
            .confirm(&mut *in_flight, liquidation_tx)
            .await
            .map_err(liquidation_err)?;

        info!(
            approve_tx = %approve_tx,
            liquidation_tx = %liquidation_tx,
            underlying = %candidate.underlying_label(),
            amount = %amount,
            total_ms = execution_start.elapsed().as_millis(),
            "Liquidation confirmed"
        );

        Ok(LiquidationOutcome::Executed(LiquidationResult {
            borrower: position.borrower,
            borrowable: position.borrowable,
            underlying: position.underlying,
            shortfall,
            amount,
            approve_tx,
            receipt,
        }))
    }

    /// Wait for a write; a receipt timeout leaves it recorded as in flight.
    async fn confirm(
        &self,
        in_flight: &mut Option<B256>,
        tx_hash: B256,
    ) -> Result<WriteReceipt, ChainError> {
        let result = self.chain.wait_for_receipt(tx_hash).await;
        if matches!(result, Err(ChainError::ReceiptTimeout { .. })) {
            *in_flight = Some(tx_hash);
        }
        result
    }

    /// Wait again for a write left in flight by an earlier timeout.
    async fn settle(&self, tx_hash: B256) -> Result<(), ExecutionError> {
        match self.chain.wait_for_receipt(tx_hash).await {
            Ok(receipt) => {
                info!(tx_hash = %receipt.tx_hash, "Earlier write confirmed");
                Ok(())
            }
            Err(ChainError::ReceiptTimeout { .. }) => {
                warn!(tx_hash = %tx_hash, "Earlier write still pending, holding writes");
                Err(ExecutionError::PendingWrite { tx_hash })
            }
            Err(e) => {
                // Reverted or dropped: it no longer occupies the nonce
                warn!(tx_hash = %tx_hash, error = %e, "Earlier write settled without success");
                Ok(())
            }
        }
    }
}
