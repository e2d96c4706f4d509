//! Liquidator core logic.
//!
//! This crate provides the liquidation engine:
//! - Runtime configuration profiles and deployment settings
//! - Shortfall evaluation through simulated `accountLiquidity` calls
//! - Balance-clamped approval and liquidation with serialized writes
//! - The pagination controller driving a run to exhaustion

pub mod config;
mod controller;
mod evaluator;
mod liquidator;
mod position;

#[cfg(test)]
mod test_utils;

pub use config::{BotConfig, Deployment, EvaluationConfig, ExecutionConfig, PagingConfig};
pub use controller::{ControllerConfig, PaginationController, RunError, RunState, RunSummary};
pub use evaluator::{PageEvaluation, ShortfallEvaluator};
pub use liquidator::{
    deadline_from, liquidation_amount, ExecutionError, LiquidationOutcome, LiquidationResult,
    Liquidator, SkipReason,
};
pub use position::LiquidationCandidate;

pub use liquidator_api::{BorrowPosition, Borrower};
pub use liquidator_chain::AccountLiquidity as ShortfallResult;
