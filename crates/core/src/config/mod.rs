//! Configuration for the liquidation bot.
//!
//! This module provides:
//! - Bot runtime configuration (profiles, paging, evaluation, execution)
//! - Deployment settings from the environment (endpoints, addresses, key)

mod bot;
mod deployment;

pub use bot::{BotConfig, EvaluationConfig, ExecutionConfig, PagingConfig};
pub use deployment::{env, Deployment};
