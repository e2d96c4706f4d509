//! Configuration management with profile support.
//!
//! Provides runtime tuning for paging, evaluation and execution with
//! support for named profiles (testing, production) or a TOML file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure containing all bot parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Borrower paging and fetch retries
    #[serde(default)]
    pub paging: PagingConfig,

    /// Shortfall evaluation
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Approval and liquidation submission
    #[serde(default)]
    pub execution: ExecutionConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Borrower paging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Borrowers requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Retries for a failed page query before the run aborts
    #[serde(default = "default_max_fetch_retries")]
    pub max_fetch_retries: u32,

    /// Base delay of the exponential retry backoff (milliseconds)
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

fn default_page_size() -> u64 {
    25
}
fn default_max_fetch_retries() -> u32 {
    2
}
fn default_retry_base_delay() -> u64 {
    500
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_fetch_retries: default_max_fetch_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
        }
    }
}

impl PagingConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Shortfall evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Maximum simulated calls in flight for one page
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,
}

fn default_max_concurrent_calls() -> usize {
    8
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: default_max_concurrent_calls(),
        }
    }
}

/// Liquidation execution parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Router deadline, relative to submission time (seconds)
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    /// Interval between receipt polls (milliseconds)
    #[serde(default = "default_receipt_poll_interval")]
    pub receipt_poll_interval_ms: u64,

    /// Maximum wait for a receipt (seconds)
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,

    /// Evaluate and size liquidations without sending any transaction
    #[serde(default)]
    pub dry_run: bool,
}

fn default_deadline() -> u64 {
    3600
}
fn default_receipt_poll_interval() -> u64 {
    1000
}
fn default_receipt_timeout() -> u64 {
    180
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline(),
            receipt_poll_interval_ms: default_receipt_poll_interval(),
            receipt_timeout_secs: default_receipt_timeout(),
            dry_run: false,
        }
    }
}

impl ExecutionConfig {
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            paging: PagingConfig::default(),
            evaluation: EvaluationConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Create a testing profile: small pages, no writes.
    pub fn testing() -> Self {
        Self {
            profile: "testing".to_string(),
            paging: PagingConfig {
                page_size: 5,
                max_fetch_retries: 0,
                retry_base_delay_ms: 100,
            },
            evaluation: EvaluationConfig {
                max_concurrent_calls: 2,
            },
            execution: ExecutionConfig {
                dry_run: true,
                ..Default::default()
            },
        }
    }

    /// Create a production profile with more patient retries.
    pub fn production() -> Self {
        Self {
            profile: "production".to_string(),
            paging: PagingConfig {
                page_size: 25,
                max_fetch_retries: 4,
                retry_base_delay_ms: 1000,
            },
            evaluation: EvaluationConfig {
                max_concurrent_calls: 16,
            },
            execution: ExecutionConfig {
                deadline_secs: 3600,
                receipt_poll_interval_ms: 2000,
                receipt_timeout_secs: 300,
                dry_run: false,
            },
        }
    }

    /// Resolve a profile name or a path to a TOML file.
    /// Supported names: default, testing, production.
    pub fn from_profile(profile: &str) -> anyhow::Result<Self> {
        if profile.ends_with(".toml") {
            return Self::from_file(profile);
        }
        Ok(match profile.to_lowercase().as_str() {
            "testing" | "test" => Self::testing(),
            "production" | "prod" => Self::production(),
            _ => Self::default(),
        })
    }

    /// Get profile from environment variable BOT_PROFILE, or default.
    pub fn from_env() -> anyhow::Result<Self> {
        let profile = std::env::var("BOT_PROFILE").unwrap_or_else(|_| "default".to_string());
        Self::from_profile(&profile)
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "Bot configuration loaded");
        tracing::info!(
            page_size = self.paging.page_size,
            max_fetch_retries = self.paging.max_fetch_retries,
            retry_base_delay_ms = self.paging.retry_base_delay_ms,
            "Paging parameters"
        );
        tracing::info!(
            max_concurrent_calls = self.evaluation.max_concurrent_calls,
            "Evaluation parameters"
        );
        tracing::info!(
            deadline_secs = self.execution.deadline_secs,
            receipt_timeout_secs = self.execution.receipt_timeout_secs,
            dry_run = self.execution.dry_run,
            "Execution parameters"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BotConfig::default();
        assert_eq!(config.paging.page_size, 25);
        assert_eq!(config.execution.deadline_secs, 3600);
        assert!(!config.execution.dry_run);
    }

    #[test]
    fn test_testing_profile() {
        let config = BotConfig::from_profile("test").unwrap();
        assert_eq!(config.profile, "testing");
        assert!(config.execution.dry_run);
    }

    #[test]
    fn test_unknown_profile_falls_back_to_default() {
        let config = BotConfig::from_profile("turbo").unwrap();
        assert_eq!(config.profile, "default");
    }

    #[test]
    fn test_missing_profile_file() {
        assert!(BotConfig::from_profile("/nonexistent/bot.toml").is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: BotConfig = toml::from_str(
            r#"
            profile = "custom"

            [paging]
            page_size = 50
            "#,
        )
        .unwrap();

        assert_eq!(parsed.profile, "custom");
        assert_eq!(parsed.paging.page_size, 50);
        assert_eq!(parsed.paging.max_fetch_retries, 2);
        assert_eq!(parsed.execution.receipt_timeout(), Duration::from_secs(180));
    }

    #[test]
    fn test_serialization() {
        let config = BotConfig::production();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("profile = \"production\""));

        let parsed: BotConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.evaluation.max_concurrent_calls, 16);
    }
}
