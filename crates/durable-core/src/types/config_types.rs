//! Executor configuration types

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

use super::DurabilityLevel;

/// Top-level executor configuration (durable.yaml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutorConfig {
    /// Retries allowed after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Overall deadline for one call in milliseconds (`None` or 0 disables it)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: Option<u64>,

    /// Durability level requested for writes
    #[serde(default)]
    pub durability: DurabilityLevel,

    /// Backoff policy between attempts
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            durability: DurabilityLevel::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ExecutorConfig {
    /// Overall call timeout, if one is configured; zero disables it
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.retry.validate()
    }
}

fn default_max_retries() -> u32 {
    5
}
fn default_timeout_ms() -> Option<u64> {
    Some(10_000)
}

/// Backoff policy between attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Delay strategy
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Backoff multiplier for exponential strategies
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::default(),
            backoff_multiplier: default_backoff_multiplier(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Reject policies whose delay sequence could decrease
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::invalid_config(format!(
                "backoff-multiplier must be a finite number >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(Error::invalid_config(format!(
                "initial-delay-ms ({}) must not exceed max-delay-ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_initial_delay() -> u64 {
    100
}
fn default_max_delay() -> u64 {
    5000
}

/// Retry delay strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    /// Retry immediately
    None,

    /// Fixed delay between retries
    FixedDelay,

    /// Exponential backoff (default)
    #[default]
    ExponentialBackoff,

    /// Linear backoff
    LinearBackoff,
}

impl FromStr for RetryStrategy {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "none" => Ok(RetryStrategy::None),
            "fixed-delay" | "fixed" => Ok(RetryStrategy::FixedDelay),
            "exponential-backoff" | "exponential" => Ok(RetryStrategy::ExponentialBackoff),
            "linear-backoff" | "linear" => Ok(RetryStrategy::LinearBackoff),
            _ => Err(Error::invalid_strategy(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.durability, DurabilityLevel::None);
        assert_eq!(config.retry.strategy, RetryStrategy::ExponentialBackoff);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
max-retries: 2
durability: persist-to-majority
retry:
  strategy: linear-backoff
  initial-delay-ms: 20
"#;
        let config: ExecutorConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.durability, DurabilityLevel::PersistToMajority);
        assert_eq!(config.retry.strategy, RetryStrategy::LinearBackoff);
        assert_eq!(config.retry.initial_delay_ms, 20);
        assert_eq!(config.retry.max_delay_ms, 5000);
        assert_eq!(config.timeout_ms, Some(10_000));
    }

    #[test]
    fn test_null_timeout_disables_deadline() {
        let config: ExecutorConfig = serde_yaml_ng::from_str("timeout-ms: ~").unwrap();
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config: ExecutorConfig = serde_yaml_ng::from_str("timeout-ms: 0").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_validate_rejects_shrinking_multiplier() {
        let policy = RetryPolicy {
            backoff_multiplier: 0.5,
            ..RetryPolicy::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_initial_above_max() {
        let policy = RetryPolicy {
            initial_delay_ms: 10_000,
            max_delay_ms: 100,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "fixed".parse::<RetryStrategy>().unwrap(),
            RetryStrategy::FixedDelay
        );
        assert_eq!(
            "EXPONENTIAL_BACKOFF".parse::<RetryStrategy>().unwrap(),
            RetryStrategy::ExponentialBackoff
        );
        assert!("random".parse::<RetryStrategy>().is_err());
    }
}
