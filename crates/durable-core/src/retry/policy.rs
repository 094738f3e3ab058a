//! Retry decisions and backoff delays
//!
//! Every decision here is a pure function of the policy and the counters passed
//! in; nothing is remembered between calls.

use std::time::Duration;

use crate::types::{RetryPolicy, RetryStrategy};

use super::classify::ErrorKind;

/// Decide whether another attempt should be made
///
/// True iff `kind` is retryable and fewer than `max_attempts` attempts have
/// been made.
pub fn should_retry(kind: ErrorKind, attempts_so_far: u32, max_attempts: u32) -> bool {
    kind.is_retryable() && attempts_so_far < max_attempts
}

/// Calculate the delay before the next attempt
///
/// `attempts_so_far` is the number of attempts already made (so the delay
/// after the first failure uses `1`). For a fixed policy the sequence is
/// non-decreasing in `attempts_so_far` and never exceeds `max_delay_ms`.
///
/// # Example
///
/// ```rust
/// use durable_core::retry::delay_before_next_attempt;
/// use durable_core::types::{RetryPolicy, RetryStrategy};
///
/// let policy = RetryPolicy {
///     strategy: RetryStrategy::ExponentialBackoff,
///     backoff_multiplier: 2.0,
///     initial_delay_ms: 100,
///     max_delay_ms: 1000,
/// };
///
/// assert_eq!(delay_before_next_attempt(&policy, 1).as_millis(), 100);
/// assert_eq!(delay_before_next_attempt(&policy, 2).as_millis(), 200);
/// assert_eq!(delay_before_next_attempt(&policy, 5).as_millis(), 1000);
/// ```
pub fn delay_before_next_attempt(policy: &RetryPolicy, attempts_so_far: u32) -> Duration {
    let attempt_index = attempts_so_far.saturating_sub(1);

    let base_delay_ms = match policy.strategy {
        RetryStrategy::None => 0,

        RetryStrategy::FixedDelay => policy.initial_delay_ms,

        RetryStrategy::ExponentialBackoff => {
            // A multiplier below 1.0 would shrink the delay; NaN falls back to 1.0
            let multiplier = policy.backoff_multiplier.max(1.0);
            let factor = multiplier.powi(attempt_index.min(i32::MAX as u32) as i32);
            // `as` saturates on overflow and infinity
            (policy.initial_delay_ms as f64 * factor) as u64
        }

        RetryStrategy::LinearBackoff => policy
            .initial_delay_ms
            .saturating_mul(u64::from(attempt_index) + 1),
    };

    Duration::from_millis(base_delay_ms.min(policy.max_delay_ms))
}

/// Per-call retry bookkeeping
///
/// Created when a call starts and dropped when it ends.
#[derive(Debug, Clone)]
pub struct RetryState<'a> {
    policy: &'a RetryPolicy,
    attempts: u32,
    max_attempts: u32,
}

impl<'a> RetryState<'a> {
    /// Allow one initial attempt plus `max_retries` retries
    pub fn new(policy: &'a RetryPolicy, max_retries: u32) -> Self {
        Self {
            policy,
            attempts: 0,
            max_attempts: max_retries.saturating_add(1),
        }
    }

    /// Record the start of an attempt and return its 1-indexed number
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn should_retry(&self, kind: ErrorKind) -> bool {
        should_retry(kind, self.attempts, self.max_attempts)
    }

    pub fn next_delay(&self) -> Duration {
        delay_before_next_attempt(self.policy, self.attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(strategy: RetryStrategy) -> RetryPolicy {
        RetryPolicy {
            strategy,
            backoff_multiplier: 2.0,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
        }
    }

    #[test]
    fn test_should_retry_requires_retryable_kind() {
        assert!(should_retry(ErrorKind::CasMismatch, 1, 3));
        assert!(should_retry(ErrorKind::TransientServerError, 2, 3));
        assert!(!should_retry(ErrorKind::Timeout, 1, 3));
        assert!(!should_retry(ErrorKind::NotFound, 0, 100));
    }

    #[test]
    fn test_should_retry_respects_budget() {
        assert!(!should_retry(ErrorKind::CasMismatch, 3, 3));
        assert!(!should_retry(ErrorKind::CasMismatch, 4, 3));
        assert!(!should_retry(ErrorKind::CasMismatch, 1, 1));
    }

    #[test]
    fn test_none_strategy() {
        let policy = policy(RetryStrategy::None);
        for attempt in 1..=3 {
            assert_eq!(delay_before_next_attempt(&policy, attempt), Duration::ZERO);
        }
    }

    #[test]
    fn test_fixed_strategy() {
        let policy = policy(RetryStrategy::FixedDelay);
        for attempt in 1..=3 {
            assert_eq!(
                delay_before_next_attempt(&policy, attempt),
                Duration::from_millis(1000)
            );
        }
    }

    #[test]
    fn test_exponential_strategy() {
        let policy = policy(RetryStrategy::ExponentialBackoff);

        // 1000 * 2^(n-1)
        let expected = [1000, 2000, 4000, 8000, 16000];
        for (i, ms) in expected.into_iter().enumerate() {
            assert_eq!(
                delay_before_next_attempt(&policy, i as u32 + 1),
                Duration::from_millis(ms)
            );
        }
    }

    #[test]
    fn test_linear_strategy() {
        let policy = policy(RetryStrategy::LinearBackoff);
        assert_eq!(
            delay_before_next_attempt(&policy, 1),
            Duration::from_millis(1000)
        );
        assert_eq!(
            delay_before_next_attempt(&policy, 3),
            Duration::from_millis(3000)
        );
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = RetryPolicy {
            max_delay_ms: 5000,
            ..policy(RetryStrategy::ExponentialBackoff)
        };
        assert_eq!(
            delay_before_next_attempt(&policy, 5),
            Duration::from_millis(5000)
        );
        assert_eq!(
            delay_before_next_attempt(&policy, u32::MAX),
            Duration::from_millis(5000)
        );
    }

    #[test]
    fn test_shrinking_multiplier_is_clamped() {
        let policy = RetryPolicy {
            backoff_multiplier: 0.25,
            ..policy(RetryStrategy::ExponentialBackoff)
        };
        for attempt in 1..=5 {
            assert_eq!(
                delay_before_next_attempt(&policy, attempt),
                Duration::from_millis(1000)
            );
        }
    }

    #[test]
    fn test_retry_state_counts_attempts() {
        let policy = policy(RetryStrategy::FixedDelay);
        let mut state = RetryState::new(&policy, 2);
        assert_eq!(state.max_attempts(), 3);
        assert_eq!(state.attempts_made(), 0);

        assert_eq!(state.begin_attempt(), 1);
        assert!(state.should_retry(ErrorKind::CasMismatch));
        assert_eq!(state.begin_attempt(), 2);
        assert!(state.should_retry(ErrorKind::CasMismatch));
        assert_eq!(state.begin_attempt(), 3);
        assert!(!state.should_retry(ErrorKind::CasMismatch));
        assert_eq!(state.attempts_made(), 3);
    }

    #[test]
    fn test_zero_retries_allows_single_attempt() {
        let policy = policy(RetryStrategy::FixedDelay);
        let mut state = RetryState::new(&policy, 0);
        state.begin_attempt();
        assert!(!state.should_retry(ErrorKind::TransientServerError));
    }
}
