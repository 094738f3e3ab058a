//! Observation of executor attempts
//!
//! A call moves through `Attempting -> {Succeeded, Retrying -> Attempting,
//! Failed}`. [`RetryObserver`] receives one callback per transition.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::classify::ErrorKind;
use super::error::ExecutorError;

/// Observer trait for executor lifecycle events
///
/// # Example
///
/// ```rust
/// use durable_core::retry::{ErrorKind, ExecutorError, RetryObserver};
/// use std::time::Duration;
///
/// struct ConflictCounter;
///
/// impl RetryObserver for ConflictCounter {
///     fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {}
///
///     fn on_retry(&self, _attempt: u32, kind: ErrorKind, _delay: Duration) {
///         if kind == ErrorKind::CasMismatch {
///             // record a write conflict
///         }
///     }
///
///     fn on_success(&self, _attempt: u32, _total_duration: Duration) {}
///
///     fn on_exhausted(&self, _error: &ExecutorError) {}
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called when an attempt is about to start (1-indexed)
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32);

    /// Called when an attempt failed with a retryable kind and another
    /// attempt will follow after `delay`
    fn on_retry(&self, attempt: u32, kind: ErrorKind, delay: Duration);

    /// Called when an attempt succeeds
    fn on_success(&self, attempt: u32, total_duration: Duration);

    /// Called when a retryable failure outlived the retry budget
    fn on_exhausted(&self, error: &ExecutorError);

    /// Called when the call fails without exhausting the budget: a
    /// non-retryable kind, or an expired deadline
    fn on_aborted(&self, error: &ExecutorError) {
        let _ = error;
    }
}

/// An observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {}

    fn on_retry(&self, _attempt: u32, _kind: ErrorKind, _delay: Duration) {}

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {}

    fn on_exhausted(&self, _error: &ExecutorError) {}
}

/// An observer that logs executor events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_retry`: WARN
/// - `on_success`: INFO (after a retry) or DEBUG (first attempt)
/// - `on_exhausted`: ERROR
/// - `on_aborted`: ERROR
#[derive(Debug, Clone)]
pub struct TracingObserver {
    operation: String,
}

impl TracingObserver {
    /// Create a tracing observer labelled with an operation name
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("durable-op")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        tracing::debug!(
            operation = %self.operation,
            attempt = attempt,
            max_attempts = max_attempts,
            "starting attempt"
        );
    }

    fn on_retry(&self, attempt: u32, kind: ErrorKind, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            kind = %kind,
            delay_ms = delay.as_millis() as u64,
            "retryable failure, retrying"
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 1 {
            tracing::info!(
                operation = %self.operation,
                attempt = attempt,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_exhausted(&self, error: &ExecutorError) {
        tracing::error!(
            operation = %self.operation,
            attempts = error.attempts_made(),
            kind = %error.kind(),
            "too many attempts, aborting"
        );
    }

    fn on_aborted(&self, error: &ExecutorError) {
        match error.cause() {
            Some(cause) => tracing::error!(
                operation = %self.operation,
                attempts = error.attempts_made(),
                kind = %error.kind(),
                error = %cause,
                "non-retryable failure, aborting"
            ),
            None => tracing::error!(
                operation = %self.operation,
                attempts = error.attempts_made(),
                kind = %error.kind(),
                "aborting"
            ),
        }
    }
}

/// An observer that counts events
///
/// Useful for tests and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    pub attempt_starts: AtomicU32,
    pub retries: AtomicU32,
    pub successes: AtomicU32,
    pub exhaustions: AtomicU32,
    pub aborts: AtomicU32,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }

    pub fn aborts(&self) -> u32 {
        self.aborts.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_retry(&self, _attempt: u32, _kind: ErrorKind, _delay: Duration) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_exhausted(&self, _error: &ExecutorError) {
        self.exhaustions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_aborted(&self, _error: &ExecutorError) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Arc<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_retry(&self, attempt: u32, kind: ErrorKind, delay: Duration) {
        (**self).on_retry(attempt, kind, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, error: &ExecutorError) {
        (**self).on_exhausted(error)
    }

    fn on_aborted(&self, error: &ExecutorError) {
        (**self).on_aborted(error)
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_retry(&self, attempt: u32, kind: ErrorKind, delay: Duration) {
        (**self).on_retry(attempt, kind, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, error: &ExecutorError) {
        (**self).on_exhausted(error)
    }

    fn on_aborted(&self, error: &ExecutorError) {
        (**self).on_aborted(error)
    }
}
