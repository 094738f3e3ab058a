//! Durable operation executor
//!
//! Runs one idempotent read-modify-write [`Operation`] against a
//! [`DocumentStore`], re-reading and retrying on retryable failures and
//! surfacing everything else as a typed [`ExecutorError`].

use serde_json::Value;
use std::fmt;
use tokio::time::Instant;

use crate::store::{DocumentStore, RawError};
use crate::types::{DurabilityLevel, ExecutorConfig, RetryPolicy};

use super::classify::{classify, ErrorKind};
use super::error::ExecutorError;
use super::observer::{NoOpObserver, RetryObserver};
use super::policy::RetryState;

/// Mutation applied to the current value to produce the value to write
///
/// May run once per attempt, so it must be a pure function of its input.
pub type Mutation = Box<dyn Fn(Option<&Value>) -> Value + Send + Sync>;

/// Whether an operation needs the record to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Fail with `NotFound` when the key is absent
    Required,
    /// Insert when the key is absent
    Optional,
}

/// A single idempotent request against one keyed record
pub struct Operation {
    key: String,
    durability: DurabilityLevel,
    presence: Presence,
    mutation: Mutation,
}

impl Operation {
    /// Replace an existing document with `f(current)`.
    ///
    /// ```rust
    /// use durable_core::retry::Operation;
    /// use durable_core::types::DurabilityLevel;
    ///
    /// let op = Operation::replace("user::1", |doc| {
    ///     let mut doc = doc.clone();
    ///     doc["email"] = "john.smith@example.com".into();
    ///     doc
    /// })
    /// .with_durability(DurabilityLevel::Majority);
    ///
    /// assert_eq!(op.key(), "user::1");
    /// ```
    pub fn replace<F>(key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            durability: DurabilityLevel::None,
            presence: Presence::Required,
            mutation: Box::new(move |current| match current {
                Some(value) => f(value),
                None => Value::Null,
            }),
        }
    }

    /// Write `f(current)`, inserting when the document does not exist yet.
    pub fn upsert<F>(key: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<&Value>) -> Value + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            durability: DurabilityLevel::None,
            presence: Presence::Optional,
            mutation: Box::new(f),
        }
    }

    pub fn with_durability(mut self, durability: DurabilityLevel) -> Self {
        self.durability = durability;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn durability(&self) -> DurabilityLevel {
        self.durability
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    fn apply(&self, current: Option<&Value>) -> Value {
        (self.mutation)(current)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("key", &self.key)
            .field("durability", &self.durability)
            .field("presence", &self.presence)
            .finish_non_exhaustive()
    }
}

/// Why a single attempt failed
#[derive(Debug)]
enum AttemptFailure {
    /// The record was absent and the operation requires it
    Missing,
    Store(RawError),
}

impl AttemptFailure {
    fn kind(&self) -> ErrorKind {
        match self {
            AttemptFailure::Missing => ErrorKind::NotFound,
            AttemptFailure::Store(raw) => classify(raw),
        }
    }

    fn into_cause(self) -> Option<RawError> {
        match self {
            AttemptFailure::Missing => None,
            AttemptFailure::Store(raw) => Some(raw),
        }
    }
}

/// Builder for configuring a `DurableExecutor`
///
/// # Example
///
/// ```rust
/// use durable_core::retry::{DurableExecutor, TracingObserver};
/// use durable_core::store::InMemoryStore;
/// use durable_core::types::RetryPolicy;
///
/// let executor = DurableExecutor::builder(InMemoryStore::new())
///     .with_policy(RetryPolicy::default())
///     .with_observer(TracingObserver::new("change-email"))
///     .build();
/// ```
pub struct DurableExecutorBuilder<S, O = NoOpObserver> {
    store: S,
    policy: RetryPolicy,
    observer: O,
}

impl<S, O> DurableExecutorBuilder<S, O> {
    /// Set the backoff policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the observer
    pub fn with_observer<O2>(self, observer: O2) -> DurableExecutorBuilder<S, O2> {
        DurableExecutorBuilder {
            store: self.store,
            policy: self.policy,
            observer,
        }
    }

    /// Build the executor
    pub fn build(self) -> DurableExecutor<S, O> {
        DurableExecutor {
            store: self.store,
            policy: self.policy,
            observer: self.observer,
        }
    }
}

/// Executes operations with bounded, classified retries
///
/// The executor holds no per-call state, so one instance can serve many
/// concurrent calls for independent keys. Attempts within one call are
/// strictly sequential.
pub struct DurableExecutor<S, O = NoOpObserver> {
    store: S,
    policy: RetryPolicy,
    observer: O,
}

impl<S: DocumentStore> DurableExecutor<S, NoOpObserver> {
    /// Create an executor with the default policy and no observer
    pub fn new(store: S) -> Self {
        Self::builder(store).build()
    }

    pub fn builder(store: S) -> DurableExecutorBuilder<S, NoOpObserver> {
        DurableExecutorBuilder {
            store,
            policy: RetryPolicy::default(),
            observer: NoOpObserver,
        }
    }
}

impl<S, O> DurableExecutor<S, O>
where
    S: DocumentStore,
    O: RetryObserver,
{
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation
    ///
    /// Makes at most `max_retries + 1` attempts. Each attempt re-reads the
    /// record, applies the mutation and writes it back with the version it
    /// read. Retryable failures are retried after the policy's delay; any
    /// other failure ends the call immediately.
    ///
    /// `deadline` is checked before every attempt. Once it has passed the
    /// call fails with `ErrorKind::Timeout` without starting another attempt.
    pub async fn execute(
        &self,
        operation: Operation,
        max_retries: u32,
        deadline: Option<Instant>,
    ) -> Result<Value, ExecutorError> {
        let started = Instant::now();
        let mut state = RetryState::new(&self.policy, max_retries);
        let mut last_cause = None;

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                let err = ExecutorError::deadline_exceeded(state.attempts_made(), last_cause);
                self.observer.on_aborted(&err);
                return Err(err);
            }

            let attempt = state.begin_attempt();
            self.observer.on_attempt_start(attempt, state.max_attempts());

            let failure = match self.attempt(&operation).await {
                Ok(value) => {
                    self.observer.on_success(attempt, started.elapsed());
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let kind = failure.kind();
            let cause = failure.into_cause();
            if !state.should_retry(kind) {
                let err = ExecutorError::new(kind, attempt, cause);
                if kind.is_retryable() {
                    self.observer.on_exhausted(&err);
                } else {
                    self.observer.on_aborted(&err);
                }
                return Err(err);
            }
            last_cause = cause;

            // Never sleep past the deadline; the check above ends the call
            let mut delay = state.next_delay();
            if let Some(deadline) = deadline {
                delay = delay.min(deadline.saturating_duration_since(Instant::now()));
            }

            self.observer.on_retry(attempt, kind, delay);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Execute an operation with the retry budget and timeout from `config`
    pub async fn execute_with_config(
        &self,
        operation: Operation,
        config: &ExecutorConfig,
    ) -> Result<Value, ExecutorError> {
        let deadline = config.timeout().map(|timeout| Instant::now() + timeout);
        self.execute(operation, config.max_retries, deadline).await
    }

    async fn attempt(&self, operation: &Operation) -> Result<Value, AttemptFailure> {
        let current = self
            .store
            .read(operation.key())
            .await
            .map_err(AttemptFailure::Store)?;

        let (value, expected) = match current {
            Some(doc) => (Some(doc.value), Some(doc.cas)),
            None if operation.presence() == Presence::Required => {
                return Err(AttemptFailure::Missing)
            }
            None => (None, None),
        };

        let new_value = operation.apply(value.as_ref());
        let cas = self
            .store
            .write(
                operation.key(),
                new_value.clone(),
                expected,
                operation.durability(),
            )
            .await
            .map_err(AttemptFailure::Store)?;

        tracing::trace!(key = operation.key(), %cas, "write acknowledged");
        Ok(new_value)
    }
}

impl<S> DurableExecutor<S, NoOpObserver>
where
    S: DocumentStore,
{
    /// Create an executor using the retry policy from `config`
    pub fn from_config(store: S, config: &ExecutorConfig) -> Self {
        Self::builder(store).with_policy(config.retry.clone()).build()
    }
}
