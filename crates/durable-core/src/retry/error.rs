//! Terminal error of an executed operation

use thiserror::Error;

use crate::store::RawError;

use super::classify::ErrorKind;

/// Failure surfaced by [`DurableExecutor::execute`](super::DurableExecutor::execute)
///
/// Carries the terminal [`ErrorKind`] and how many attempts were started, so
/// callers can decide how to escalate (for example by telling an end user to
/// try again later).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operation failed with {kind} after {attempts_made} attempt(s)")]
pub struct ExecutorError {
    kind: ErrorKind,
    attempts_made: u32,
    #[source]
    cause: Option<RawError>,
}

impl ExecutorError {
    pub fn new(kind: ErrorKind, attempts_made: u32, cause: Option<RawError>) -> Self {
        Self {
            kind,
            attempts_made,
            cause,
        }
    }

    /// The deadline passed before another attempt could start
    ///
    /// `last_cause` is the failure of the previous attempt, if any.
    pub fn deadline_exceeded(attempts_made: u32, last_cause: Option<RawError>) -> Self {
        Self::new(ErrorKind::Timeout, attempts_made, last_cause)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// The store failure behind the final attempt, if there was one
    pub fn cause(&self) -> Option<&RawError> {
        self.cause.as_ref()
    }

    /// A retryable failure persisted until the retry budget ran out
    pub fn is_exhausted(&self) -> bool {
        self.kind.is_retryable()
    }

    /// The write may have been applied even though the call failed
    pub fn is_ambiguous(&self) -> bool {
        self.kind.is_ambiguous()
    }
}
