//! Failure classification
//!
//! Maps every [`RawError`] a store can produce onto the closed [`ErrorKind`]
//! taxonomy. Each kind has a fixed retryability; anything unrecognised is
//! `Unknown` and is never retried.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::{status, RawError};

/// Terminal or transient category of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The document does not exist
    NotFound,
    /// An insert hit an existing document
    AlreadyExists,
    /// The document changed since it was read
    CasMismatch,
    /// A durable write did not complete; it may or may not have been applied
    DurabilityAmbiguous,
    /// The server does not accept the requested durability level
    DurabilityInvalidLevel,
    /// Durability was requested but the bucket has no replicas
    ReplicaNotConfigured,
    /// Not enough nodes are available to satisfy the durability level
    DurabilityImpossible,
    /// No response in time; the write may or may not have been applied
    Timeout,
    /// The server is temporarily unable to serve the request
    TransientServerError,
    /// Unrecognised failure
    Unknown,
}

impl ErrorKind {
    /// Every kind, in declaration order
    pub const ALL: [ErrorKind; 10] = [
        ErrorKind::NotFound,
        ErrorKind::AlreadyExists,
        ErrorKind::CasMismatch,
        ErrorKind::DurabilityAmbiguous,
        ErrorKind::DurabilityInvalidLevel,
        ErrorKind::ReplicaNotConfigured,
        ErrorKind::DurabilityImpossible,
        ErrorKind::Timeout,
        ErrorKind::TransientServerError,
        ErrorKind::Unknown,
    ];

    /// Whether an idempotent operation failing with this kind may be retried.
    ///
    /// `Timeout` and `DurabilityAmbiguous` are not: the write may already be
    /// applied.
    pub const fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::CasMismatch | ErrorKind::TransientServerError)
    }

    /// Whether the store may have applied the write despite the failure
    pub const fn is_ambiguous(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::DurabilityAmbiguous)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::CasMismatch => "cas-mismatch",
            ErrorKind::DurabilityAmbiguous => "durability-ambiguous",
            ErrorKind::DurabilityInvalidLevel => "durability-invalid-level",
            ErrorKind::ReplicaNotConfigured => "replica-not-configured",
            ErrorKind::DurabilityImpossible => "durability-impossible",
            ErrorKind::Timeout => "timeout",
            ErrorKind::TransientServerError => "transient-server-error",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&RawError> for ErrorKind {
    fn from(raw: &RawError) -> Self {
        classify(raw)
    }
}

/// Classify a store failure
pub fn classify(raw: &RawError) -> ErrorKind {
    match raw {
        RawError::Status {
            status, with_cas, ..
        } => classify_status(*status, *with_cas),
        RawError::Timeout { .. } => ErrorKind::Timeout,
        RawError::ReplicaNotConfigured { .. } => ErrorKind::ReplicaNotConfigured,
        RawError::Client(_) => ErrorKind::Unknown,
    }
}

fn classify_status(code: u16, with_cas: bool) -> ErrorKind {
    match code {
        status::KEY_ENOENT => ErrorKind::NotFound,
        // The server reuses KEY_EEXISTS for a stale CAS on replace
        status::KEY_EEXISTS if with_cas => ErrorKind::CasMismatch,
        status::KEY_EEXISTS => ErrorKind::AlreadyExists,
        status::ENOMEM
        | status::EBUSY
        | status::ETMPFAIL
        | status::SYNC_WRITE_IN_PROGRESS
        | status::SYNC_WRITE_RECOMMIT_IN_PROGRESS => ErrorKind::TransientServerError,
        status::DURABILITY_INVALID_LEVEL => ErrorKind::DurabilityInvalidLevel,
        status::DURABILITY_IMPOSSIBLE => ErrorKind::DurabilityImpossible,
        status::SYNC_WRITE_AMBIGUOUS => ErrorKind::DurabilityAmbiguous,
        _ => ErrorKind::Unknown,
    }
}
