//! Document store collaborator interface
//!
//! The executor never talks to a cluster directly. It reads and writes through
//! a [`DocumentStore`], and interprets the store's failures only through
//! [`classify`](crate::retry::classify).

mod memory;

pub use memory::{InMemoryStore, StoreTopology};

use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::types::DurabilityLevel;

/// Version token of a stored document
///
/// Every successful write produces a new token; a write carrying a stale
/// token is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cas(pub u64);

impl fmt::Display for Cas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// A document together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub value: Value,
    pub cas: Cas,
}

/// Key-value protocol status codes the store can answer with
pub mod status {
    pub const KEY_ENOENT: u16 = 0x0001;
    pub const KEY_EEXISTS: u16 = 0x0002;
    pub const ENOMEM: u16 = 0x0082;
    pub const EBUSY: u16 = 0x0085;
    pub const ETMPFAIL: u16 = 0x0086;
    pub const DURABILITY_INVALID_LEVEL: u16 = 0x00a0;
    pub const DURABILITY_IMPOSSIBLE: u16 = 0x00a1;
    pub const SYNC_WRITE_IN_PROGRESS: u16 = 0x00a2;
    pub const SYNC_WRITE_AMBIGUOUS: u16 = 0x00a3;
    pub const SYNC_WRITE_RECOMMIT_IN_PROGRESS: u16 = 0x00a4;
}

/// Failure reported by a [`DocumentStore`]
///
/// Callers should not branch on this directly; map it to an
/// [`ErrorKind`](crate::retry::ErrorKind) with
/// [`classify`](crate::retry::classify).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawError {
    /// The server answered with a non-success status
    #[error("server status {status:#06x}: {message}")]
    Status {
        status: u16,
        /// Whether the request carried a CAS value
        with_cas: bool,
        message: String,
    },

    /// No response arrived in time; the request may or may not have applied
    #[error("request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Durability was requested on a bucket with no replicas
    #[error("durability {requested} requested but no replicas are configured")]
    ReplicaNotConfigured { requested: DurabilityLevel },

    /// Any other client-side failure
    #[error("client error: {0}")]
    Client(String),
}

impl RawError {
    /// Create a status error for a request sent without a CAS value
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        RawError::Status {
            status,
            with_cas: false,
            message: message.into(),
        }
    }

    /// Create a status error for a request that carried a CAS value
    pub fn status_with_cas(status: u16, message: impl Into<String>) -> Self {
        RawError::Status {
            status,
            with_cas: true,
            message: message.into(),
        }
    }
}

/// Read/write interface of the external document store
///
/// Implementations can be written with plain `async fn`s; the returned
/// futures must be `Send`.
pub trait DocumentStore: Send + Sync {
    /// Fetch the current document, or `None` if the key does not exist.
    fn read(&self, key: &str) -> impl Future<Output = Result<Option<Document>, RawError>> + Send;

    /// Store `value` under `key`.
    ///
    /// * `expected = Some(cas)` replaces the document only if it is still at
    ///   that version.
    /// * `expected = None` inserts, failing if the key already exists.
    ///
    /// Returns the new version on success.
    fn write(
        &self,
        key: &str,
        value: Value,
        expected: Option<Cas>,
        durability: DurabilityLevel,
    ) -> impl Future<Output = Result<Cas, RawError>> + Send;
}

impl<T: DocumentStore> DocumentStore for Arc<T> {
    fn read(&self, key: &str) -> impl Future<Output = Result<Option<Document>, RawError>> + Send {
        (**self).read(key)
    }

    fn write(
        &self,
        key: &str,
        value: Value,
        expected: Option<Cas>,
        durability: DurabilityLevel,
    ) -> impl Future<Output = Result<Cas, RawError>> + Send {
        (**self).write(key, value, expected, durability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_is_hex() {
        let err = RawError::status(status::ETMPFAIL, "temporary failure");
        assert_eq!(err.to_string(), "server status 0x0086: temporary failure");
    }

    #[test]
    fn test_status_with_cas_flag() {
        let err = RawError::status_with_cas(status::KEY_EEXISTS, "cas mismatch");
        assert!(matches!(err, RawError::Status { with_cas: true, .. }));
    }

    #[test]
    fn test_cas_display() {
        assert_eq!(Cas(0x2a).to_string(), "0x000000000000002a");
    }
}
