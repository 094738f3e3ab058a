//! # durable-core
//!
//! Core library for the durable operation executor providing:
//! - Classification of raw store failures into a closed `ErrorKind` taxonomy
//! - Bounded retry policy with non-decreasing backoff
//! - `DurableExecutor`, which runs read-modify-write operations against a
//!   `DocumentStore` with a requested durability level
//! - Configuration loading (YAML file plus `DURABLE_*` environment overrides)
//! - An in-memory `DocumentStore` with fault injection

pub mod config;
pub mod error;
pub mod retry;
pub mod store;
pub mod types;

pub use config::ConfigLoader;
pub use error::{Error, Result};
pub use retry::{DurableExecutor, ErrorKind, ExecutorError, Operation};
pub use store::{Cas, DocumentStore, RawError};
pub use types::{DurabilityLevel, ExecutorConfig, RetryPolicy, RetryStrategy};
