//! Retry-and-durability aware execution of idempotent store operations
//!
//! - [`classify`] maps store failures to the closed [`ErrorKind`] taxonomy
//! - [`should_retry`] / [`delay_before_next_attempt`] make the retry decision
//! - [`DurableExecutor`] orchestrates the attempts
//!
//! # Example
//!
//! ```rust,no_run
//! use durable_core::retry::{DurableExecutor, ExecutorError, Operation};
//! use durable_core::store::InMemoryStore;
//!
//! async fn change_email(store: InMemoryStore) -> Result<(), ExecutorError> {
//!     let executor = DurableExecutor::new(store);
//!     let op = Operation::replace("doc_id", |doc| {
//!         let mut doc = doc.clone();
//!         doc["email"] = "john.smith@example.com".into();
//!         doc
//!     });
//!
//!     executor.execute(op, 5, None).await?;
//!     Ok(())
//! }
//! ```

mod classify;
mod error;
mod executor;
mod observer;
mod policy;

pub use classify::{classify, ErrorKind};
pub use error::ExecutorError;
pub use executor::{DurableExecutor, DurableExecutorBuilder, Mutation, Operation, Presence};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use policy::{delay_before_next_attempt, should_retry, RetryState};
