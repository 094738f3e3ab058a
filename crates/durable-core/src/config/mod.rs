//! Configuration loading
//!
//! Executor configuration is assembled from (low to high precedence):
//! 1. Built-in defaults
//! 2. A YAML file (`durable.yaml` / `durable.yml`, or an explicit path)
//! 3. Environment variables (`DURABLE_*` prefix)
//! 4. CLI flags (handled by caller)

mod loader;

pub use loader::{ConfigLoader, CONFIG_FILE_NAMES};
