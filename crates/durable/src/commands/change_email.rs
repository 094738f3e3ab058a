//! Change-email command
//!
//! Seeds an in-memory store with a user record, queues any requested write
//! failures, then replaces the record's email through `DurableExecutor`.

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use durable_core::retry::TracingObserver;
use durable_core::store::InMemoryStore;
use durable_core::{DurableExecutor, ErrorKind, ExecutorConfig, ExecutorError, Operation};
use serde_json::{json, Value};

use crate::cli::ChangeEmailArgs;
use crate::output;

pub async fn run(args: ChangeEmailArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = apply_overrides(super::config::load(config_path)?, &args);
    config.validate()?;

    let store = InMemoryStore::new();
    if !args.missing {
        store
            .seed(
                args.key.as_str(),
                json!({ "name": "John Smith", "email": "john@example.com" }),
            )
            .await;
    }
    for fault in &args.faults {
        store
            .inject_write_fault(args.key.as_str(), fault.to_raw_error(config.durability))
            .await;
    }

    let executor = DurableExecutor::builder(store)
        .with_policy(config.retry.clone())
        .with_observer(TracingObserver::new("change-email"))
        .build();

    let email = args.email.clone();
    let operation = Operation::replace(args.key.as_str(), move |doc| {
        let mut doc = doc.clone();
        if let Some(fields) = doc.as_object_mut() {
            fields.insert("email".to_string(), Value::String(email.clone()));
        }
        doc
    })
    .with_durability(config.durability);

    match executor.execute_with_config(operation, &config).await {
        Ok(doc) => {
            output::success(&format!("Updated email for {}", args.key));
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }
        Err(err) => {
            report_failure(&err);
            Err(anyhow!("Failed to change email for {}", args.key))
        }
    }
}

/// CLI flags take precedence over file and environment
fn apply_overrides(mut config: ExecutorConfig, args: &ChangeEmailArgs) -> ExecutorConfig {
    if let Some(max_retries) = args.max_retries {
        config.max_retries = max_retries;
    }
    if let Some(durability) = args.durability {
        config.durability = durability;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = (timeout_ms > 0).then_some(timeout_ms);
    }
    config
}

fn report_failure(err: &ExecutorError) {
    output::error(&err.to_string());
    output::kv("Kind", err.kind().as_str());
    output::kv("Attempts", &err.attempts_made().to_string());
    if let Some(cause) = err.cause() {
        output::kv("Cause", &cause.to_string());
    }
    output::info(advice(err));
}

/// What an application would tell its end user
fn advice(err: &ExecutorError) -> &'static str {
    if err.is_exhausted() {
        return "The record is busy, please try again later";
    }
    if err.is_ambiguous() {
        return "The change may have been applied; check the record before trying again later";
    }
    match err.kind() {
        ErrorKind::NotFound => "The user record does not exist",
        ErrorKind::AlreadyExists => "The user record already exists",
        ErrorKind::DurabilityInvalidLevel
        | ErrorKind::ReplicaNotConfigured
        | ErrorKind::DurabilityImpossible => {
            "The requested durability level cannot be met; lower it or check replication"
        }
        _ => "Unexpected failure, see the log for details",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use durable_core::DurabilityLevel;

    fn args() -> ChangeEmailArgs {
        ChangeEmailArgs {
            key: "user::john".to_string(),
            email: "john.smith@example.com".to_string(),
            max_retries: None,
            durability: None,
            timeout_ms: None,
            missing: false,
            faults: Vec::new(),
        }
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let args = ChangeEmailArgs {
            max_retries: Some(1),
            durability: Some(DurabilityLevel::Majority),
            timeout_ms: Some(0),
            ..args()
        };

        let config = apply_overrides(ExecutorConfig::default(), &args);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.durability, DurabilityLevel::Majority);
        assert_eq!(config.timeout_ms, None);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let config = apply_overrides(ExecutorConfig::default(), &args());
        assert_eq!(config, ExecutorConfig::default());
    }

    #[test]
    fn test_advice_for_outcomes() {
        let exhausted = ExecutorError::new(ErrorKind::CasMismatch, 6, None);
        assert!(advice(&exhausted).contains("try again later"));

        let ambiguous = ExecutorError::new(ErrorKind::DurabilityAmbiguous, 1, None);
        assert!(advice(&ambiguous).contains("may have been applied"));

        let timeout = ExecutorError::deadline_exceeded(3, None);
        assert!(advice(&timeout).contains("again later"));

        let missing = ExecutorError::new(ErrorKind::NotFound, 1, None);
        assert_eq!(advice(&missing), "The user record does not exist");

        let impossible = ExecutorError::new(ErrorKind::DurabilityImpossible, 1, None);
        assert!(advice(&impossible).contains("durability level"));
    }
}
