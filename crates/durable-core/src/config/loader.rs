use crate::error::{Error, Result};
use crate::types::ExecutorConfig;
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::fs;
use std::io;

/// File names searched for, in order, when no explicit path is given
pub const CONFIG_FILE_NAMES: [&str; 2] = ["durable.yaml", "durable.yml"];

/// Loads `ExecutorConfig` from a file and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Directory searched for a config file
    search_dir: Utf8PathBuf,
    /// Explicit config file, overrides the search
    path: Option<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a loader searching the current working directory
    pub fn new() -> Result<Self> {
        let cwd = env::current_dir()?;
        let search_dir = Utf8PathBuf::from_path_buf(cwd).map_err(|p| {
            Error::invalid_config(format!("Non UTF-8 working directory: {}", p.display()))
        })?;
        Ok(Self::with_dir(search_dir))
    }

    /// Create a loader searching a custom directory
    pub fn with_dir(search_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            search_dir: search_dir.into(),
            path: None,
        }
    }

    /// Load from an explicit file; a missing file is an error
    pub fn with_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// The config file that would be read, if any
    pub fn find_config_file(&self) -> Option<Utf8PathBuf> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| self.search_dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Load the effective configuration
    pub fn load(&self) -> Result<ExecutorConfig> {
        let mut config = match self.find_config_file() {
            Some(path) => {
                tracing::debug!(path = %path, "loading executor config");
                Self::load_yaml_file(&path)?
            }
            None => ExecutorConfig::default(),
        };

        config = Self::apply_env_overrides(config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_yaml_file(path: &Utf8Path) -> Result<ExecutorConfig> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::config_not_found(path.as_str()),
            _ => Error::Io(e),
        })?;

        // An empty file means all defaults
        if content.trim().is_empty() {
            return Ok(ExecutorConfig::default());
        }

        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Apply `DURABLE_*` environment variable overrides
    fn apply_env_overrides(mut config: ExecutorConfig) -> Result<ExecutorConfig> {
        if let Ok(val) = env::var("DURABLE_MAX_RETRIES") {
            config.max_retries = val
                .parse()
                .map_err(|_| Error::invalid_config("DURABLE_MAX_RETRIES must be a valid number"))?;
        }

        // Zero disables the deadline
        if let Ok(val) = env::var("DURABLE_TIMEOUT_MS") {
            let timeout_ms: u64 = val
                .parse()
                .map_err(|_| Error::invalid_config("DURABLE_TIMEOUT_MS must be a valid number"))?;
            config.timeout_ms = (timeout_ms > 0).then_some(timeout_ms);
        }

        if let Ok(val) = env::var("DURABLE_DURABILITY") {
            config.durability = val.parse()?;
        }

        // Retry policy
        if let Ok(val) = env::var("DURABLE_RETRY_STRATEGY") {
            config.retry.strategy = val.parse()?;
        }

        if let Ok(val) = env::var("DURABLE_INITIAL_DELAY_MS") {
            config.retry.initial_delay_ms = val.parse().map_err(|_| {
                Error::invalid_config("DURABLE_INITIAL_DELAY_MS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("DURABLE_MAX_DELAY_MS") {
            config.retry.max_delay_ms = val
                .parse()
                .map_err(|_| Error::invalid_config("DURABLE_MAX_DELAY_MS must be a valid number"))?;
        }

        if let Ok(val) = env::var("DURABLE_BACKOFF_MULTIPLIER") {
            config.retry.backoff_multiplier = val.parse().map_err(|_| {
                Error::invalid_config("DURABLE_BACKOFF_MULTIPLIER must be a valid number")
            })?;
        }

        Ok(config)
    }

    /// Get the search directory
    pub fn search_dir(&self) -> &Utf8Path {
        &self.search_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DurabilityLevel, RetryStrategy};
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: [&str; 7] = [
        "DURABLE_MAX_RETRIES",
        "DURABLE_TIMEOUT_MS",
        "DURABLE_DURABILITY",
        "DURABLE_RETRY_STRATEGY",
        "DURABLE_INITIAL_DELAY_MS",
        "DURABLE_MAX_DELAY_MS",
        "DURABLE_BACKOFF_MULTIPLIER",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    fn create_temp_loader() -> (ConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let dir =
            Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).expect("Invalid UTF-8 path");
        (ConfigLoader::with_dir(dir), temp_dir)
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_file() {
        clear_env();
        let (loader, _temp) = create_temp_loader();

        assert!(loader.find_config_file().is_none());
        let config = loader.load().unwrap();
        assert_eq!(config, ExecutorConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        clear_env();
        let (loader, _temp) = create_temp_loader();

        let content = r#"
max-retries: 3
timeout-ms: 2500
durability: persist-to-majority
retry:
  strategy: linear-backoff
  initial-delay-ms: 50
  max-delay-ms: 400
"#;
        fs::write(loader.search_dir().join("durable.yaml"), content).unwrap();

        let config = loader.load().unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout_ms, Some(2500));
        assert_eq!(config.durability, DurabilityLevel::PersistToMajority);
        assert_eq!(config.retry.strategy, RetryStrategy::LinearBackoff);
        assert_eq!(config.retry.initial_delay_ms, 50);
        assert_eq!(config.retry.max_delay_ms, 400);
        // Unset keys keep their defaults
        assert_eq!(config.retry.backoff_multiplier, 2.0);
    }

    #[test]
    #[serial]
    fn test_yml_extension_is_found() {
        clear_env();
        let (loader, _temp) = create_temp_loader();
        fs::write(loader.search_dir().join("durable.yml"), "max-retries: 9\n").unwrap();

        assert_eq!(loader.load().unwrap().max_retries, 9);
    }

    #[test]
    #[serial]
    fn test_empty_file_uses_defaults() {
        clear_env();
        let (loader, _temp) = create_temp_loader();
        fs::write(loader.search_dir().join("durable.yaml"), "\n").unwrap();

        assert_eq!(loader.load().unwrap(), ExecutorConfig::default());
    }

    #[test]
    #[serial]
    fn test_explicit_path_missing() {
        clear_env();
        let (loader, _temp) = create_temp_loader();
        let path = loader.search_dir().join("nope.yaml");

        let err = loader.with_path(path).load().unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_invalid_yaml() {
        clear_env();
        let (loader, _temp) = create_temp_loader();
        fs::write(loader.search_dir().join("durable.yaml"), "max-retries: [1, 2").unwrap();

        let err = loader.load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    #[serial]
    fn test_file_failing_validation() {
        clear_env();
        let (loader, _temp) = create_temp_loader();
        let content = "retry:\n  initial-delay-ms: 900\n  max-delay-ms: 100\n";
        fs::write(loader.search_dir().join("durable.yaml"), content).unwrap();

        let err = loader.load().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        let (loader, _temp) = create_temp_loader();
        fs::write(loader.search_dir().join("durable.yaml"), "max-retries: 3\n").unwrap();

        env::set_var("DURABLE_MAX_RETRIES", "7");
        env::set_var("DURABLE_DURABILITY", "majority_and_persist_active");
        env::set_var("DURABLE_RETRY_STRATEGY", "fixed");
        env::set_var("DURABLE_INITIAL_DELAY_MS", "20");
        env::set_var("DURABLE_MAX_DELAY_MS", "80");
        env::set_var("DURABLE_BACKOFF_MULTIPLIER", "1.5");

        let config = loader.load().unwrap();
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.durability, DurabilityLevel::MajorityAndPersistActive);
        assert_eq!(config.retry.strategy, RetryStrategy::FixedDelay);
        assert_eq!(config.retry.initial_delay_ms, 20);
        assert_eq!(config.retry.max_delay_ms, 80);
        assert_eq!(config.retry.backoff_multiplier, 1.5);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_zero_timeout_disables_deadline() {
        clear_env();
        let (loader, _temp) = create_temp_loader();

        env::set_var("DURABLE_TIMEOUT_MS", "0");
        let config = loader.load().unwrap();
        assert_eq!(config.timeout_ms, None);
        assert!(config.timeout().is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_invalid_values() {
        clear_env();
        let (loader, _temp) = create_temp_loader();

        env::set_var("DURABLE_MAX_RETRIES", "lots");
        let err = loader.load().unwrap_err();
        assert!(err.to_string().contains("DURABLE_MAX_RETRIES"));
        clear_env();

        env::set_var("DURABLE_DURABILITY", "everywhere");
        let err = loader.load().unwrap_err();
        assert!(matches!(err, Error::InvalidDurability { .. }));
        clear_env();

        env::set_var("DURABLE_BACKOFF_MULTIPLIER", "0.5");
        let err = loader.load().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
        clear_env();
    }
}
