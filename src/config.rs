//! Configuration file (`kek.json`)
//!
//! ```json
//! { "data_dir": "./data", "default_limit": 20, "max_concurrency": 64, "log_level": "info" }
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KekError, KekResult};
use crate::observability::{log_event_with_fields, Event, Severity};
use crate::tasks::DEFAULT_MAX_CONCURRENCY;

/// Default config path, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "./kek.json";

/// Page size of unfiltered listings when the query sets none
pub const DEFAULT_LIMIT: usize = 20;

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KekConfig {
    /// Root directory of the local kekspace (required)
    pub data_dir: PathBuf,

    /// Page size of unfiltered listings (default 20)
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound on in-flight storage tasks per fan-out (default 64)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Minimum log severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl KekConfig {
    /// Config with defaults for everything but the data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            default_limit: default_limit(),
            max_concurrency: default_max_concurrency(),
            log_level: default_log_level(),
        }
    }

    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> KekResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| KekError::config(format!("Failed to read config: {}", e)))?;

        let config: KekConfig = serde_json::from_str(&content)
            .map_err(|e| KekError::config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        let source = path.display().to_string();
        let data_dir = config.data_dir.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", source.as_str()), ("data_dir", data_dir.as_str())],
        );
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> KekResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(KekError::config("data_dir must not be empty"));
        }

        if self.default_limit == 0 {
            return Err(KekError::config("default_limit must be > 0"));
        }

        if self.max_concurrency == 0 {
            return Err(KekError::config("max_concurrency must be > 0"));
        }

        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> KekResult<Severity> {
        self.log_level.parse::<Severity>().map_err(|_| {
            KekError::config(format!(
                "Invalid log_level: '{}'. Expected one of trace, info, warn, error, fatal.",
                self.log_level
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("kek.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_applied() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, r#"{"data_dir": "/tmp/kek"}"#);

        let config = KekConfig::load(&path).unwrap();
        assert_eq!(config, KekConfig::new("/tmp/kek"));
        assert_eq!(config.default_limit, 20);
        assert_eq!(config.max_concurrency, 64);
        assert_eq!(config.severity().unwrap(), Severity::Info);
    }

    #[test]
    fn test_missing_data_dir_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, r#"{"default_limit": 5}"#);
        assert!(matches!(KekConfig::load(&path), Err(KekError::Config(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = KekConfig::new("/tmp/kek");
        config.default_limit = 0;
        assert!(config.validate().is_err());

        let mut config = KekConfig::new("/tmp/kek");
        config.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = KekConfig::new("/tmp/kek");
        config.log_level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = KekConfig::load(&temp.path().join("absent.json"));
        assert!(matches!(result, Err(KekError::Config(msg)) if msg.contains("Failed to read")));
    }
}
