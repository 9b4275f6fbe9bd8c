use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::transfer::RetryPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    NoConfigDir,
    #[error("config file not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Endpoint settings shared by the search and playlist clients.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub url: String,
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_catalog_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Simultaneous segment fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Per-request timeout; a stalled segment fetch counts as a failure.
    #[serde(default = "default_transfer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            timeout_secs: default_transfer_timeout_secs(),
        }
    }
}

impl TransferConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

fn default_transfer_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.clone()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("", "", "vodfetch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "catalog.url cannot be empty".to_string(),
            ));
        }

        match url::Url::parse(&self.catalog.url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
            _ => {
                return Err(ConfigError::ValidationError(
                    "catalog.url must be a valid http:// or https:// URL".to_string(),
                ));
            }
        }

        if self.transfer.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "transfer.concurrency must be at least 1".to_string(),
            ));
        }

        if self.transfer.retry_base_delay_ms > self.transfer.retry_max_delay_ms {
            return Err(ConfigError::ValidationError(
                "transfer.retry_base_delay_ms cannot exceed retry_max_delay_ms".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<(), ConfigError> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()
    }

    #[test]
    fn test_minimal_config() {
        let result = parse(
            r#"
[catalog]
url = "https://catalog.example.com"
"#,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_defaults_applied() {
        let config: Config = toml::from_str(
            r#"
[catalog]
url = "https://catalog.example.com"
"#,
        )
        .unwrap();
        assert_eq!(config.transfer.concurrency, 4);
        assert_eq!(config.transfer.max_retries, 3);
        assert_eq!(config.catalog.timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_rejects_empty_url() {
        let result = parse(
            r#"
[catalog]
url = ""
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let result = parse(
            r#"
[catalog]
url = "ftp://catalog.example.com"
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let result = parse(
            r#"
[catalog]
url = "https://catalog.example.com"

[transfer]
concurrency = 0
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_inverted_retry_delays() {
        let result = parse(
            r#"
[catalog]
url = "https://catalog.example.com"

[transfer]
retry_base_delay_ms = 5000
retry_max_delay_ms = 100
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = TransferConfig {
            max_retries: 7,
            retry_base_delay_ms: 250,
            retry_max_delay_ms: 2000,
            ..Default::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 7);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_millis(2000));
    }
}
