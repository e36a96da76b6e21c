//! Vantage Configuration
//!
//! TOML-based configuration loading with sensible defaults. Every section
//! is optional; an empty file is a valid config.
//!
//! # Parsing
//!
//! ```
//! use vantage_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[analyzer]\ntimezone = \"Europe/Berlin\"").unwrap();
//! assert_eq!(config.analyzer.timezone, "Europe/Berlin");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [clickhouse]
//! url = "http://localhost:8123"
//! database = "analytics"
//!
//! [analyzer]
//! timezone = "UTC"
//! max_time_on_page_seconds = 3600
//! ```

mod analyzer;
mod clickhouse;
mod error;
mod logging;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use analyzer::AnalyzerConfig;
pub use clickhouse::ClickHouseConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput, init_logging};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// ClickHouse connection
    pub clickhouse: ClickHouseConfig,

    /// Analyzer defaults
    pub analyzer: AnalyzerConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks the ClickHouse endpoint and the default timezone.
    pub fn validate(&self) -> Result<()> {
        self.clickhouse.validate()?;
        self.analyzer.validate()?;
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.clickhouse.url, "http://localhost:8123");
        assert_eq!(config.clickhouse.database, "default");
        assert_eq!(config.analyzer.timezone, "UTC");
        assert_eq!(config.analyzer.max_time_on_page_seconds, 0);
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[clickhouse]
url = "https://ch.internal:8443"
database = "analytics"
username = "reader"
password = "secret"
max_execution_time = 10
timeout_secs = 20

[analyzer]
default_client_id = 42
timezone = "Europe/Berlin"
max_time_on_page_seconds = 3600
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.clickhouse.database, "analytics");
        assert_eq!(config.clickhouse.username.as_deref(), Some("reader"));
        assert_eq!(config.clickhouse.max_execution_time, 10);
        assert_eq!(config.analyzer.default_client_id, 42);
        assert_eq!(config.analyzer.tz().unwrap(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let err = Config::from_str("[analyzer]\ntimezone = \"Mars/Olympus\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { section: "analyzer", field: "timezone", .. }
        ));
    }

    #[test]
    fn test_invalid_clickhouse_url_rejected() {
        let err = Config::from_str("[clickhouse]\nurl = \"localhost:8123\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "url", .. }));

        let err = Config::from_str("[clickhouse]\ntimeout_secs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "timeout_secs", .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[clickhouse]\ndatabase = \"stats\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.clickhouse.database, "stats");
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file("/nonexistent/vantage.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }
}
