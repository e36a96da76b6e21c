//! ClickHouse connection configuration

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Connection settings for the ClickHouse HTTP interface
///
/// # Example
///
/// ```toml
/// [clickhouse]
/// url = "http://localhost:8123"
/// database = "analytics"
/// username = "reader"
/// password = "secret"
/// max_execution_time = 30
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClickHouseConfig {
    /// HTTP endpoint
    /// Default: "http://localhost:8123"
    pub url: String,

    /// Database holding the `page_view`, `session` and `event` tables
    /// Default: "default"
    pub database: String,

    /// Username for basic auth
    pub username: Option<String>,

    /// Password for basic auth
    pub password: Option<String>,

    /// Server-side limit per query in seconds (0 = server default)
    /// Default: 30
    pub max_execution_time: u64,

    /// Client-side request timeout in seconds
    /// Default: 60
    pub timeout_secs: u64,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: "default".to_string(),
            username: None,
            password: None,
            max_execution_time: 30,
            timeout_secs: 60,
        }
    }
}

impl ClickHouseConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::invalid("clickhouse", "url", "must not be empty"));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ConfigError::invalid(
                "clickhouse",
                "url",
                format!("'{}' is not an http(s) URL", self.url),
            ));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::invalid("clickhouse", "database", "must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("clickhouse", "timeout_secs", "must be > 0"));
        }
        Ok(())
    }
}
