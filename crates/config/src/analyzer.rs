//! Analyzer defaults

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Defaults applied to filters that leave a value unset
///
/// # Example
///
/// ```toml
/// [analyzer]
/// default_client_id = 0
/// timezone = "Europe/Berlin"
/// max_time_on_page_seconds = 3600
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Client used when no filter is passed
    /// Default: 0
    pub default_client_id: i64,

    /// IANA timezone for filters without one
    /// Default: "UTC"
    pub timezone: String,

    /// Cap for a single time-on-page gap (0 = uncapped)
    /// Default: 0
    pub max_time_on_page_seconds: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            default_client_id: 0,
            timezone: "UTC".to_string(),
            max_time_on_page_seconds: 0,
        }
    }
}

impl AnalyzerConfig {
    /// Parsed default timezone
    ///
    /// # Errors
    ///
    /// Returns an error if `timezone` is not a known IANA zone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            ConfigError::invalid("analyzer", "timezone", format!("'{}': {}", self.timezone, e))
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.tz().map(|_| ())
    }
}
