//! Analytics error types

use thiserror::Error;

/// Analytics errors
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Growth needs a bounded window to compare against
    #[error("no period or day specified")]
    NoPeriodOrDay,

    /// Invalid filter syntax
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Invalid time range
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Invalid analyzer configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] vantage_config::ConfigError),

    /// Backend error (from vantage-query)
    #[error("backend error: {0}")]
    Backend(#[from] vantage_query::QueryError),
}

/// Result type for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;
