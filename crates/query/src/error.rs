//! Query error types

/// Errors that can occur during query execution
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Query execution failed
    #[error("query execution failed: {0}")]
    Execution(String),

    /// Invalid SQL (only SELECT/WITH allowed)
    #[error("invalid SQL: {0}")]
    InvalidSql(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Response could not be parsed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Rows did not match the requested shape
    #[error("failed to decode row {row}: {message}")]
    Decode {
        /// Zero-based row index
        row: usize,
        /// Underlying decoder message
        message: String,
    },
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Serialization(err.to_string())
    }
}
