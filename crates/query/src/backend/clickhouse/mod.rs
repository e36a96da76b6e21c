//! ClickHouse backend
//!
//! Executes statements over the HTTP interface. The SQL travels in the POST
//! body, bound values as `param_<name>` URL parameters, which ClickHouse
//! substitutes into the typed `{name:Type}` placeholders server-side.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use vantage_config::ClickHouseConfig;

use crate::backend::{QueryBackend, validate_sql};
use crate::error::QueryError;
use crate::result::{Column, DataType, QueryResult};
use crate::statement::Statement;

const OUTPUT_FORMAT: &str = "JSONCompactEachRowWithNamesAndTypes";

// =============================================================================
// Configuration
// =============================================================================

/// ClickHouse backend configuration
#[derive(Debug, Clone)]
pub struct ClickHouseBackendConfig {
    /// ClickHouse HTTP URL (e.g., "http://localhost:8123")
    pub url: String,

    /// Database name
    pub database: String,

    /// Username for authentication (optional)
    pub username: Option<String>,

    /// Password for authentication (optional)
    pub password: Option<String>,

    /// Server-side max execution time in seconds (0 = server default)
    pub max_execution_time: u64,

    /// Client-side request timeout
    pub timeout: Duration,
}

impl Default for ClickHouseBackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".into(),
            database: "default".into(),
            username: None,
            password: None,
            max_execution_time: 30,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClickHouseBackendConfig {
    /// Create a new config with URL and database
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Default::default()
        }
    }

    /// Set authentication credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the client-side request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&ClickHouseConfig> for ClickHouseBackendConfig {
    fn from(config: &ClickHouseConfig) -> Self {
        Self {
            url: config.url.clone(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            max_execution_time: config.max_execution_time,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

// =============================================================================
// Backend Implementation
// =============================================================================

/// ClickHouse backend using the HTTP interface
#[derive(Clone)]
pub struct ClickHouseBackend {
    client: reqwest::Client,
    config: ClickHouseBackendConfig,
}

impl std::fmt::Debug for ClickHouseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseBackend")
            .field("url", &self.config.url)
            .field("database", &self.config.database)
            .finish()
    }
}

impl ClickHouseBackend {
    /// Create a new ClickHouse backend from config
    pub fn new(config: &ClickHouseBackendConfig) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| QueryError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Create from the `[clickhouse]` config section
    pub fn from_config(config: &ClickHouseConfig) -> Result<Self, QueryError> {
        Self::new(&ClickHouseBackendConfig::from(config))
    }

    /// Build the request URL carrying settings and bound parameters
    fn build_url(&self, statement: &Statement) -> Result<reqwest::Url, QueryError> {
        let mut url = reqwest::Url::parse(&self.config.url)
            .map_err(|e| QueryError::Config(format!("invalid ClickHouse URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("database", &self.config.database);
            if self.config.max_execution_time > 0 {
                query.append_pair(
                    "max_execution_time",
                    &self.config.max_execution_time.to_string(),
                );
            }
            query.append_pair("output_format_json_quote_64bit_integers", "0");
            query.append_pair("output_format_json_quote_denormals", "0");
            for (name, value) in statement.params.named() {
                query.append_pair(&format!("param_{}", name), &value.to_param_string());
            }
        }

        Ok(url)
    }

    /// Send a statement and return the raw response body
    async fn send(&self, statement: &Statement) -> Result<String, QueryError> {
        let url = self.build_url(statement)?;

        let mut request = self.client.post(url).body(statement.sql.clone());
        if let Some(user) = &self.config.username {
            request = request.basic_auth(user, self.config.password.as_ref());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                QueryError::Execution(format!("ClickHouse request timed out: {}", e))
            } else {
                QueryError::Connection(format!("ClickHouse connection failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Execution(format!(
                "ClickHouse error ({}): {}",
                status,
                body.trim()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| QueryError::Execution(format!("failed to read response: {}", e)))
    }
}

#[async_trait]
impl QueryBackend for ClickHouseBackend {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult, QueryError> {
        validate_sql(&statement.sql)?;

        let start = Instant::now();
        let sql = format!(
            "{} FORMAT {}",
            statement.sql.trim().trim_end_matches(';'),
            OUTPUT_FORMAT
        );
        let body = self
            .send(&Statement::new(sql, statement.params.clone()))
            .await?;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        let result = parse_compact_rows(&body, execution_time_ms)?;

        tracing::debug!(
            rows = result.row_count,
            cols = result.columns.len(),
            params = statement.params.len(),
            time_ms = execution_time_ms,
            "ClickHouse query executed"
        );

        Ok(result)
    }

    async fn health_check(&self) -> Result<(), QueryError> {
        self.send(&Statement::raw("SELECT 1")).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "clickhouse"
    }
}

// =============================================================================
// Response Parsing
// =============================================================================

/// Parse a `JSONCompactEachRowWithNamesAndTypes` body
///
/// The first line holds the column names, the second their types, every
/// following line one row as a JSON array.
fn parse_compact_rows(body: &str, execution_time_ms: u64) -> Result<QueryResult, QueryError> {
    let mut lines = body.lines().filter(|line| !line.trim().is_empty());

    let Some(names_line) = lines.next() else {
        return Ok(QueryResult::new(Vec::new(), Vec::new(), execution_time_ms));
    };
    let names: Vec<String> = serde_json::from_str(names_line)
        .map_err(|e| QueryError::Serialization(format!("failed to parse column names: {}", e)))?;

    let types: Vec<String> = match lines.next() {
        Some(line) => serde_json::from_str(line).map_err(|e| {
            QueryError::Serialization(format!("failed to parse column types: {}", e))
        })?,
        None => Vec::new(),
    };

    let columns: Vec<Column> = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let ch_type = types.get(i).map(String::as_str).unwrap_or("");
            Column::new(
                name,
                clickhouse_type_to_datatype(ch_type),
                ch_type.starts_with("Nullable("),
            )
        })
        .collect();

    let rows = lines
        .map(|line| {
            let row: Vec<serde_json::Value> = serde_json::from_str(line).map_err(|e| {
                QueryError::Serialization(format!("failed to parse JSON row: {}", e))
            })?;
            if row.len() != columns.len() {
                return Err(QueryError::Serialization(format!(
                    "row has {} values, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            Ok(row)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QueryResult::new(columns, rows, execution_time_ms))
}

/// Convert ClickHouse type string to DataType
fn clickhouse_type_to_datatype(ch_type: &str) -> DataType {
    let inner_type = ch_type
        .strip_prefix("Nullable(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(ch_type);

    let inner_type = inner_type
        .strip_prefix("LowCardinality(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(inner_type);

    match inner_type {
        "Int8" | "Int16" | "Int32" | "Int64" | "Int128" | "Int256" => DataType::Int64,
        "UInt8" | "UInt16" | "UInt32" | "UInt64" | "UInt128" | "UInt256" => DataType::UInt64,
        "Float32" | "Float64" => DataType::Float64,
        "String" => DataType::String,
        t if t.starts_with("FixedString(") => DataType::String,
        t if t.starts_with("Enum") => DataType::String,
        "Bool" => DataType::Boolean,
        "Date" | "Date32" => DataType::Date,
        t if t.starts_with("DateTime") => DataType::Timestamp,
        t if t.starts_with("Array(") => DataType::Array,
        _ => DataType::Unknown,
    }
}

#[cfg(test)]
#[path = "clickhouse_test.rs"]
mod clickhouse_test;
