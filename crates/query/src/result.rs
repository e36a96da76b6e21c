//! Query result types

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Rows returned by a backend, in column order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column definitions
    pub columns: Vec<Column>,

    /// Row data as JSON values (backend-agnostic)
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Total row count
    pub row_count: usize,

    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(
        columns: Vec<Column>,
        rows: Vec<Vec<serde_json::Value>>,
        execution_time_ms: u64,
    ) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time_ms,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), 0)
    }

    /// Build a result from column names and rows with inferred types
    pub fn from_rows(names: &[&str], rows: Vec<Vec<serde_json::Value>>) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let data_type = rows
                    .first()
                    .and_then(|row| row.get(i))
                    .map(DataType::infer)
                    .unwrap_or(DataType::Unknown);
                Column::new(*name, data_type, false)
            })
            .collect();
        Self::new(columns, rows, 0)
    }

    /// Check if result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Rename a column; no-op if it does not exist
    pub fn rename_column(&mut self, from: &str, to: impl Into<String>) {
        if let Some(column) = self.columns.iter_mut().find(|c| c.name == from) {
            column.name = to.into();
        }
    }

    /// First cell of the first row as an unsigned integer (0 when absent)
    pub fn first_u64(&self) -> u64 {
        let Some(value) = self.rows.first().and_then(|row| row.first()) else {
            return 0;
        };
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
                .unwrap_or(0),
            serde_json::Value::String(s) => s.parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Decode every row into `T`, matching columns to fields by name
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>, QueryError> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| self.decode_row(i, row))
            .collect()
    }

    /// Decode the first row, if any
    pub fn decode_first<T: DeserializeOwned>(&self) -> Result<Option<T>, QueryError> {
        self.rows
            .first()
            .map(|row| self.decode_row(0, row))
            .transpose()
    }

    fn decode_row<T: DeserializeOwned>(
        &self,
        index: usize,
        row: &[serde_json::Value],
    ) -> Result<T, QueryError> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .zip(row.iter())
            .map(|(column, value)| (column.name.clone(), value.clone()))
            .collect();

        serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| {
            QueryError::Decode {
                row: index,
                message: e.to_string(),
            }
        })
    }
}

/// Column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Data type
    pub data_type: DataType,

    /// Whether the column is nullable
    pub nullable: bool,
}

impl Column {
    /// Create a new column definition
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Data types supported in query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// 64-bit floating point
    Float64,
    /// UTF-8 string
    String,
    /// Boolean
    Boolean,
    /// Calendar date
    Date,
    /// Point in time
    Timestamp,
    /// Array of values
    Array,
    /// Unknown/other type
    Unknown,
}

impl DataType {
    /// Infer a type from a JSON value
    pub fn infer(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DataType::Unknown,
            serde_json::Value::Bool(_) => DataType::Boolean,
            serde_json::Value::Number(n) => {
                if n.is_f64() {
                    DataType::Float64
                } else if n.is_u64() {
                    DataType::UInt64
                } else {
                    DataType::Int64
                }
            }
            serde_json::Value::String(_) => DataType::String,
            serde_json::Value::Array(_) => DataType::Array,
            serde_json::Value::Object(_) => DataType::Unknown,
        }
    }
}
