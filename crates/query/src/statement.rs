//! Parameterized statements
//!
//! SQL text never contains a user-supplied value. Values are bound through
//! [`Params::bind`], which returns a typed ClickHouse placeholder such as
//! `{p0:String}`; the backend ships the values next to the text as
//! `param_p0=...`.

use chrono::{DateTime, NaiveDate, Utc};

/// A value bound to a statement placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl ParamValue {
    /// ClickHouse type used in the placeholder
    pub fn clickhouse_type(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float64(_) => "Float64",
            Self::Date(_) => "Date",
            Self::DateTime(_) => "DateTime('UTC')",
        }
    }

    /// Textual form sent over the wire
    pub fn to_param_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Int64(n) => n.to_string(),
            Self::UInt64(n) => n.to_string(),
            Self::Float64(n) => n.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::UInt64(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::UInt64(u64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

/// Ordered collection of bound values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: Vec<ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value and return the placeholder to splice into SQL
    pub fn bind(&mut self, value: impl Into<ParamValue>) -> String {
        let value = value.into();
        let placeholder = format!("{{p{}:{}}}", self.values.len(), value.clickhouse_type());
        self.values.push(value);
        placeholder
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ParamValue> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    /// `(name, value)` pairs, where `name` matches the placeholder (`p0`, `p1`, ...)
    pub fn named(&self) -> impl Iterator<Item = (String, &ParamValue)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("p{}", i), v))
    }
}

/// SQL text plus the values its placeholders refer to
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Statement without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Params::new())
    }
}
