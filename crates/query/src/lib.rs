//! Vantage Query - statement execution for the analytics core
//!
//! The analytics crate renders [`Statement`]s (SQL text plus bound values)
//! and hands them to a [`QueryBackend`]:
//! - **ClickHouse**: the production store, over its HTTP interface
//! - **Mock**: an in-memory backend that records statements, for tests
//!
//! # Usage
//!
//! ```ignore
//! use vantage_query::{ClickHouseBackend, Params, QueryBackend, Statement};
//!
//! let backend = ClickHouseBackend::from_config(&config.clickhouse)?;
//!
//! let mut params = Params::new();
//! let client = params.bind(1i64);
//! let statement = Statement::new(
//!     format!("SELECT uniq(visitor_id) FROM session WHERE client_id = {}", client),
//!     params,
//! );
//! let visitors = backend.count(&statement).await?;
//! ```

pub mod backend;
pub mod error;
pub mod result;
pub mod statement;

// Re-exports
pub use backend::QueryBackend;
pub use backend::clickhouse::{ClickHouseBackend, ClickHouseBackendConfig};
pub use backend::mock::MockBackend;
pub use backend::validate_sql;
pub use error::QueryError;
pub use result::{Column, DataType, QueryResult};
pub use statement::{ParamValue, Params, Statement};
