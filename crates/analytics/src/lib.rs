//! Vantage Analytics Engine
//!
//! Privacy-friendly web analytics over three append-only streams: page
//! views, sessions and events.
//!
//! # Overview
//!
//! This crate provides the query core on top of `vantage-query`. It includes:
//!
//! - **Fact model**: the rows the store holds, sessions as sign-weighted pairs
//! - **Field registry**: per-stream SQL expressions for every attribute
//! - **Filter**: client, window and dimension restrictions
//! - **Planner**: base stream selection and joins, each dimension applied once
//! - **Renderer**: SQL text with bound parameters, never interpolated values
//! - **Analyzer**: the catalog of operations returning typed statistics
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use vantage_analytics::{Analyzer, Filter, TimeRange};
//! use vantage_query::ClickHouseBackend;
//!
//! let backend = Arc::new(ClickHouseBackend::from_config(&config.clickhouse)?);
//! let analyzer = Analyzer::new(backend);
//!
//! let filter = Filter::new(client_id).with_time_range(&TimeRange::parse("30d")?);
//! let pages = analyzer.pages(Some(&filter)).await?;
//! ```
//!
//! # Growth
//!
//! ```ignore
//! let filter = Filter::from_query("client_id=1&range=7d&path=/pricing")?;
//!
//! // Compared with the seven days before
//! let growth = analyzer.growth(Some(&filter)).await?;
//! ```

pub mod analyzer;
pub mod builder;
pub mod derived;
pub mod error;
pub mod field;
pub mod filter;
pub mod model;
pub mod plan;
pub mod predicate;
pub mod render;
pub mod stats;
pub mod timerange;
mod wire;

#[cfg(test)]
mod predicate_test;

// Re-exports for convenience
pub use analyzer::{Analyzer, AnalyzerOptions, Attribute};
pub use builder::QueryBuilder;
pub use error::{AnalyticsError, Result};
pub use field::Field;
pub use filter::{CustomMetricType, Dimension, Direction, Filter, Period, Search, Sort};
pub use model::{Event, PageView, Session, Stream};
pub use plan::{QueryPlan, Request};
pub use render::render;
pub use stats::{
    ActiveVisitorStats, AttributeStats, BrowserVersionStats, CustomMetricStats, EntryStats,
    EventStats, ExitStats, Growth, OsVersionStats, PageConversionsStats, PageStats, PlatformStats,
    ReferrerStats, TimeSpentStats, TotalVisitorStats, VisitorHourStats, VisitorStats,
};
pub use timerange::TimeRange;
pub use wire::dimension_key;
