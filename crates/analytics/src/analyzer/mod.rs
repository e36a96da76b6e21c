//! Analyzer
//!
//! The catalog of analytics operations, organized by domain:
//!
//! - **visitors**: visitor counts, hours, growth, active visitors
//! - **pages**: pages, entry and exit pages, page conversions
//! - **events**: events, meta breakdowns, custom metrics
//! - **demographics**: referrers, platforms, session attributes
//! - **time_spent**: session duration and time on page
//!
//! Every operation takes an optional [`Filter`], works on its own validated
//! copy, and runs through `plan -> render -> execute -> decode`. Ratios are
//! derived in Rust afterwards.

mod demographics;
mod events;
mod pages;
mod time_spent;
mod visitors;

pub use demographics::Attribute;

use std::sync::Arc;

use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use tracing::debug;

use vantage_config::AnalyzerConfig;
use vantage_query::{QueryBackend, QueryResult};

use crate::error::Result;
use crate::filter::Filter;
use crate::plan::{Request, plan};
use crate::render::render;

/// Defaults applied to every filter before validation
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerOptions {
    /// Client used when no filter is passed
    pub client_id: i64,
    /// Timezone for filters without one
    pub timezone: Tz,
    /// Time-on-page cap for filters without one
    pub max_time_on_page_seconds: u32,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            client_id: 0,
            timezone: Tz::UTC,
            max_time_on_page_seconds: 0,
        }
    }
}

impl AnalyzerOptions {
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self> {
        Ok(Self {
            client_id: config.default_client_id,
            timezone: config.tz()?,
            max_time_on_page_seconds: config.max_time_on_page_seconds,
        })
    }
}

/// Analytics operations over a query backend
#[derive(Clone)]
pub struct Analyzer {
    backend: Arc<dyn QueryBackend>,
    options: AnalyzerOptions,
}

impl Analyzer {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_options(backend, AnalyzerOptions::default())
    }

    pub fn with_options(backend: Arc<dyn QueryBackend>, options: AnalyzerOptions) -> Self {
        Self { backend, options }
    }

    /// Get a reference to the underlying query backend
    pub fn backend(&self) -> &dyn QueryBackend {
        self.backend.as_ref()
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Validated copy of the caller's filter, with defaults applied
    pub(crate) fn prepare(&self, filter: Option<&Filter>) -> Filter {
        let mut filter = match filter {
            Some(filter) => filter.clone(),
            None => Filter::new(self.options.client_id),
        };
        if filter.timezone.is_none() {
            filter.timezone = Some(self.options.timezone);
        }
        if filter.max_time_on_page_seconds == 0 {
            filter.max_time_on_page_seconds = self.options.max_time_on_page_seconds;
        }
        filter.validate();
        filter
    }

    async fn run(&self, operation: &'static str, filter: &Filter, request: &Request) -> Result<QueryResult> {
        let plan = plan(filter, request);
        let statement = render(&plan);
        debug!(
            operation,
            base = plan.base.table(),
            joins = plan.joins.len(),
            params = statement.params.len(),
            backend = self.backend.name(),
            "executing analyzer query"
        );
        Ok(self.backend.execute(&statement).await?)
    }

    pub(crate) async fn select<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        filter: &Filter,
        request: &Request,
    ) -> Result<Vec<T>> {
        Ok(self.run(operation, filter, request).await?.decode()?)
    }

    /// Single-row aggregate; an empty result decodes as `T::default()`
    pub(crate) async fn select_one<T: DeserializeOwned + Default>(
        &self,
        operation: &'static str,
        filter: &Filter,
        request: &Request,
    ) -> Result<T> {
        Ok(self
            .run(operation, filter, request)
            .await?
            .decode_first()?
            .unwrap_or_default())
    }

    /// Rows with a column renamed before decoding
    pub(crate) async fn select_renamed<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        filter: &Filter,
        request: &Request,
        from: &str,
        to: &str,
    ) -> Result<Vec<T>> {
        let mut result = self.run(operation, filter, request).await?;
        result.rename_column(from, to);
        Ok(result.decode()?)
    }

    pub(crate) async fn count(&self, operation: &'static str, filter: &Filter, request: &Request) -> Result<u64> {
        let plan = plan(filter, request);
        let statement = render(&plan);
        debug!(
            operation,
            base = plan.base.table(),
            joins = plan.joins.len(),
            params = statement.params.len(),
            "executing analyzer count"
        );
        Ok(self.backend.count(&statement).await?)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use serde_json::Value;
    use vantage_query::{MockBackend, QueryResult};

    use super::Analyzer;

    pub fn analyzer(results: Vec<QueryResult>) -> (Analyzer, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::new());
        for result in results {
            backend.push_result(result);
        }
        (Analyzer::new(backend.clone()), backend)
    }

    pub fn rows(names: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult::from_rows(names, rows)
    }
}
