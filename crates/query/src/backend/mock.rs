//! In-memory backend
//!
//! Records every statement it receives and replays queued results in order.
//! Once the queue is drained it answers with empty results.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::{QueryBackend, validate_sql};
use crate::error::QueryError;
use crate::result::QueryResult;
use crate::statement::Statement;

#[derive(Debug, Default)]
pub struct MockBackend {
    responses: Mutex<VecDeque<Result<QueryResult, QueryError>>>,
    statements: Mutex<Vec<Statement>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for the next `execute`
    pub fn with_result(self, result: QueryResult) -> Self {
        self.push_result(result);
        self
    }

    /// Queue an error for the next `execute`
    pub fn with_error(self, error: QueryError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    pub fn push_result(&self, result: QueryResult) {
        self.responses.lock().push_back(Ok(result));
    }

    /// Statements executed so far, oldest first
    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().clone()
    }

    pub fn executed(&self) -> usize {
        self.statements.lock().len()
    }
}

#[async_trait]
impl QueryBackend for MockBackend {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult, QueryError> {
        validate_sql(&statement.sql)?;
        self.statements.lock().push(statement.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResult::empty()))
    }

    async fn health_check(&self) -> Result<(), QueryError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
