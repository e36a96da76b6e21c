//! Query backend trait and implementations

pub mod clickhouse;
pub mod mock;

use async_trait::async_trait;

use crate::error::QueryError;
use crate::result::QueryResult;
use crate::statement::Statement;

/// Query backend trait
///
/// The analytics core only needs "run this parameterized SELECT and give me
/// rows"; anything that can do that is a backend.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Execute a parameterized statement
    async fn execute(&self, statement: &Statement) -> Result<QueryResult, QueryError>;

    /// Execute a statement returning a single count
    ///
    /// The first cell of the first row is interpreted as an unsigned
    /// integer; an empty result counts as zero.
    async fn count(&self, statement: &Statement) -> Result<u64, QueryError> {
        Ok(self.execute(statement).await?.first_u64())
    }

    /// Check if backend is available
    async fn health_check(&self) -> Result<(), QueryError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Validate SQL query - only allow SELECT and WITH (CTE) queries
///
/// The analytics core only renders reads; anything else reaching a backend
/// is a bug.
pub fn validate_sql(sql: &str) -> Result<(), QueryError> {
    let trimmed = sql.trim();
    let upper = trimmed.to_uppercase();

    if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
        return Err(QueryError::InvalidSql(
            "only SELECT and WITH queries are allowed".to_string(),
        ));
    }

    if upper.contains(" INTO ") {
        return Err(QueryError::InvalidSql(
            "SELECT INTO is not allowed".to_string(),
        ));
    }

    // Allow trailing semicolon
    if trimmed.contains(';') && !trimmed.ends_with(';') {
        return Err(QueryError::InvalidSql(
            "multiple statements not allowed".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sql_select() {
        assert!(validate_sql("SELECT uniq(visitor_id) FROM session").is_ok());
        assert!(validate_sql("  select count(*) from page_view  ").is_ok());
    }

    #[test]
    fn test_validate_sql_with() {
        assert!(validate_sql("WITH x AS (SELECT 1) SELECT * FROM x").is_ok());
    }

    #[test]
    fn test_validate_sql_invalid() {
        assert!(validate_sql("INSERT INTO session VALUES (1)").is_err());
        assert!(validate_sql("ALTER TABLE session DELETE WHERE 1").is_err());
        assert!(validate_sql("DROP TABLE event").is_err());
        assert!(validate_sql("SELECT * INTO backup FROM event").is_err());
    }

    #[test]
    fn test_validate_sql_multiple_statements() {
        assert!(validate_sql("SELECT 1; DROP TABLE event").is_err());
        assert!(validate_sql("SELECT 1;").is_ok());
    }

    #[test]
    fn test_validate_sql_subqueries_ok() {
        assert!(
            validate_sql(
                "SELECT uniq(t.visitor_id) FROM session t \
                 INNER JOIN (SELECT visitor_id, session_id FROM page_view t) pv \
                 ON pv.visitor_id = t.visitor_id"
            )
            .is_ok()
        );
    }
}
