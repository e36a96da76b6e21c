//! Tests for ClickHouse backend

use super::*;
use crate::statement::Params;
use chrono::NaiveDate;
use serde_json::json;

// =============================================================================
// Type Conversion Tests
// =============================================================================

#[test]
fn test_clickhouse_type_integers() {
    assert_eq!(clickhouse_type_to_datatype("Int8"), DataType::Int64);
    assert_eq!(clickhouse_type_to_datatype("Int32"), DataType::Int64);
    assert_eq!(clickhouse_type_to_datatype("UInt8"), DataType::UInt64);
    assert_eq!(clickhouse_type_to_datatype("UInt64"), DataType::UInt64);
}

#[test]
fn test_clickhouse_type_wrappers() {
    assert_eq!(
        clickhouse_type_to_datatype("Nullable(UInt64)"),
        DataType::UInt64
    );
    assert_eq!(
        clickhouse_type_to_datatype("LowCardinality(String)"),
        DataType::String
    );
}

#[test]
fn test_clickhouse_type_dates_and_arrays() {
    assert_eq!(clickhouse_type_to_datatype("Date"), DataType::Date);
    assert_eq!(
        clickhouse_type_to_datatype("DateTime64(9, 'UTC')"),
        DataType::Timestamp
    );
    assert_eq!(
        clickhouse_type_to_datatype("Array(String)"),
        DataType::Array
    );
    assert_eq!(
        clickhouse_type_to_datatype("AggregateFunction(uniq, UInt64)"),
        DataType::Unknown
    );
}

// =============================================================================
// Response Parsing Tests
// =============================================================================

#[test]
fn test_parse_compact_rows() {
    let body = "[\"day\",\"visitors\",\"event_meta_keys\"]\n\
                [\"Date\",\"UInt64\",\"Array(String)\"]\n\
                [\"2024-03-01\",5,[\"plan\"]]\n\
                [\"2024-03-02\",0,[]]\n";

    let result = parse_compact_rows(body, 3).unwrap();

    assert_eq!(result.column_names(), vec!["day", "visitors", "event_meta_keys"]);
    assert_eq!(result.columns[0].data_type, DataType::Date);
    assert_eq!(result.columns[2].data_type, DataType::Array);
    assert_eq!(result.row_count, 2);
    assert_eq!(result.rows[0], vec![json!("2024-03-01"), json!(5), json!(["plan"])]);
    assert_eq!(result.execution_time_ms, 3);
}

#[test]
fn test_parse_compact_rows_empty_body() {
    let result = parse_compact_rows("", 0).unwrap();
    assert!(result.is_empty());
    assert!(result.columns.is_empty());
}

#[test]
fn test_parse_compact_rows_header_only() {
    let result = parse_compact_rows("[\"visitors\"]\n[\"UInt64\"]\n", 0).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.column_names(), vec!["visitors"]);
}

#[test]
fn test_parse_compact_rows_width_mismatch() {
    let body = "[\"a\",\"b\"]\n[\"UInt64\",\"UInt64\"]\n[1]\n";
    assert!(matches!(
        parse_compact_rows(body, 0),
        Err(QueryError::Serialization(_))
    ));
}

#[test]
fn test_parse_compact_rows_invalid_json() {
    assert!(parse_compact_rows("not json", 0).is_err());
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = ClickHouseBackendConfig::default();
    assert_eq!(config.url, "http://localhost:8123");
    assert_eq!(config.database, "default");
    assert!(config.username.is_none());
    assert_eq!(config.timeout, Duration::from_secs(60));
}

#[test]
fn test_config_with_credentials() {
    let config = ClickHouseBackendConfig::new("http://ch:8123", "analytics")
        .with_credentials("reader", "secret")
        .with_timeout(Duration::from_secs(5));

    assert_eq!(config.database, "analytics");
    assert_eq!(config.username.as_deref(), Some("reader"));
    assert_eq!(config.password.as_deref(), Some("secret"));
    assert_eq!(config.timeout, Duration::from_secs(5));
}

#[test]
fn test_config_from_section() {
    let section = ClickHouseConfig {
        database: "stats".into(),
        timeout_secs: 9,
        ..Default::default()
    };
    let config = ClickHouseBackendConfig::from(&section);
    assert_eq!(config.database, "stats");
    assert_eq!(config.timeout, Duration::from_secs(9));
    assert_eq!(config.max_execution_time, 30);
}

// =============================================================================
// Request Building Tests
// =============================================================================

#[test]
fn test_build_url_carries_params() {
    let backend =
        ClickHouseBackend::new(&ClickHouseBackendConfig::new("http://ch:8123", "analytics"))
            .unwrap();

    let mut params = Params::new();
    let client = params.bind(1i64);
    let day = params.bind(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    let path = params.bind("/a b&c");
    let statement = Statement::new(
        format!(
            "SELECT count(*) FROM page_view t WHERE t.client_id = {} AND toDate(t.time) = {} AND t.path = {}",
            client, day, path
        ),
        params,
    );

    let url = backend.build_url(&statement).unwrap();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    assert!(pairs.contains(&("database".into(), "analytics".into())));
    assert!(pairs.contains(&("max_execution_time".into(), "30".into())));
    assert!(pairs.contains(&("param_p0".into(), "1".into())));
    assert!(pairs.contains(&("param_p1".into(), "2024-03-01".into())));
    assert!(pairs.contains(&("param_p2".into(), "/a b&c".into())));
    assert!(!url.as_str().contains("SELECT"));
}

#[test]
fn test_build_url_rejects_invalid_base() {
    let backend =
        ClickHouseBackend::new(&ClickHouseBackendConfig::new("not a url", "default")).unwrap();
    assert!(matches!(
        backend.build_url(&Statement::raw("SELECT 1")),
        Err(QueryError::Config(_))
    ));
}

#[tokio::test]
async fn test_execute_rejects_writes() {
    let backend = ClickHouseBackend::new(&ClickHouseBackendConfig::default()).unwrap();
    let result = backend
        .execute(&Statement::raw("DROP TABLE session"))
        .await;
    assert!(matches!(result, Err(QueryError::InvalidSql(_))));
}

#[test]
fn test_backend_name() {
    let backend = ClickHouseBackend::new(&ClickHouseBackendConfig::default()).unwrap();
    assert_eq!(backend.name(), "clickhouse");
}
