//! Tests for predicate compilation

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone, Utc};
use vantage_query::{ParamValue, Params};

use crate::filter::Filter;
use crate::predicate::{
    Target, event_meta_predicate, search_predicate, time_predicate, values_predicate,
};

fn values(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn compile(target: Target<'_>, input: &[&str]) -> (Option<String>, Params) {
    let mut params = Params::new();
    let sql = values_predicate(target, &values(input), &mut params);
    (sql, params)
}

#[test]
fn test_single_value_is_bound() {
    let (sql, params) = compile(Target::Column("t.referrer"), &["ref1/foo"]);
    assert_eq!(sql.as_deref(), Some("t.referrer = {p0:String}"));
    assert_eq!(params.get(0), Some(&ParamValue::String("ref1/foo".into())));
}

#[test]
fn test_negation_is_complementary() {
    let (include, include_params) = compile(Target::Column("t.referrer"), &["ref1/foo"]);
    let (exclude, exclude_params) = compile(Target::Column("t.referrer"), &["!ref1/foo"]);

    assert_eq!(include.as_deref(), Some("t.referrer = {p0:String}"));
    assert_eq!(exclude.as_deref(), Some("t.referrer != {p0:String}"));
    assert_eq!(include_params, exclude_params);
}

#[test]
fn test_null_sentinel() {
    let (sql, params) = compile(Target::Column("t.city"), &["null"]);
    assert_eq!(sql.as_deref(), Some("t.city = ''"));
    assert!(params.is_empty());

    let (sql, _) = compile(Target::Column("t.city"), &["!NULL"]);
    assert_eq!(sql.as_deref(), Some("t.city != ''"));
}

#[test]
fn test_includes_or_excludes_and() {
    let (sql, params) = compile(
        Target::Column("t.browser"),
        &["Firefox", "Chrome", "!Safari", "!Edge"],
    );
    assert_eq!(
        sql.as_deref(),
        Some(
            "(t.browser = {p0:String} OR t.browser = {p1:String}) \
             AND t.browser != {p2:String} AND t.browser != {p3:String}"
        )
    );
    assert_eq!(params.len(), 4);
}

#[test]
fn test_empty_values_compile_to_nothing() {
    let (sql, params) = compile(Target::Column("t.os"), &[]);
    assert!(sql.is_none());
    assert!(params.is_empty());
}

#[test]
fn test_pattern_uses_match() {
    let (sql, _) = compile(Target::Pattern("t.path"), &["^/blog/.*$", "!^/blog/draft"]);
    assert_eq!(
        sql.as_deref(),
        Some("match(t.path, {p0:String}) AND NOT match(t.path, {p1:String})")
    );
}

#[test]
fn test_array_membership() {
    let (sql, _) = compile(Target::Array("ev.event_names"), &["!signup"]);
    assert_eq!(sql.as_deref(), Some("NOT has(ev.event_names, {p0:String})"));

    let (sql, _) = compile(Target::Array("t.event_meta_keys"), &["null"]);
    assert_eq!(sql.as_deref(), Some("empty(t.event_meta_keys)"));
}

#[test]
fn test_platform_flags() {
    let (sql, params) = compile(Target::Platform, &["desktop", "Mobile"]);
    assert_eq!(
        sql.as_deref(),
        Some("((t.desktop = 1 AND t.mobile = 0) OR (t.desktop = 0 AND t.mobile = 1))")
    );
    assert!(params.is_empty());

    let (sql, _) = compile(Target::Platform, &["!unknown"]);
    assert_eq!(sql.as_deref(), Some("NOT (t.desktop = 0 AND t.mobile = 0)"));
}

#[test]
fn test_platform_ignores_unknown_values() {
    let (sql, _) = compile(Target::Platform, &["tablet"]);
    assert!(sql.is_none());
}

#[test]
fn test_event_meta_pairs() {
    let mut meta = BTreeMap::new();
    meta.insert("plan".to_string(), "pro".to_string());
    meta.insert("trial".to_string(), "!null".to_string());

    let mut params = Params::new();
    let sql = event_meta_predicate(&meta, &mut params);
    assert_eq!(
        sql.as_deref(),
        Some(
            "t.event_meta_values[indexOf(t.event_meta_keys, {p0:String})] = {p1:String} \
             AND t.event_meta_values[indexOf(t.event_meta_keys, {p2:String})] != ''"
        )
    );
    assert_eq!(params.get(0), Some(&ParamValue::String("plan".into())));
    assert_eq!(params.get(1), Some(&ParamValue::String("pro".into())));
    assert_eq!(params.get(2), Some(&ParamValue::String("trial".into())));
}

#[test]
fn test_search() {
    let mut params = Params::new();
    let sql = search_predicate("path", "Blog", &mut params);
    assert_eq!(sql, "positionCaseInsensitiveUTF8(path, {p0:String}) > 0");
    assert_eq!(params.get(0), Some(&ParamValue::String("Blog".into())));
}

#[test]
fn test_time_predicate_calendar_days() {
    let filter = Filter::new(7)
        .with_dates(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
        )
        .with_timezone(chrono_tz::Europe::Berlin);

    let mut params = Params::new();
    let sql = time_predicate(&filter, &mut params);
    assert_eq!(
        sql,
        "t.client_id = {p0:Int64} \
         AND toDate(t.time, 'Europe/Berlin') >= {p1:Date} \
         AND toDate(t.time, 'Europe/Berlin') <= {p2:Date}"
    );
    assert_eq!(params.get(0), Some(&ParamValue::Int64(7)));
    assert_eq!(
        params.get(2),
        Some(&ParamValue::Date(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()))
    );
}

#[test]
fn test_time_predicate_exclusive_instant_end() {
    let from = Utc.with_ymd_and_hms(2024, 3, 14, 10, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2024, 3, 14, 10, 30, 0).unwrap();
    let filter = Filter {
        client_id: 1,
        from: Some(from),
        to: Some(to),
        include_time: true,
        ..Default::default()
    };

    let mut params = Params::new();
    let sql = time_predicate(&filter, &mut params);
    assert_eq!(
        sql,
        "t.client_id = {p0:Int64} AND t.time >= {p1:DateTime('UTC')} AND t.time < {p2:DateTime('UTC')}"
    );
    assert_eq!(params.get(1), Some(&ParamValue::DateTime(from)));
}

#[test]
fn test_time_predicate_without_bounds() {
    let mut params = Params::new();
    let sql = time_predicate(&Filter::new(3), &mut params);
    assert_eq!(sql, "t.client_id = {p0:Int64}");
    assert_eq!(params.len(), 1);
}
