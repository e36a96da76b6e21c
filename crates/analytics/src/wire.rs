//! Filter wire shape
//!
//! Parses HTTP query parameters into a [`Filter`]. Dimensions accept repeated
//! parameters, comma-joined values, or both:
//!
//! ```text
//! ?client_id=1&range=7d&tz=Europe/Berlin&path=/,/pricing&browser=!Safari
//! &search=path:blog&sort=visitors:desc&event_name=signup&event_meta=plan:pro
//! ```
//!
//! Unknown parameters are ignored.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;
use url::form_urlencoded;

use crate::error::{AnalyticsError, Result};
use crate::field::Field;
use crate::filter::{CustomMetricType, Dimension, Direction, Filter, Period, Search, Sort, midnight};
use crate::timerange::{TimeRange, parse_date};

impl Filter {
    /// Parse a query string, with or without the leading `?`
    pub fn from_query(query: &str) -> Result<Filter> {
        let mut filter = Filter::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                "client_id" => filter.client_id = parse_number("client_id", value)?,
                "tz" | "timezone" => {
                    let tz = value.parse::<Tz>().map_err(|_| {
                        AnalyticsError::InvalidFilter(format!("unknown timezone: {}", value))
                    })?;
                    filter.timezone = Some(tz);
                }
                "from" => filter.from = Some(parse_instant(value)?),
                "to" => filter.to = Some(parse_instant(value)?),
                "range" => {
                    let range = TimeRange::parse(value)?;
                    filter.from = Some(midnight(range.from));
                    filter.to = Some(midnight(range.to));
                }
                "period" => {
                    filter.period = Period::parse(value).ok_or_else(|| {
                        AnalyticsError::InvalidFilter(format!("unknown period: {}", value))
                    })?;
                }
                "search" => {
                    let (name, input) = split_pair("search", value)?;
                    filter.search.push(Search {
                        field: parse_field(name)?,
                        input: input.to_string(),
                    });
                }
                "sort" => {
                    let (name, direction) = match value.split_once(':') {
                        Some((name, direction)) => (name, direction),
                        None => (value, "asc"),
                    };
                    let direction = Direction::parse(direction).ok_or_else(|| {
                        AnalyticsError::InvalidFilter(format!("unknown sort direction: {}", direction))
                    })?;
                    filter.sort.push(Sort {
                        field: parse_field(name)?,
                        direction,
                    });
                }
                "event_meta" => {
                    let (meta_key, meta_value) = split_pair("event_meta", value)?;
                    filter
                        .event_meta
                        .insert(meta_key.to_string(), meta_value.to_string());
                }
                "offset" => filter.offset = parse_number("offset", value)?,
                "limit" => filter.limit = parse_number("limit", value)?,
                "max_time_on_page_seconds" => {
                    filter.max_time_on_page_seconds = parse_number("max_time_on_page_seconds", value)?;
                }
                "custom_metric_key" => filter.custom_metric_key = value.to_string(),
                "custom_metric_type" => {
                    filter.custom_metric_type = Some(CustomMetricType::parse(value).ok_or_else(|| {
                        AnalyticsError::InvalidFilter(format!("unknown custom metric type: {}", value))
                    })?);
                }
                "include_time" => filter.include_time = parse_bool("include_time", value)?,
                "include_title" => filter.include_title = parse_bool("include_title", value)?,
                "include_time_on_page" => {
                    filter.include_time_on_page = parse_bool("include_time_on_page", value)?;
                }
                "include_cr" => filter.include_cr = parse_bool("include_cr", value)?,
                other => match dimension_for_key(other).and_then(|d| filter.values_mut(d)) {
                    Some(values) => values.extend(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|v| !v.is_empty())
                            .map(String::from),
                    ),
                    None => warn!(parameter = other, "ignoring unknown filter parameter"),
                },
            }
        }

        Ok(filter)
    }
}

/// Query parameter naming a dimension
pub fn dimension_key(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Path => "path",
        Dimension::EntryPath => "entry_path",
        Dimension::ExitPath => "exit_path",
        Dimension::PathPattern => "path_pattern",
        Dimension::Language => "language",
        Dimension::Country => "country",
        Dimension::City => "city",
        Dimension::Referrer => "referrer",
        Dimension::ReferrerName => "referrer_name",
        Dimension::Os => "os",
        Dimension::OsVersion => "os_version",
        Dimension::Browser => "browser",
        Dimension::BrowserVersion => "browser_version",
        Dimension::Platform => "platform",
        Dimension::ScreenClass => "screen_class",
        Dimension::UtmSource => "utm_source",
        Dimension::UtmMedium => "utm_medium",
        Dimension::UtmCampaign => "utm_campaign",
        Dimension::UtmContent => "utm_content",
        Dimension::UtmTerm => "utm_term",
        Dimension::EventName => "event_name",
        Dimension::EventMetaKey => "event_meta_key",
        Dimension::EventMeta => "event_meta",
    }
}

fn dimension_for_key(key: &str) -> Option<Dimension> {
    Dimension::ALL.into_iter().find(|d| dimension_key(*d) == key)
}

/// A field by output alias or by dimension parameter name
fn parse_field(name: &str) -> Result<Field> {
    Field::from_name(name)
        .or_else(|| dimension_for_key(name).and_then(Dimension::field))
        .ok_or_else(|| AnalyticsError::InvalidFilter(format!("unknown field: {}", name)))
}

fn split_pair<'a>(parameter: &str, value: &'a str) -> Result<(&'a str, &'a str)> {
    match value.split_once(':') {
        Some((key, rest)) if !key.trim().is_empty() => Ok((key.trim(), rest)),
        _ => Err(AnalyticsError::InvalidFilter(format!(
            "{} must be key:value, got '{}'",
            parameter, value
        ))),
    }
}

/// `YYYY-MM-DD` or RFC 3339
fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }
    parse_date(value).map(midnight)
}

fn parse_number<T: std::str::FromStr>(parameter: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        AnalyticsError::InvalidFilter(format!("{} must be a number, got '{}'", parameter, value))
    })
}

fn parse_bool(parameter: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "" | "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AnalyticsError::InvalidFilter(format!(
            "{} must be a boolean, got '{}'",
            parameter, value
        ))),
    }
}
