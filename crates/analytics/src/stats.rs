//! Result rows
//!
//! Rows decode from query columns named after [`crate::field::Field::name`].
//! Denominators needed only to derive ratios are decoded but not serialized.
//! Ratio fields (`relative_*`, `*_rate`, `cr`) are filled in by the analyzer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Visitors per period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorStats {
    pub day: Option<NaiveDate>,
    pub visitors: u64,
    pub sessions: u64,
    pub views: u64,
    pub bounces: u64,
    pub bounce_rate: f64,
    #[serde(skip_serializing)]
    pub period_visitors: u64,
    /// Conversion rate against all visitors of the period
    pub cr: f64,
}

/// Aggregate over the whole window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalVisitorStats {
    pub visitors: u64,
    pub sessions: u64,
    pub views: u64,
    pub bounces: u64,
    pub bounce_rate: f64,
    #[serde(skip_serializing)]
    pub total_visitors: u64,
    pub cr: f64,
}

/// Visitors per hour of day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorHourStats {
    pub hour: u8,
    pub visitors: u64,
    pub sessions: u64,
    pub views: u64,
    pub bounces: u64,
    pub bounce_rate: f64,
}

/// Change against the previous window of the same length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Growth {
    pub visitors_growth: f64,
    pub views_growth: f64,
    pub sessions_growth: f64,
    pub bounces_growth: f64,
    pub time_spent_growth: f64,
}

/// Totals compared by growth
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct GrowthTotals {
    pub visitors: u64,
    pub sessions: u64,
    pub views: u64,
    pub bounces: u64,
    #[serde(alias = "session_duration_total", alias = "time_on_page_total")]
    pub time_spent: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveVisitorStats {
    pub path: String,
    pub title: String,
    pub visitors: u64,
}

/// Per path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageStats {
    pub path: String,
    pub title: String,
    pub visitors: u64,
    pub sessions: u64,
    pub relative_visitors: f64,
    pub views: u64,
    pub relative_views: f64,
    pub bounces: u64,
    pub bounce_rate: f64,
    #[serde(alias = "time_on_page")]
    pub average_time_spent_seconds: u64,
    #[serde(skip_serializing)]
    pub total_visitors: u64,
    #[serde(skip_serializing)]
    pub total_views: u64,
}

/// Per entry path; `path_visitors`/`path_sessions` count every visit of the path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryStats {
    #[serde(alias = "entry_path")]
    pub path: String,
    #[serde(alias = "entry_title")]
    pub title: String,
    pub visitors: u64,
    pub sessions: u64,
    pub path_visitors: u64,
    pub path_sessions: u64,
    pub entries: u64,
    /// Entries over sessions that saw the path
    pub entry_rate: f64,
    pub average_time_spent_seconds: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitStats {
    #[serde(alias = "exit_path")]
    pub path: String,
    #[serde(alias = "exit_title")]
    pub title: String,
    pub visitors: u64,
    pub sessions: u64,
    pub path_visitors: u64,
    pub path_sessions: u64,
    pub exits: u64,
    pub exit_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConversionsStats {
    pub visitors: u64,
    pub views: u64,
    pub cr: f64,
    #[serde(skip_serializing)]
    pub total_visitors: u64,
}

/// Per event name, or per meta value in a breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStats {
    #[serde(alias = "event_name")]
    pub name: String,
    #[serde(alias = "event_count")]
    pub count: u64,
    pub visitors: u64,
    pub cr: f64,
    #[serde(alias = "event_duration")]
    pub average_duration_seconds: u64,
    pub meta_keys: Vec<String>,
    #[serde(alias = "event_meta_value")]
    pub meta_value: String,
    #[serde(skip_serializing)]
    pub total_visitors: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferrerStats {
    #[serde(alias = "any_referrer")]
    pub referrer: String,
    pub referrer_name: String,
    #[serde(alias = "icon")]
    pub referrer_icon: String,
    pub visitors: u64,
    pub sessions: u64,
    pub relative_visitors: f64,
    pub bounces: u64,
    pub bounce_rate: f64,
    #[serde(skip_serializing)]
    pub total_visitors: u64,
}

/// Unique visitors by device class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformStats {
    pub platform_desktop: u64,
    pub platform_mobile: u64,
    pub platform_unknown: u64,
    pub relative_platform_desktop: f64,
    pub relative_platform_mobile: f64,
    pub relative_platform_unknown: f64,
}

/// One value of a session attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeStats {
    pub value: String,
    pub visitors: u64,
    pub relative_visitors: f64,
    #[serde(skip_serializing)]
    pub total_visitors: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsVersionStats {
    pub os: String,
    pub os_version: String,
    pub visitors: u64,
    pub relative_visitors: f64,
    #[serde(skip_serializing)]
    pub total_visitors: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserVersionStats {
    pub browser: String,
    pub browser_version: String,
    pub visitors: u64,
    pub relative_visitors: f64,
    #[serde(skip_serializing)]
    pub total_visitors: u64,
}

/// Average session duration or time on page per period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSpentStats {
    pub day: Option<NaiveDate>,
    #[serde(alias = "session_duration", alias = "time_on_page")]
    pub average_time_spent_seconds: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomMetricStats {
    pub day: Option<NaiveDate>,
    pub custom_metric_avg: f64,
    pub custom_metric_total: f64,
}
