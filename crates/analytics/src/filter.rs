//! Analytics filter
//!
//! A [`Filter`] scopes every analyzer operation: the client, the time window,
//! and any combination of dimension restrictions. Dimension values follow two
//! conventions:
//!
//! - a leading `!` excludes the value (`"!/admin"`)
//! - `null` (any case) stands for "attribute absent", i.e. the empty string
//!
//! Several included values are alternatives; several excluded values must all
//! be absent.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::model::Stream;
use crate::timerange::TimeRange;

/// Time bucket for per-period results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" | "daily" | "d" => Some(Self::Day),
            "week" | "weekly" | "w" => Some(Self::Week),
            "month" | "monthly" | "m" => Some(Self::Month),
            "year" | "yearly" | "y" => Some(Self::Year),
            _ => None,
        }
    }

    /// Bucket expression over `t.time`; weeks start on Monday
    pub fn bucket_expr(&self) -> &'static str {
        match self {
            Self::Day => "toDate(t.time, '$tz')",
            Self::Week => "toStartOfWeek(t.time, 1, '$tz')",
            Self::Month => "toStartOfMonth(t.time, '$tz')",
            Self::Year => "toStartOfYear(t.time, '$tz')",
        }
    }

    /// First day of the bucket containing `date`
    pub fn align(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            Self::Month => date.with_day(1).unwrap_or(date),
            Self::Year => date.with_ordinal(1).unwrap_or(date),
        }
    }

    /// First day of the bucket after the one starting at `date`
    pub fn advance(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date + Duration::days(1),
            Self::Week => date + Duration::days(7),
            Self::Month => date.checked_add_months(Months::new(1)).unwrap_or(date),
            Self::Year => date.checked_add_months(Months::new(12)).unwrap_or(date),
        }
    }

    /// `WITH FILL` step
    pub fn interval(&self) -> &'static str {
        match self {
            Self::Day => "1 DAY",
            Self::Week => "1 WEEK",
            Self::Month => "1 MONTH",
            Self::Year => "1 YEAR",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Caller-supplied ordering for a selected field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: Field,
    pub direction: Direction,
}

impl Sort {
    pub fn asc(field: Field) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: Field) -> Self {
        Self {
            field,
            direction: Direction::Desc,
        }
    }
}

/// Case-insensitive substring search on a grouped field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    pub field: Field,
    pub input: String,
}

/// Numeric interpretation of a custom metric meta value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomMetricType {
    Integer,
    Float,
}

impl CustomMetricType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "integer" | "int" => Some(Self::Integer),
            "float" => Some(Self::Float),
            _ => None,
        }
    }

    /// Conversion applied to the stored string value
    pub fn cast_fn(&self) -> &'static str {
        match self {
            Self::Integer => "toInt64OrZero",
            Self::Float => "toFloat64OrZero",
        }
    }
}

/// A filterable dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Path,
    EntryPath,
    ExitPath,
    PathPattern,
    Language,
    Country,
    City,
    Referrer,
    ReferrerName,
    Os,
    OsVersion,
    Browser,
    BrowserVersion,
    Platform,
    ScreenClass,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmContent,
    UtmTerm,
    EventName,
    EventMetaKey,
    EventMeta,
}

impl Dimension {
    pub const ALL: [Dimension; 23] = [
        Dimension::Path,
        Dimension::EntryPath,
        Dimension::ExitPath,
        Dimension::PathPattern,
        Dimension::Language,
        Dimension::Country,
        Dimension::City,
        Dimension::Referrer,
        Dimension::ReferrerName,
        Dimension::Os,
        Dimension::OsVersion,
        Dimension::Browser,
        Dimension::BrowserVersion,
        Dimension::Platform,
        Dimension::ScreenClass,
        Dimension::UtmSource,
        Dimension::UtmMedium,
        Dimension::UtmCampaign,
        Dimension::UtmContent,
        Dimension::UtmTerm,
        Dimension::EventName,
        Dimension::EventMetaKey,
        Dimension::EventMeta,
    ];

    /// Field compared by the dimension; `None` for the dimensions with
    /// their own predicate shape
    pub fn field(self) -> Option<Field> {
        let field = match self {
            Self::Path | Self::PathPattern => Field::Path,
            Self::EntryPath => Field::EntryPath,
            Self::ExitPath => Field::ExitPath,
            Self::Language => Field::Language,
            Self::Country => Field::Country,
            Self::City => Field::City,
            Self::Referrer => Field::Referrer,
            Self::ReferrerName => Field::ReferrerName,
            Self::Os => Field::Os,
            Self::OsVersion => Field::OsVersion,
            Self::Browser => Field::Browser,
            Self::BrowserVersion => Field::BrowserVersion,
            Self::ScreenClass => Field::ScreenClass,
            Self::UtmSource => Field::UtmSource,
            Self::UtmMedium => Field::UtmMedium,
            Self::UtmCampaign => Field::UtmCampaign,
            Self::UtmContent => Field::UtmContent,
            Self::UtmTerm => Field::UtmTerm,
            Self::EventName => Field::EventName,
            Self::Platform | Self::EventMetaKey | Self::EventMeta => return None,
        };
        Some(field)
    }

    /// Whether the dimension can be tested directly on `stream`
    pub fn available_on(self, stream: Stream) -> bool {
        match self {
            Self::Platform => stream == Stream::Session,
            Self::EventMetaKey | Self::EventMeta => stream == Stream::Event,
            _ => self.field().is_some_and(|f| f.is_available(stream)),
        }
    }

    /// Stream a join goes to when the base cannot test the dimension
    pub fn owner(self) -> Stream {
        match self {
            Self::Path | Self::PathPattern => Stream::PageView,
            Self::EventName | Self::EventMetaKey | Self::EventMeta => Stream::Event,
            _ => Stream::Session,
        }
    }
}

/// Query scope for analyzer operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub client_id: i64,
    /// Defaults to UTC
    pub timezone: Option<Tz>,
    /// Start, inclusive
    pub from: Option<DateTime<Utc>>,
    /// End; inclusive day, or exclusive instant with `include_time`
    pub to: Option<DateTime<Utc>>,
    pub period: Period,

    pub path: Vec<String>,
    pub entry_path: Vec<String>,
    pub exit_path: Vec<String>,
    /// Regular expressions over the path
    pub path_pattern: Vec<String>,
    pub language: Vec<String>,
    pub country: Vec<String>,
    pub city: Vec<String>,
    pub referrer: Vec<String>,
    pub referrer_name: Vec<String>,
    pub os: Vec<String>,
    pub os_version: Vec<String>,
    pub browser: Vec<String>,
    pub browser_version: Vec<String>,
    /// `desktop`, `mobile` or `unknown`
    pub platform: Vec<String>,
    pub screen_class: Vec<String>,
    pub utm_source: Vec<String>,
    pub utm_medium: Vec<String>,
    pub utm_campaign: Vec<String>,
    pub utm_content: Vec<String>,
    pub utm_term: Vec<String>,
    pub event_name: Vec<String>,
    pub event_meta_key: Vec<String>,
    pub event_meta: BTreeMap<String, String>,

    pub search: Vec<Search>,
    pub sort: Vec<Sort>,
    /// 0 = none
    pub offset: i64,
    /// 0 = unbounded
    pub limit: i64,

    pub custom_metric_key: String,
    pub custom_metric_type: Option<CustomMetricType>,

    /// Keep exact instants instead of calendar days
    pub include_time: bool,
    pub include_title: bool,
    pub include_time_on_page: bool,
    pub include_cr: bool,
    /// Cap for a single time-on-page gap; 0 = uncapped
    pub max_time_on_page_seconds: u32,
}

impl Filter {
    /// Create an all-time filter for a client
    pub fn new(client_id: i64) -> Self {
        Self {
            client_id,
            ..Default::default()
        }
    }

    /// Restrict to calendar days `from..=to`
    pub fn with_dates(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(midnight(from));
        self.to = Some(midnight(to));
        self
    }

    /// Restrict to a single calendar day
    pub fn with_day(self, day: NaiveDate) -> Self {
        self.with_dates(day, day)
    }

    pub fn with_time_range(self, range: &TimeRange) -> Self {
        self.with_dates(range.from, range.to)
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone.unwrap_or(Tz::UTC)
    }

    /// Normalize in place; applying it twice changes nothing
    pub fn validate(&mut self) {
        self.validate_at(Utc::now());
    }

    pub(crate) fn validate_at(&mut self, now: DateTime<Utc>) {
        let tz = self.timezone();
        self.timezone = Some(tz);

        if !self.include_time {
            self.from = self.from.map(truncate_to_day);
            self.to = self.to.map(truncate_to_day);
        }

        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                self.from = Some(to);
                self.to = Some(from);
            }
        }

        let tomorrow = now.with_timezone(&tz).date_naive() + Duration::days(1);
        let limit = if self.include_time {
            tz.from_local_datetime(&tomorrow.and_time(NaiveTime::MIN))
                .earliest()
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|| midnight(tomorrow))
        } else {
            midnight(tomorrow)
        };
        if let Some(to) = self.to {
            if to > limit {
                self.to = Some(limit);
            }
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                self.from = Some(to);
            }
        }

        if !self.path.is_empty() && !self.path_pattern.is_empty() {
            self.path_pattern.clear();
        }

        for dimension in Dimension::ALL {
            if let Some(values) = self.values_mut(dimension) {
                dedup(values);
            }
        }

        self.search.retain_mut(|search| {
            search.input = search.input.trim().to_string();
            !search.input.is_empty()
        });
        let mut seen = HashSet::new();
        self.sort.retain(|sort| seen.insert(sort.field));

        self.offset = self.offset.max(0);
        self.limit = self.limit.max(0);

        self.custom_metric_key = self.custom_metric_key.trim().to_string();
        if self.custom_metric_key.is_empty() {
            self.custom_metric_type = None;
        }
    }

    /// Values of a multi-value dimension (`EventMeta` has none, see `event_meta`)
    pub fn values(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Path => &self.path,
            Dimension::EntryPath => &self.entry_path,
            Dimension::ExitPath => &self.exit_path,
            Dimension::PathPattern => &self.path_pattern,
            Dimension::Language => &self.language,
            Dimension::Country => &self.country,
            Dimension::City => &self.city,
            Dimension::Referrer => &self.referrer,
            Dimension::ReferrerName => &self.referrer_name,
            Dimension::Os => &self.os,
            Dimension::OsVersion => &self.os_version,
            Dimension::Browser => &self.browser,
            Dimension::BrowserVersion => &self.browser_version,
            Dimension::Platform => &self.platform,
            Dimension::ScreenClass => &self.screen_class,
            Dimension::UtmSource => &self.utm_source,
            Dimension::UtmMedium => &self.utm_medium,
            Dimension::UtmCampaign => &self.utm_campaign,
            Dimension::UtmContent => &self.utm_content,
            Dimension::UtmTerm => &self.utm_term,
            Dimension::EventName => &self.event_name,
            Dimension::EventMetaKey => &self.event_meta_key,
            Dimension::EventMeta => &[],
        }
    }

    pub fn values_mut(&mut self, dimension: Dimension) -> Option<&mut Vec<String>> {
        let values = match dimension {
            Dimension::Path => &mut self.path,
            Dimension::EntryPath => &mut self.entry_path,
            Dimension::ExitPath => &mut self.exit_path,
            Dimension::PathPattern => &mut self.path_pattern,
            Dimension::Language => &mut self.language,
            Dimension::Country => &mut self.country,
            Dimension::City => &mut self.city,
            Dimension::Referrer => &mut self.referrer,
            Dimension::ReferrerName => &mut self.referrer_name,
            Dimension::Os => &mut self.os,
            Dimension::OsVersion => &mut self.os_version,
            Dimension::Browser => &mut self.browser,
            Dimension::BrowserVersion => &mut self.browser_version,
            Dimension::Platform => &mut self.platform,
            Dimension::ScreenClass => &mut self.screen_class,
            Dimension::UtmSource => &mut self.utm_source,
            Dimension::UtmMedium => &mut self.utm_medium,
            Dimension::UtmCampaign => &mut self.utm_campaign,
            Dimension::UtmContent => &mut self.utm_content,
            Dimension::UtmTerm => &mut self.utm_term,
            Dimension::EventName => &mut self.event_name,
            Dimension::EventMetaKey => &mut self.event_meta_key,
            Dimension::EventMeta => return None,
        };
        Some(values)
    }

    pub fn is_active(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::EventMeta => !self.event_meta.is_empty(),
            _ => !self.values(dimension).is_empty(),
        }
    }

    pub fn clear(&mut self, dimension: Dimension) {
        if dimension == Dimension::EventMeta {
            self.event_meta.clear();
        } else if let Some(values) = self.values_mut(dimension) {
            values.clear();
        }
    }

    /// Dimensions with at least one value, in declaration order
    pub fn active_dimensions(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.is_active(*d))
            .collect()
    }

    /// Copy keeping only `keep`, without search, sort or paging
    pub fn scoped_to(&self, keep: &[Dimension]) -> Filter {
        let mut filter = self.clone();
        for dimension in Dimension::ALL {
            if !keep.contains(&dimension) {
                filter.clear(dimension);
            }
        }
        filter.search.clear();
        filter.sort.clear();
        filter.offset = 0;
        filter.limit = 0;
        filter
    }

    /// Copy keeping only client, timezone, window and period
    pub fn time_only(&self) -> Filter {
        Filter {
            client_id: self.client_id,
            timezone: self.timezone,
            from: self.from,
            to: self.to,
            period: self.period,
            include_time: self.include_time,
            max_time_on_page_seconds: self.max_time_on_page_seconds,
            ..Default::default()
        }
    }

    /// The same filter shifted to the window right before this one
    ///
    /// A single day moves back one day; a calendar range moves back by its
    /// own length. `None` without both bounds.
    pub fn previous_period(&self) -> Option<Filter> {
        let (from, to) = (self.from?, self.to?);
        let mut previous = self.clone();

        if self.include_time {
            let length = to - from;
            previous.from = Some(from - length);
            previous.to = Some(from);
        } else {
            let range = TimeRange {
                from: from.date_naive(),
                to: to.date_naive(),
            };
            let range = if range.days() == 1 {
                range.previous_day()
            } else {
                range.previous_period()
            };
            previous.from = Some(midnight(range.from));
            previous.to = Some(midnight(range.to));
        }

        Some(previous)
    }

    /// Custom metric key and type, when both are set
    pub fn custom_metric(&self) -> Option<(&str, CustomMetricType)> {
        match self.custom_metric_type {
            Some(kind) if !self.custom_metric_key.is_empty() => {
                Some((self.custom_metric_key.as_str(), kind))
            }
            _ => None,
        }
    }

    /// Restricted to (or away from) particular events
    pub fn is_event_filtered(&self) -> bool {
        !self.event_name.is_empty()
    }

    /// Any event name value is an exclusion
    pub fn excludes_event_names(&self) -> bool {
        self.event_name.iter().any(|v| v.starts_with('!'))
    }

    /// Meta restrictions without an event name to attach them to
    pub fn has_orphan_event_meta(&self) -> bool {
        !self.is_event_filtered() && (!self.event_meta_key.is_empty() || !self.event_meta.is_empty())
    }
}

pub(crate) fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn truncate_to_day(time: DateTime<Utc>) -> DateTime<Utc> {
    midnight(time.date_naive())
}

fn dedup(values: &mut Vec<String>) {
    let mut seen = HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}
