//! Time range parsing and calculations
//!
//! Supports predefined ranges (`today`, `mtd`, `ytd`), relative ranges
//! (`7d`, `2w`) and custom date ranges, all as calendar days.

use chrono::{Datelike, Duration, NaiveDate, Utc};

use crate::error::{AnalyticsError, Result};

/// An inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if to < from {
            return Err(AnalyticsError::InvalidTimeRange(
                "end must not be before start".to_string(),
            ));
        }
        Ok(Self { from, to })
    }

    /// Parse a time range string relative to today (UTC)
    ///
    /// Supported formats:
    /// - Relative: `24h`, `7d`, `30d`, `2w`, `3m`, `1y`
    /// - Predefined: `today`, `yesterday`, `wtd`, `mtd`, `ytd`
    /// - Custom: `2024-01-01,2024-01-31`
    pub fn parse(s: &str) -> Result<Self> {
        Self::parse_at(s, Utc::now().date_naive())
    }

    /// Parse relative to a fixed `today`
    pub fn parse_at(s: &str, today: NaiveDate) -> Result<Self> {
        let s = s.trim().to_lowercase();

        if let Some(range) = Self::parse_predefined(&s, today) {
            return Ok(range);
        }

        if let Some(range) = Self::parse_relative(&s, today) {
            return Ok(range);
        }

        if let Some(range) = Self::parse_custom(&s)? {
            return Ok(range);
        }

        Err(AnalyticsError::InvalidTimeRange(format!(
            "unknown time range format: {}",
            s
        )))
    }

    /// The window of equal length ending the day before this one
    pub fn previous_period(&self) -> Self {
        let length = self.to - self.from;
        let to = self.from - Duration::days(1);
        Self {
            from: to - length,
            to,
        }
    }

    /// The same window moved back by one day
    pub fn previous_day(&self) -> Self {
        Self {
            from: self.from - Duration::days(1),
            to: self.to - Duration::days(1),
        }
    }

    /// Number of calendar days (inclusive)
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

impl TimeRange {
    fn parse_predefined(s: &str, today: NaiveDate) -> Option<Self> {
        let from = match s {
            "today" => today,
            "yesterday" => {
                let day = today - Duration::days(1);
                return Some(Self { from: day, to: day });
            }
            "wtd" => today - Duration::days(i64::from(today.weekday().num_days_from_monday())),
            "mtd" => today.with_day(1)?,
            "ytd" => today.with_ordinal(1)?,
            _ => return None,
        };
        Some(Self { from, to: today })
    }

    fn parse_relative(s: &str, today: NaiveDate) -> Option<Self> {
        let (num, unit) = extract_num_unit(s)?;

        // 7d is today plus the six days before it
        let back = match unit {
            'h' => Duration::hours(num),
            'd' => Duration::days(num - 1),
            'w' => Duration::weeks(num) - Duration::days(1),
            'm' => Duration::days(num * 30 - 1),
            'y' => Duration::days(num * 365 - 1),
            _ => return None,
        };

        let from = (today.and_hms_opt(0, 0, 0)? - back).date();
        Some(Self { from, to: today })
    }

    fn parse_custom(s: &str) -> Result<Option<Self>> {
        let Some((from, to)) = s.split_once(',') else {
            return Ok(None);
        };

        let from = parse_date(from.trim())?;
        let to = parse_date(to.trim())?;

        Self::new(from, to).map(Some)
    }
}

fn extract_num_unit(s: &str) -> Option<(i64, char)> {
    let unit = s.chars().last()?;
    if !unit.is_ascii_alphabetic() {
        return None;
    }

    let num: i64 = s[..s.len() - 1].parse().ok()?;
    if num <= 0 {
        return None;
    }

    Some((num, unit))
}

/// Parse a `YYYY-MM-DD` date
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        AnalyticsError::InvalidTimeRange(format!("invalid date format: {} (use YYYY-MM-DD)", s))
    })
}
