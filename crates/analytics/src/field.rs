//! Field registry
//!
//! Every attribute the core can filter, group, select or order by is a
//! [`Field`]. Its SQL expression depends on the stream it is evaluated
//! against; a field without an expression for a stream is unavailable there
//! and must be reached through a join.
//!
//! Expressions are templates over the base table alias `t`. The renderer
//! fills in the following tokens:
//!
//! | Token | Replacement |
//! |-------|-------------|
//! | `$tz` | the filter's timezone name |
//! | `$day` | the period bucket of `t.time` (day, week, month or year) |
//! | `$meta_key` | bound placeholder for the event meta key being broken down |
//! | `$metric_value` | the custom metric meta value, cast to its numeric type |
//! | `$time_on_page` | `t.time_on_page`, capped when a cap is configured |
//! | `$total_visitors` / `$total_views` | scalar sub-queries over the time range |
//!
//! Joined columns use fixed aliases: `s` sessions, `pv` page views, `ev`
//! events, `uvd` visitors per period, `v` visitors per path.

use serde::{Deserialize, Serialize};

use crate::model::Stream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    VisitorId,
    SessionId,
    Day,
    Hour,
    Path,
    Title,
    EntryPath,
    EntryTitle,
    ExitPath,
    ExitTitle,
    EventName,
    /// Set of event names per session, only projected by event joins
    EventNames,
    EventMetaKeys,
    EventMetaValue,
    Language,
    Country,
    City,
    Referrer,
    /// Any full referrer of a referrer-name group
    AnyReferrer,
    ReferrerName,
    ReferrerIcon,
    Os,
    OsVersion,
    Browser,
    BrowserVersion,
    ScreenClass,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmContent,
    UtmTerm,
    Visitors,
    Sessions,
    Views,
    Bounces,
    /// Net bounce flag per session, only projected by session joins
    Bounced,
    Entries,
    Exits,
    EventCount,
    TimeOnPage,
    TimeOnPageTotal,
    SessionDuration,
    SessionDurationTotal,
    EventDuration,
    PlatformDesktop,
    PlatformMobile,
    PlatformUnknown,
    CustomMetricAvg,
    CustomMetricTotal,
    TotalVisitors,
    TotalViews,
    PeriodVisitors,
    PathVisitors,
    PathSessions,
}

impl Field {
    pub const ALL: [Field; 54] = [
        Field::VisitorId,
        Field::SessionId,
        Field::Day,
        Field::Hour,
        Field::Path,
        Field::Title,
        Field::EntryPath,
        Field::EntryTitle,
        Field::ExitPath,
        Field::ExitTitle,
        Field::EventName,
        Field::EventNames,
        Field::EventMetaKeys,
        Field::EventMetaValue,
        Field::Language,
        Field::Country,
        Field::City,
        Field::Referrer,
        Field::AnyReferrer,
        Field::ReferrerName,
        Field::ReferrerIcon,
        Field::Os,
        Field::OsVersion,
        Field::Browser,
        Field::BrowserVersion,
        Field::ScreenClass,
        Field::UtmSource,
        Field::UtmMedium,
        Field::UtmCampaign,
        Field::UtmContent,
        Field::UtmTerm,
        Field::Visitors,
        Field::Sessions,
        Field::Views,
        Field::Bounces,
        Field::Bounced,
        Field::Entries,
        Field::Exits,
        Field::EventCount,
        Field::TimeOnPage,
        Field::TimeOnPageTotal,
        Field::SessionDuration,
        Field::SessionDurationTotal,
        Field::EventDuration,
        Field::PlatformDesktop,
        Field::PlatformMobile,
        Field::PlatformUnknown,
        Field::CustomMetricAvg,
        Field::CustomMetricTotal,
        Field::TotalVisitors,
        Field::TotalViews,
        Field::PeriodVisitors,
        Field::PathVisitors,
        Field::PathSessions,
    ];

    /// Output column alias
    pub fn name(self) -> &'static str {
        match self {
            Self::VisitorId => "visitor_id",
            Self::SessionId => "session_id",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Path => "path",
            Self::Title => "title",
            Self::EntryPath => "entry_path",
            Self::EntryTitle => "entry_title",
            Self::ExitPath => "exit_path",
            Self::ExitTitle => "exit_title",
            Self::EventName => "event_name",
            Self::EventNames => "event_names",
            Self::EventMetaKeys => "meta_keys",
            Self::EventMetaValue => "event_meta_value",
            Self::Language => "language",
            Self::Country => "country_code",
            Self::City => "city",
            Self::Referrer => "referrer",
            Self::AnyReferrer => "any_referrer",
            Self::ReferrerName => "referrer_name",
            Self::ReferrerIcon => "icon",
            Self::Os => "os",
            Self::OsVersion => "os_version",
            Self::Browser => "browser",
            Self::BrowserVersion => "browser_version",
            Self::ScreenClass => "screen_class",
            Self::UtmSource => "utm_source",
            Self::UtmMedium => "utm_medium",
            Self::UtmCampaign => "utm_campaign",
            Self::UtmContent => "utm_content",
            Self::UtmTerm => "utm_term",
            Self::Visitors => "visitors",
            Self::Sessions => "sessions",
            Self::Views => "views",
            Self::Bounces => "bounces",
            Self::Bounced => "bounced",
            Self::Entries => "entries",
            Self::Exits => "exits",
            Self::EventCount => "event_count",
            Self::TimeOnPage => "time_on_page",
            Self::TimeOnPageTotal => "time_on_page_total",
            Self::SessionDuration => "session_duration",
            Self::SessionDurationTotal => "session_duration_total",
            Self::EventDuration => "event_duration",
            Self::PlatformDesktop => "platform_desktop",
            Self::PlatformMobile => "platform_mobile",
            Self::PlatformUnknown => "platform_unknown",
            Self::CustomMetricAvg => "custom_metric_avg",
            Self::CustomMetricTotal => "custom_metric_total",
            Self::TotalVisitors => "total_visitors",
            Self::TotalViews => "total_views",
            Self::PeriodVisitors => "period_visitors",
            Self::PathVisitors => "path_visitors",
            Self::PathSessions => "path_sessions",
        }
    }

    /// Look a field up by its output alias
    pub fn from_name(name: &str) -> Option<Field> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Expression template for `stream`, or `None` if unavailable there
    pub fn expr(self, stream: Stream) -> Option<&'static str> {
        use Stream::{Event, PageView, Session};

        let expr = match (self, stream) {
            (Self::VisitorId, _) => "t.visitor_id",
            (Self::SessionId, _) => "t.session_id",
            (Self::Day, _) => "$day",
            (Self::Hour, _) => "toHour(t.time, '$tz')",

            (Self::Path, PageView | Event) => "t.path",
            (Self::Title, PageView | Event) => "t.title",
            (Self::Path | Self::Title, Session) => return None,

            (Self::EntryPath, Session) => "t.entry_path",
            (Self::EntryTitle, Session) => "t.entry_title",
            (Self::ExitPath, Session) => "t.exit_path",
            (Self::ExitTitle, Session) => "t.exit_title",
            (Self::EntryPath | Self::EntryTitle | Self::ExitPath | Self::ExitTitle, _) => {
                return None;
            }

            (Self::EventName, Event) => "t.event_name",
            (Self::EventNames, Event) => "groupUniqArray(t.event_name)",
            (Self::EventMetaKeys, Event) => "groupUniqArrayArray(t.event_meta_keys)",
            (Self::EventMetaValue, Event) => {
                "t.event_meta_values[indexOf(t.event_meta_keys, $meta_key)]"
            }
            (Self::EventName | Self::EventNames | Self::EventMetaKeys | Self::EventMetaValue, _) => {
                return None;
            }

            (Self::Language, Session) => "t.language",
            (Self::Country, Session) => "t.country_code",
            (Self::City, Session) => "t.city",
            (Self::Referrer, Session) => "t.referrer",
            (Self::AnyReferrer, Session) => "any(t.referrer)",
            (Self::ReferrerName, Session) => "t.referrer_name",
            (Self::ReferrerIcon, Session) => "any(t.referrer_icon)",
            (Self::Os, Session) => "t.os",
            (Self::OsVersion, Session) => "t.os_version",
            (Self::Browser, Session) => "t.browser",
            (Self::BrowserVersion, Session) => "t.browser_version",
            (Self::ScreenClass, Session) => "t.screen_class",
            (Self::UtmSource, Session) => "t.utm_source",
            (Self::UtmMedium, Session) => "t.utm_medium",
            (Self::UtmCampaign, Session) => "t.utm_campaign",
            (Self::UtmContent, Session) => "t.utm_content",
            (Self::UtmTerm, Session) => "t.utm_term",
            (
                Self::Language
                | Self::Country
                | Self::City
                | Self::Referrer
                | Self::AnyReferrer
                | Self::ReferrerName
                | Self::ReferrerIcon
                | Self::Os
                | Self::OsVersion
                | Self::Browser
                | Self::BrowserVersion
                | Self::ScreenClass
                | Self::UtmSource
                | Self::UtmMedium
                | Self::UtmCampaign
                | Self::UtmContent
                | Self::UtmTerm,
                _,
            ) => return None,

            (Self::Visitors, _) => "uniq(t.visitor_id)",
            (Self::Sessions, _) => "uniq(t.visitor_id, t.session_id)",

            (Self::Views, PageView) => "count(*)",
            (Self::Views, Session) => "toUInt64(greatest(sum(t.page_views * t.sign), 0))",
            (Self::Views, Event) => return None,

            (Self::Bounces, PageView) => "uniqIf((t.visitor_id, t.session_id), s.bounced > 0)",
            (Self::Bounces, Session) => "toUInt64(greatest(sum(t.is_bounce * t.sign), 0))",
            (Self::Bounces, Event) => return None,
            (Self::Bounced, Session) => "sum(t.is_bounce * t.sign)",
            (Self::Bounced, _) => return None,

            (Self::Entries | Self::Exits, Session) => "toUInt64(greatest(sum(t.sign), 0))",
            (Self::Entries | Self::Exits, _) => return None,

            (Self::EventCount, Event) => "count(*)",
            (Self::EventCount, _) => return None,

            (Self::TimeOnPage, PageView) => {
                "toUInt64(ifNotFinite(avgIf($time_on_page, $time_on_page > 0), 0))"
            }
            (Self::TimeOnPageTotal, PageView) => "toUInt64(sum($time_on_page))",
            (Self::TimeOnPage | Self::TimeOnPageTotal, _) => return None,

            (Self::SessionDuration, Session) => {
                "toUInt64(greatest(ifNotFinite(sum(t.duration_seconds * t.sign) / sum(if(t.duration_seconds > 0, t.sign, 0)), 0), 0))"
            }
            (Self::SessionDurationTotal, Session) => {
                "toUInt64(greatest(sum(t.duration_seconds * t.sign), 0))"
            }
            (Self::SessionDuration | Self::SessionDurationTotal, _) => return None,

            (Self::EventDuration, Event) => {
                "toUInt64(ifNotFinite(avgIf(t.event_duration_seconds, t.event_duration_seconds > 0), 0))"
            }
            (Self::EventDuration, _) => return None,

            (Self::PlatformDesktop, Session) => "uniqIf(t.visitor_id, t.desktop = 1 AND t.mobile = 0)",
            (Self::PlatformMobile, Session) => "uniqIf(t.visitor_id, t.desktop = 0 AND t.mobile = 1)",
            (Self::PlatformUnknown, Session) => "uniqIf(t.visitor_id, t.desktop = 0 AND t.mobile = 0)",
            (Self::PlatformDesktop | Self::PlatformMobile | Self::PlatformUnknown, _) => {
                return None;
            }

            (Self::CustomMetricAvg, Event) => "ifNotFinite(avg($metric_value), 0)",
            (Self::CustomMetricTotal, Event) => "toFloat64(sum($metric_value))",
            (Self::CustomMetricAvg | Self::CustomMetricTotal, _) => return None,

            (Self::TotalVisitors, _) => "$total_visitors",
            (Self::TotalViews, _) => "$total_views",
            (Self::PeriodVisitors, _) => "any(uvd.visitors)",

            (Self::PathVisitors, Session) => "any(v.visitors)",
            (Self::PathSessions, Session) => "any(v.sessions)",
            (Self::PathVisitors | Self::PathSessions, _) => return None,
        };

        Some(expr)
    }

    /// Expression template for `stream`
    ///
    /// # Panics
    ///
    /// Panics if the field is undefined for the stream. Callers resolve
    /// availability first; reaching this is a planner bug.
    pub fn column(self, stream: Stream) -> &'static str {
        match self.expr(stream) {
            Some(expr) => expr,
            None => panic!(
                "field '{}' is undefined for stream '{}'",
                self.name(),
                stream.table()
            ),
        }
    }

    pub fn is_available(self, stream: Stream) -> bool {
        self.expr(stream).is_some()
    }

    /// Entry/exit attribution only exists on sessions
    pub fn is_entry_exit(self) -> bool {
        matches!(
            self,
            Self::EntryPath
                | Self::EntryTitle
                | Self::ExitPath
                | Self::ExitTitle
                | Self::Entries
                | Self::Exits
        )
    }

    /// Fields only the event stream can produce
    pub fn is_event_scoped(self) -> bool {
        matches!(
            self,
            Self::EventName
                | Self::EventMetaKeys
                | Self::EventMetaValue
                | Self::EventCount
                | Self::EventDuration
                | Self::CustomMetricAvg
                | Self::CustomMetricTotal
        )
    }

    /// Fields computed from the windowed time-on-page source
    pub fn needs_time_on_page(self) -> bool {
        matches!(self, Self::TimeOnPage | Self::TimeOnPageTotal)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
