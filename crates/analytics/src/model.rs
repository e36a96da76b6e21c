//! Fact streams
//!
//! Page views, sessions and events are append-only. A session is versioned by
//! sign: when it changes, a retraction of the previous row (`sign = -1`) and
//! the new row (`sign = 1`) are appended together, and every aggregate over
//! the session stream is weighted by `sign`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the three fact streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    PageView,
    Session,
    Event,
}

impl Stream {
    pub const ALL: [Stream; 3] = [Stream::PageView, Stream::Session, Stream::Event];

    /// Table holding the stream
    pub fn table(&self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::Session => "session",
            Self::Event => "event",
        }
    }
}

/// A single page hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    pub client_id: i64,
    pub visitor_id: u64,
    pub session_id: u32,
    pub time: DateTime<Utc>,
    pub path: String,
    pub title: String,
}

/// A visit, stored as signed versions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub client_id: i64,
    pub visitor_id: u64,
    pub session_id: u32,
    /// `1` for a live version, `-1` for the retraction of an older one
    pub sign: i8,
    /// Last seen
    pub time: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub entry_path: String,
    pub entry_title: String,
    pub exit_path: String,
    pub exit_title: String,
    pub page_views: u16,
    pub duration_seconds: u32,
    pub is_bounce: bool,
    pub language: String,
    pub country_code: String,
    pub city: String,
    pub referrer: String,
    pub referrer_name: String,
    pub referrer_icon: String,
    pub os: String,
    pub os_version: String,
    pub browser: String,
    pub browser_version: String,
    pub desktop: bool,
    pub mobile: bool,
    pub screen_class: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
    pub utm_content: String,
    pub utm_term: String,
}

impl Session {
    /// The row cancelling this version
    pub fn retraction(&self) -> Session {
        Session {
            sign: -1,
            ..self.clone()
        }
    }

    /// Rows to append when this session changes into `next`
    pub fn update(&self, next: Session) -> [Session; 2] {
        [self.retraction(), Session { sign: 1, ..next }]
    }

    fn key(&self) -> (i64, u64, u32) {
        (self.client_id, self.visitor_id, self.session_id)
    }
}

/// A custom event with string metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub client_id: i64,
    pub visitor_id: u64,
    pub session_id: u32,
    pub time: DateTime<Utc>,
    pub event_name: String,
    pub event_duration_seconds: u32,
    pub path: String,
    pub title: String,
    /// Parallel to `meta_values`
    pub meta_keys: Vec<String>,
    pub meta_values: Vec<String>,
}

impl Event {
    pub fn meta(&self) -> impl Iterator<Item = (&str, &str)> {
        self.meta_keys
            .iter()
            .zip(self.meta_values.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Collapse a signed session log into its live rows
///
/// Each retraction cancels the most recent matching live version of the same
/// session. Sessions whose versions all cancel out disappear. Output keeps the
/// order in which sessions first appear.
pub fn collapse_sessions(rows: &[Session]) -> Vec<Session> {
    let mut order: Vec<(i64, u64, u32)> = Vec::new();
    let mut live: HashMap<(i64, u64, u32), Vec<Session>> = HashMap::new();

    for row in rows {
        let key = row.key();
        let versions = live.entry(key).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });

        if row.sign > 0 {
            versions.push(row.clone());
        } else if let Some(pos) = versions
            .iter()
            .rposition(|v| Session { sign: -1, ..v.clone() } == *row)
        {
            versions.remove(pos);
        }
    }

    order
        .into_iter()
        .filter_map(|key| live.remove(&key).and_then(|mut versions| versions.pop()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(visitor_id: u64, page_views: u16) -> Session {
        Session {
            client_id: 1,
            visitor_id,
            session_id: 7,
            sign: 1,
            entry_path: "/".into(),
            exit_path: "/".into(),
            page_views,
            is_bounce: page_views == 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_tables() {
        assert_eq!(Stream::PageView.table(), "page_view");
        assert_eq!(Stream::Session.table(), "session");
        assert_eq!(Stream::Event.table(), "event");
    }

    #[test]
    fn test_update_appends_retraction_and_new_version() {
        let first = session(1, 1);
        let next = Session {
            page_views: 2,
            is_bounce: false,
            exit_path: "/pricing".into(),
            ..first.clone()
        };

        let [retraction, insert] = first.update(next);
        assert_eq!(retraction.sign, -1);
        assert_eq!(retraction.page_views, 1);
        assert_eq!(insert.sign, 1);
        assert_eq!(insert.exit_path, "/pricing");

        // Signed sums see exactly the live version.
        let log = [first, retraction, insert];
        let views: i64 = log.iter().map(|s| s.page_views as i64 * s.sign as i64).sum();
        let bounces: i64 = log.iter().map(|s| s.is_bounce as i64 * s.sign as i64).sum();
        assert_eq!(views, 2);
        assert_eq!(bounces, 0);
    }

    #[test]
    fn test_collapse_keeps_latest_live_version() {
        let a1 = session(1, 1);
        let a2 = Session { page_views: 2, is_bounce: false, ..a1.clone() };
        let b1 = session(2, 1);
        let [retract_a1, insert_a2] = a1.update(a2.clone());

        let live = collapse_sessions(&[a1, b1.clone(), retract_a1, insert_a2]);
        assert_eq!(live, vec![a2, b1]);
    }

    #[test]
    fn test_collapse_drops_fully_retracted() {
        let a = session(1, 3);
        let live = collapse_sessions(&[a.clone(), a.retraction()]);
        assert!(live.is_empty());
    }

    #[test]
    fn test_event_meta_lookup() {
        let event = Event {
            event_name: "signup".into(),
            meta_keys: vec!["plan".into(), "seats".into()],
            meta_values: vec!["pro".into(), "5".into()],
            ..Default::default()
        };

        assert_eq!(event.meta_value("seats"), Some("5"));
        assert_eq!(event.meta_value("missing"), None);
        assert_eq!(event.meta().count(), 2);
    }
}
