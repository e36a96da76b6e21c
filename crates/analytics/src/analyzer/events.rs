//! Events, meta breakdowns and custom metrics

use tracing::debug;

use crate::analyzer::Analyzer;
use crate::derived::relative;
use crate::error::Result;
use crate::field::Field;
use crate::filter::{Direction, Filter};
use crate::plan::Request;
use crate::stats::{CustomMetricStats, EventStats};

impl Analyzer {
    /// Count, visitors and duration per event name
    pub async fn events(&self, filter: Option<&Filter>) -> Result<Vec<EventStats>> {
        let filter = self.prepare(filter);

        let request = Request::new(&[
            Field::EventName,
            Field::EventCount,
            Field::Visitors,
            Field::EventDuration,
            Field::EventMetaKeys,
            Field::TotalVisitors,
        ])
        .group_by(&[Field::EventName])
        .order_by(Field::Visitors, Direction::Desc)
        .order_by(Field::EventName, Direction::Asc);

        let mut stats: Vec<EventStats> = self.select("events", &filter, &request).await?;
        for row in &mut stats {
            row.cr = relative(row.visitors, row.total_visitors);
        }
        Ok(stats)
    }

    /// Per value of the first filtered meta key
    ///
    /// Empty unless both an event name and a meta key are filtered.
    pub async fn event_breakdown(&self, filter: Option<&Filter>) -> Result<Vec<EventStats>> {
        let filter = self.prepare(filter);
        if !filter.is_event_filtered() || filter.event_meta_key.is_empty() {
            debug!("event breakdown without event name or meta key, returning no rows");
            return Ok(Vec::new());
        }

        let request = Request::new(&[
            Field::EventName,
            Field::EventMetaValue,
            Field::EventCount,
            Field::Visitors,
            Field::EventDuration,
            Field::TotalVisitors,
        ])
        .group_by(&[Field::EventName, Field::EventMetaValue])
        .order_by(Field::Visitors, Direction::Desc)
        .order_by(Field::EventMetaValue, Direction::Asc);

        let mut stats: Vec<EventStats> = self.select("event_breakdown", &filter, &request).await?;
        for row in &mut stats {
            row.cr = relative(row.visitors, row.total_visitors);
        }
        Ok(stats)
    }

    /// Average and total of a numeric meta value per period
    ///
    /// Empty unless an event name, a custom metric key and its type are set.
    pub async fn custom_metric(&self, filter: Option<&Filter>) -> Result<Vec<CustomMetricStats>> {
        let mut filter = self.prepare(filter);
        let key = match filter.custom_metric() {
            Some((key, _)) if filter.is_event_filtered() => key.to_string(),
            _ => {
                debug!("custom metric without event name, key or type, returning no rows");
                return Ok(Vec::new());
            }
        };
        filter.event_meta_key = vec![key];

        let request = Request::new(&[Field::Day, Field::CustomMetricAvg, Field::CustomMetricTotal])
            .group_by(&[Field::Day])
            .order_by(Field::Day, Direction::Asc)
            .with_fill();

        self.select("custom_metric", &filter, &request).await
    }
}
