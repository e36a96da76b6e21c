//! Visitor counts, hours, growth and active visitors

use chrono::{Duration, Utc};

use crate::analyzer::Analyzer;
use crate::derived::{growth, growth_u64, relative};
use crate::error::{AnalyticsError, Result};
use crate::field::Field;
use crate::filter::{Dimension, Direction, Filter};
use crate::plan::Request;
use crate::stats::{
    ActiveVisitorStats, Growth, GrowthTotals, TotalVisitorStats, VisitorHourStats, VisitorStats,
};

impl Analyzer {
    /// Visitors on each path within the last `duration`, and their total
    pub async fn active_visitors(
        &self,
        filter: Option<&Filter>,
        duration: Duration,
    ) -> Result<(Vec<ActiveVisitorStats>, u64)> {
        let mut filter = self.prepare(filter);
        filter.from = Some(Utc::now() - duration);
        filter.to = None;
        filter.include_time = true;
        filter.validate();

        let mut group = vec![Field::Path];
        if filter.include_title {
            group.push(Field::Title);
        }
        let mut fields = group.clone();
        fields.push(Field::Visitors);

        let request = Request::new(&fields)
            .group_by(&group)
            .order_by(Field::Visitors, Direction::Desc)
            .order_by(Field::Path, Direction::Asc);
        let stats = self.select("active_visitors", &filter, &request).await?;

        let total = self
            .count("active_visitors", &filter, &Request::new(&[Field::Visitors]))
            .await?;

        Ok((stats, total))
    }

    /// Visitors, sessions, views and bounces per period
    pub async fn visitors(&self, filter: Option<&Filter>) -> Result<Vec<VisitorStats>> {
        let filter = self.prepare(filter);

        let mut fields = vec![
            Field::Day,
            Field::Visitors,
            Field::Sessions,
            Field::Views,
            Field::Bounces,
        ];
        if filter.include_cr {
            fields.push(Field::PeriodVisitors);
        }
        let request = Request::new(&fields)
            .group_by(&[Field::Day])
            .order_by(Field::Day, Direction::Asc)
            .with_fill();

        let mut stats: Vec<VisitorStats> = self.select("visitors", &filter, &request).await?;
        for row in &mut stats {
            row.bounce_rate = relative(row.bounces, row.sessions);
            if filter.include_cr {
                row.cr = relative(row.visitors, row.period_visitors);
            }
        }
        Ok(stats)
    }

    /// Totals over the whole window
    pub async fn total_visitors(&self, filter: Option<&Filter>) -> Result<TotalVisitorStats> {
        let filter = self.prepare(filter);

        let mut fields = vec![Field::Visitors, Field::Sessions, Field::Views, Field::Bounces];
        if filter.include_cr {
            fields.push(Field::TotalVisitors);
        }

        let mut stats: TotalVisitorStats = self
            .select_one("total_visitors", &filter, &Request::new(&fields))
            .await?;
        stats.bounce_rate = relative(stats.bounces, stats.sessions);
        if filter.include_cr {
            stats.cr = relative(stats.visitors, stats.total_visitors);
        }
        Ok(stats)
    }

    /// Visitors per hour of day, every hour present
    pub async fn visitor_hours(&self, filter: Option<&Filter>) -> Result<Vec<VisitorHourStats>> {
        let filter = self.prepare(filter);

        let request = Request::new(&[
            Field::Hour,
            Field::Visitors,
            Field::Sessions,
            Field::Views,
            Field::Bounces,
        ])
        .group_by(&[Field::Hour])
        .order_by(Field::Hour, Direction::Asc)
        .with_fill();

        let mut stats: Vec<VisitorHourStats> =
            self.select("visitor_hours", &filter, &request).await?;
        for row in &mut stats {
            row.bounce_rate = relative(row.bounces, row.sessions);
        }
        Ok(stats)
    }

    /// Change against the window of equal length right before the filter's
    pub async fn growth(&self, filter: Option<&Filter>) -> Result<Growth> {
        let filter = self.prepare(filter);
        let previous = filter
            .previous_period()
            .ok_or(AnalyticsError::NoPeriodOrDay)?;

        let by_page = filter.is_active(Dimension::Path) || filter.is_active(Dimension::PathPattern);
        let time_spent = if by_page {
            Field::TimeOnPageTotal
        } else {
            Field::SessionDurationTotal
        };
        let request = Request::new(&[
            Field::Visitors,
            Field::Sessions,
            Field::Views,
            Field::Bounces,
            time_spent,
        ]);

        let current: GrowthTotals = self.select_one("growth", &filter, &request).await?;
        let previous: GrowthTotals = self.select_one("growth", &previous, &request).await?;

        Ok(Growth {
            visitors_growth: growth_u64(current.visitors, previous.visitors),
            views_growth: growth_u64(current.views, previous.views),
            sessions_growth: growth_u64(current.sessions, previous.sessions),
            bounces_growth: growth(
                relative(current.bounces, current.sessions),
                relative(previous.bounces, previous.sessions),
            ),
            time_spent_growth: growth_u64(current.time_spent, previous.time_spent),
        })
    }
}
