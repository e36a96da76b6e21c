//! Session duration and time on page

use crate::analyzer::Analyzer;
use crate::error::Result;
use crate::field::Field;
use crate::filter::{Direction, Filter};
use crate::plan::Request;
use crate::stats::TimeSpentStats;

impl Analyzer {
    /// Average session duration per period, bounced sessions excluded
    pub async fn avg_session_duration(&self, filter: Option<&Filter>) -> Result<Vec<TimeSpentStats>> {
        self.time_spent("avg_session_duration", filter, Field::SessionDuration)
            .await
    }

    /// Average time between consecutive page views per period
    pub async fn avg_time_on_page(&self, filter: Option<&Filter>) -> Result<Vec<TimeSpentStats>> {
        self.time_spent("avg_time_on_page", filter, Field::TimeOnPage)
            .await
    }

    async fn time_spent(
        &self,
        operation: &'static str,
        filter: Option<&Filter>,
        field: Field,
    ) -> Result<Vec<TimeSpentStats>> {
        let filter = self.prepare(filter);

        let request = Request::new(&[Field::Day, field])
            .group_by(&[Field::Day])
            .order_by(Field::Day, Direction::Asc)
            .with_fill();

        self.select(operation, &filter, &request).await
    }
}
