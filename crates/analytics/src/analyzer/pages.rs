//! Pages, entry and exit pages, page conversions

use std::collections::HashMap;

use tracing::debug;

use crate::analyzer::Analyzer;
use crate::derived::relative;
use crate::error::Result;
use crate::field::Field;
use crate::filter::{Dimension, Direction, Filter};
use crate::plan::Request;
use crate::stats::{EntryStats, ExitStats, PageConversionsStats, PageStats};

impl Analyzer {
    /// Visitors, views and bounces per path
    pub async fn pages(&self, filter: Option<&Filter>) -> Result<Vec<PageStats>> {
        let filter = self.prepare(filter);

        let mut group = vec![Field::Path];
        if filter.include_title {
            group.push(Field::Title);
        }
        let mut fields = group.clone();
        fields.extend([Field::Visitors, Field::Sessions, Field::Views, Field::Bounces]);
        if filter.include_time_on_page {
            fields.push(Field::TimeOnPage);
        }
        fields.extend([Field::TotalVisitors, Field::TotalViews]);

        let request = Request::new(&fields)
            .group_by(&group)
            .order_by(Field::Visitors, Direction::Desc)
            .order_by(Field::Path, Direction::Asc);

        let mut stats: Vec<PageStats> = self.select("pages", &filter, &request).await?;
        for row in &mut stats {
            row.relative_visitors = relative(row.visitors, row.total_visitors);
            row.relative_views = relative(row.views, row.total_views);
            row.bounce_rate = relative(row.bounces, row.sessions);
        }
        Ok(stats)
    }

    /// Sessions starting on each path
    pub async fn entry_pages(&self, filter: Option<&Filter>) -> Result<Vec<EntryStats>> {
        let filter = self.prepare(filter);

        let mut group = vec![Field::EntryPath];
        if filter.include_title {
            group.push(Field::EntryTitle);
        }
        let mut fields = group.clone();
        fields.extend([
            Field::Visitors,
            Field::Sessions,
            Field::Entries,
            Field::PathVisitors,
            Field::PathSessions,
        ]);

        let request = Request::new(&fields)
            .group_by(&group)
            .order_by(Field::Entries, Direction::Desc)
            .order_by(Field::EntryPath, Direction::Asc);

        let mut stats: Vec<EntryStats> = self.select("entry_pages", &filter, &request).await?;
        for row in &mut stats {
            row.entry_rate = relative(row.entries, row.path_sessions);
        }

        if filter.include_time_on_page && !stats.is_empty() {
            let times = self.time_on_page_by_path(&filter).await?;
            for row in &mut stats {
                row.average_time_spent_seconds = times.get(&row.path).copied().unwrap_or(0);
            }
        }

        Ok(stats)
    }

    /// Sessions ending on each path
    pub async fn exit_pages(&self, filter: Option<&Filter>) -> Result<Vec<ExitStats>> {
        let filter = self.prepare(filter);

        let mut group = vec![Field::ExitPath];
        if filter.include_title {
            group.push(Field::ExitTitle);
        }
        let mut fields = group.clone();
        fields.extend([
            Field::Visitors,
            Field::Sessions,
            Field::Exits,
            Field::PathVisitors,
            Field::PathSessions,
        ]);

        let request = Request::new(&fields)
            .group_by(&group)
            .order_by(Field::Exits, Direction::Desc)
            .order_by(Field::ExitPath, Direction::Asc);

        let mut stats: Vec<ExitStats> = self.select("exit_pages", &filter, &request).await?;
        for row in &mut stats {
            row.exit_rate = relative(row.exits, row.path_sessions);
        }
        Ok(stats)
    }

    /// Visitors reaching the filtered path or pattern, against all visitors
    pub async fn page_conversions(&self, filter: Option<&Filter>) -> Result<PageConversionsStats> {
        let filter = self.prepare(filter);
        if !filter.is_active(Dimension::Path) && !filter.is_active(Dimension::PathPattern) {
            debug!("page conversions without a path or pattern, returning empty stats");
            return Ok(PageConversionsStats::default());
        }

        let request = Request::new(&[Field::Visitors, Field::Views, Field::TotalVisitors]);
        let mut stats: PageConversionsStats =
            self.select_one("page_conversions", &filter, &request).await?;
        stats.cr = relative(stats.visitors, stats.total_visitors);
        Ok(stats)
    }

    async fn time_on_page_by_path(&self, filter: &Filter) -> Result<HashMap<String, u64>> {
        #[derive(serde::Deserialize)]
        struct Row {
            path: String,
            time_on_page: u64,
        }

        // Every path is needed to match the entry rows, whatever page was asked for
        let mut filter = filter.clone();
        filter.limit = 0;
        filter.offset = 0;
        filter.sort.clear();
        filter.search.clear();

        let request = Request::new(&[Field::Path, Field::TimeOnPage]).group_by(&[Field::Path]);
        let rows: Vec<Row> = self.select("entry_pages", &filter, &request).await?;
        Ok(rows.into_iter().map(|r| (r.path, r.time_on_page)).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use vantage_query::ParamValue;

    use crate::analyzer::test_support::{analyzer, rows};
    use crate::filter::Filter;
    use crate::model::{Session, collapse_sessions};

    fn march() -> Filter {
        Filter::new(1).with_dates(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_pages_relative_metrics() {
        let (analyzer, backend) = analyzer(vec![rows(
            &[
                "path",
                "visitors",
                "sessions",
                "views",
                "bounces",
                "total_visitors",
                "total_views",
            ],
            vec![
                vec![json!("/"), json!(2), json!(2), json!(3), json!(1), json!(4), json!(6)],
                vec![json!("/blog"), json!(1), json!(1), json!(1), json!(0), json!(4), json!(6)],
            ],
        )]);

        let stats = analyzer.pages(Some(&march())).await.unwrap();
        assert_eq!(stats[0].relative_visitors, 0.5);
        assert_eq!(stats[0].relative_views, 0.5);
        assert_eq!(stats[0].bounce_rate, 0.5);
        assert_eq!(stats[1].bounce_rate, 0.0);

        let statements = backend.statements();
        let sql = &statements[0].sql;
        assert!(sql.contains("FROM page_view t"));
        assert!(sql.contains("INNER JOIN (SELECT t.visitor_id AS visitor_id, t.session_id AS session_id, sum(t.is_bounce * t.sign) AS bounced FROM session t"));
        assert!(sql.contains("HAVING sum(t.sign) > 0) s ON s.visitor_id = t.visitor_id AND s.session_id = t.session_id"));
        assert!(sql.contains("(SELECT uniq(t.visitor_id) FROM session t WHERE"));
        assert!(sql.contains("ORDER BY visitors DESC, path ASC"));
    }

    #[tokio::test]
    async fn test_pages_time_on_page_is_capped_by_parameter() {
        let mut filter = march();
        filter.include_time_on_page = true;
        filter.max_time_on_page_seconds = 200;
        let (analyzer, backend) = analyzer(Vec::new());

        analyzer.pages(Some(&filter)).await.unwrap();
        let statements = backend.statements();
        let statement = &statements[0];
        assert!(statement.sql.contains("least(t.time_on_page, {p"));
        assert!(statement.sql.contains("leadInFrame(t.time, 1, t.time)"));
        assert!(!statement.sql.contains("200"));
        assert!(statement.params.values().contains(&ParamValue::Int64(200)));
    }

    #[tokio::test]
    async fn test_entry_pages_rate_and_attribution() {
        let (analyzer, backend) = analyzer(vec![rows(
            &[
                "entry_path",
                "visitors",
                "sessions",
                "entries",
                "path_visitors",
                "path_sessions",
            ],
            vec![
                vec![json!("/"), json!(2), json!(2), json!(2), json!(3), json!(4)],
                vec![json!("/pricing"), json!(1), json!(1), json!(1), json!(1), json!(1)],
            ],
        )]);

        let stats = analyzer.entry_pages(Some(&march())).await.unwrap();
        assert_eq!(stats[0].path, "/");
        assert_eq!(stats[0].entry_rate, 0.5);
        assert_eq!(stats[1].entry_rate, 1.0);

        let statements = backend.statements();
        let sql = &statements[0].sql;
        assert!(sql.contains("t.entry_path AS entry_path"));
        assert!(sql.contains("FROM session t"));
        assert!(sql.contains("v ON v.path = t.entry_path"));
    }

    #[tokio::test]
    async fn test_entry_pages_merge_time_on_page() {
        let mut filter = march();
        filter.include_time_on_page = true;
        let (analyzer, backend) = analyzer(vec![
            rows(
                &["entry_path", "entries", "path_sessions"],
                vec![vec![json!("/"), json!(1), json!(1)]],
            ),
            rows(&["path", "time_on_page"], vec![vec![json!("/"), json!(42)]]),
        ]);

        let stats = analyzer.entry_pages(Some(&filter)).await.unwrap();
        assert_eq!(stats[0].average_time_spent_seconds, 42);
        assert_eq!(backend.executed(), 2);
    }

    #[tokio::test]
    async fn test_entry_pages_time_on_page_ignores_paging() {
        let mut filter = march();
        filter.include_time_on_page = true;
        filter.limit = 1;
        filter.offset = 1;
        let (analyzer, backend) = analyzer(vec![
            rows(
                &["entry_path", "entries", "path_sessions"],
                vec![vec![json!("/"), json!(3), json!(4)]],
            ),
            rows(
                &["path", "time_on_page"],
                vec![vec![json!("/other"), json!(7)], vec![json!("/"), json!(42)]],
            ),
        ]);

        let stats = analyzer.entry_pages(Some(&filter)).await.unwrap();
        assert_eq!(stats[0].average_time_spent_seconds, 42);

        let statements = backend.statements();
        assert!(statements[0].sql.ends_with("LIMIT 1 OFFSET 1"));
        assert!(statements[1].sql.ends_with("GROUP BY path"));
        assert!(!statements[1].sql.contains("LIMIT"));
    }

    #[tokio::test]
    async fn test_exit_pages_join_on_exit_path() {
        let (analyzer, backend) = analyzer(vec![rows(
            &["exit_path", "exits", "path_sessions"],
            vec![vec![json!("/bye"), json!(1), json!(4)]],
        )]);

        let stats = analyzer.exit_pages(Some(&march())).await.unwrap();
        assert_eq!(stats[0].path, "/bye");
        assert_eq!(stats[0].exit_rate, 0.25);

        let statements = backend.statements();
        assert!(statements[0].sql.contains("v ON v.path = t.exit_path"));
    }

    #[tokio::test]
    async fn test_exit_pages_drop_superseded_exit_paths() {
        let first = Session {
            client_id: 1,
            visitor_id: 1,
            session_id: 1,
            sign: 1,
            entry_path: "/".into(),
            exit_path: "/".into(),
            page_views: 1,
            ..Default::default()
        };
        let next = Session {
            exit_path: "/pricing".into(),
            page_views: 2,
            ..first.clone()
        };
        let [retraction, insert] = first.update(next);
        let log = [first, retraction, insert];

        // The grouped sign sums see only the exit path of the live version
        let net = |path: &str| -> i64 {
            log.iter()
                .filter(|s| s.exit_path == path)
                .map(|s| i64::from(s.sign))
                .sum()
        };
        assert_eq!(net("/"), 0);
        assert_eq!(net("/pricing"), 1);
        let live = collapse_sessions(&log);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].exit_path, "/pricing");

        let (analyzer, backend) = analyzer(vec![rows(
            &["exit_path", "visitors", "sessions", "exits", "path_sessions"],
            vec![vec![json!("/pricing"), json!(1), json!(1), json!(1), json!(1)]],
        )]);
        let stats = analyzer.exit_pages(Some(&march())).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].path, "/pricing");

        let statements = backend.statements();
        let sql = &statements[0].sql;
        assert!(sql.contains("GROUP BY exit_path HAVING sum(t.sign) > 0 ORDER BY exits DESC, exit_path ASC"));
    }

    #[tokio::test]
    async fn test_entry_pages_drop_net_zero_groups() {
        let (analyzer, backend) = analyzer(Vec::new());
        analyzer.entry_pages(Some(&march())).await.unwrap();

        let statements = backend.statements();
        assert!(statements[0].sql.contains("GROUP BY entry_path HAVING sum(t.sign) > 0 ORDER BY"));
    }

    #[tokio::test]
    async fn test_page_conversions_needs_path() {
        let (analyzer, backend) = analyzer(Vec::new());
        let stats = analyzer.page_conversions(Some(&march())).await.unwrap();
        assert_eq!(stats.visitors, 0);
        assert_eq!(backend.executed(), 0);

        let mut filter = march();
        filter.path_pattern = vec!["^/blog/.*$".into()];
        let (analyzer, backend) = analyzer_with(
            &["visitors", "views", "total_visitors"],
            vec![json!(5), json!(8), json!(20)],
        );
        let stats = analyzer.page_conversions(Some(&filter)).await.unwrap();
        assert_eq!(stats.cr, 0.25);

        let statements = backend.statements();
        assert!(statements[0].sql.contains("match(t.path, {p"));
    }

    fn analyzer_with(
        names: &[&str],
        row: Vec<serde_json::Value>,
    ) -> (crate::analyzer::Analyzer, std::sync::Arc<vantage_query::MockBackend>) {
        analyzer(vec![rows(names, vec![row])])
    }
}
