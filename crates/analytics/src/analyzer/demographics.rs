//! Referrers, platforms and session attributes

use crate::analyzer::Analyzer;
use crate::derived::relative;
use crate::error::Result;
use crate::field::Field;
use crate::filter::{Dimension, Direction, Filter};
use crate::plan::Request;
use crate::stats::{
    AttributeStats, BrowserVersionStats, OsVersionStats, PlatformStats, ReferrerStats,
};

/// Single-valued session attribute with a visitor breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Language,
    Country,
    City,
    Browser,
    Os,
    ScreenClass,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmContent,
    UtmTerm,
}

impl Attribute {
    pub fn field(self) -> Field {
        match self {
            Self::Language => Field::Language,
            Self::Country => Field::Country,
            Self::City => Field::City,
            Self::Browser => Field::Browser,
            Self::Os => Field::Os,
            Self::ScreenClass => Field::ScreenClass,
            Self::UtmSource => Field::UtmSource,
            Self::UtmMedium => Field::UtmMedium,
            Self::UtmCampaign => Field::UtmCampaign,
            Self::UtmContent => Field::UtmContent,
            Self::UtmTerm => Field::UtmTerm,
        }
    }
}

impl Analyzer {
    /// Visitors per referrer
    ///
    /// Grouped by referrer name. Once a referrer name is filtered, the
    /// individual referrers behind it are listed.
    pub async fn referrer(&self, filter: Option<&Filter>) -> Result<Vec<ReferrerStats>> {
        let filter = self.prepare(filter);

        let (group, referrer) = if filter.is_active(Dimension::ReferrerName) {
            (vec![Field::ReferrerName, Field::Referrer], Field::Referrer)
        } else {
            (vec![Field::ReferrerName], Field::AnyReferrer)
        };
        let request = Request::new(&[
            Field::ReferrerName,
            referrer,
            Field::ReferrerIcon,
            Field::Visitors,
            Field::Sessions,
            Field::Bounces,
            Field::TotalVisitors,
        ])
        .group_by(&group)
        .order_by(Field::Visitors, Direction::Desc)
        .order_by(Field::ReferrerName, Direction::Asc);

        let mut stats: Vec<ReferrerStats> = self.select("referrer", &filter, &request).await?;
        for row in &mut stats {
            row.relative_visitors = relative(row.visitors, row.total_visitors);
            row.bounce_rate = relative(row.bounces, row.sessions);
        }
        Ok(stats)
    }

    /// Desktop, mobile and unknown visitors with their shares
    pub async fn platform(&self, filter: Option<&Filter>) -> Result<PlatformStats> {
        let filter = self.prepare(filter);

        let request = Request::new(&[
            Field::PlatformDesktop,
            Field::PlatformMobile,
            Field::PlatformUnknown,
        ]);
        let mut stats: PlatformStats = self.select_one("platform", &filter, &request).await?;

        let sum = stats.platform_desktop + stats.platform_mobile + stats.platform_unknown;
        stats.relative_platform_desktop = relative(stats.platform_desktop, sum);
        stats.relative_platform_mobile = relative(stats.platform_mobile, sum);
        stats.relative_platform_unknown = relative(stats.platform_unknown, sum);
        Ok(stats)
    }

    /// Visitors per value of a session attribute
    pub async fn by_attribute(
        &self,
        filter: Option<&Filter>,
        attribute: Attribute,
    ) -> Result<Vec<AttributeStats>> {
        let filter = self.prepare(filter);
        let field = attribute.field();

        let request = Request::new(&[field, Field::Visitors, Field::TotalVisitors])
            .group_by(&[field])
            .order_by(Field::Visitors, Direction::Desc)
            .order_by(field, Direction::Asc);

        let mut stats: Vec<AttributeStats> = self
            .select_renamed("by_attribute", &filter, &request, field.name(), "value")
            .await?;
        for row in &mut stats {
            row.relative_visitors = relative(row.visitors, row.total_visitors);
        }
        Ok(stats)
    }

    pub async fn languages(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::Language).await
    }

    /// Visitors per ISO country code
    pub async fn countries(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::Country).await
    }

    pub async fn cities(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::City).await
    }

    pub async fn browsers(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::Browser).await
    }

    pub async fn operating_systems(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::Os).await
    }

    pub async fn screen_classes(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::ScreenClass).await
    }

    pub async fn utm_sources(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::UtmSource).await
    }

    pub async fn utm_mediums(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::UtmMedium).await
    }

    pub async fn utm_campaigns(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::UtmCampaign).await
    }

    pub async fn utm_contents(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::UtmContent).await
    }

    pub async fn utm_terms(&self, filter: Option<&Filter>) -> Result<Vec<AttributeStats>> {
        self.by_attribute(filter, Attribute::UtmTerm).await
    }

    /// Visitors per operating system and version
    pub async fn os_versions(&self, filter: Option<&Filter>) -> Result<Vec<OsVersionStats>> {
        let filter = self.prepare(filter);

        let request = Request::new(&[
            Field::Os,
            Field::OsVersion,
            Field::Visitors,
            Field::TotalVisitors,
        ])
        .group_by(&[Field::Os, Field::OsVersion])
        .order_by(Field::Visitors, Direction::Desc)
        .order_by(Field::Os, Direction::Asc)
        .order_by(Field::OsVersion, Direction::Asc);

        let mut stats: Vec<OsVersionStats> = self.select("os_versions", &filter, &request).await?;
        for row in &mut stats {
            row.relative_visitors = relative(row.visitors, row.total_visitors);
        }
        Ok(stats)
    }

    /// Visitors per browser and version
    pub async fn browser_versions(
        &self,
        filter: Option<&Filter>,
    ) -> Result<Vec<BrowserVersionStats>> {
        let filter = self.prepare(filter);

        let request = Request::new(&[
            Field::Browser,
            Field::BrowserVersion,
            Field::Visitors,
            Field::TotalVisitors,
        ])
        .group_by(&[Field::Browser, Field::BrowserVersion])
        .order_by(Field::Visitors, Direction::Desc)
        .order_by(Field::Browser, Direction::Asc)
        .order_by(Field::BrowserVersion, Direction::Asc);

        let mut stats: Vec<BrowserVersionStats> =
            self.select("browser_versions", &filter, &request).await?;
        for row in &mut stats {
            row.relative_visitors = relative(row.visitors, row.total_visitors);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use vantage_query::ParamValue;

    use super::Attribute;
    use crate::analyzer::test_support::{analyzer, rows};
    use crate::filter::Filter;

    fn day() -> Filter {
        Filter::new(1).with_day(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap())
    }

    #[tokio::test]
    async fn test_referrer_grouped_by_name() {
        let (analyzer, backend) = analyzer(vec![rows(
            &[
                "referrer_name",
                "any_referrer",
                "icon",
                "visitors",
                "sessions",
                "bounces",
                "total_visitors",
            ],
            vec![vec![
                json!("Example"),
                json!("https://example.com/a"),
                json!("https://example.com/favicon.ico"),
                json!(3),
                json!(4),
                json!(1),
                json!(12),
            ]],
        )]);

        let stats = analyzer.referrer(Some(&day())).await.unwrap();
        assert_eq!(stats[0].referrer_name, "Example");
        assert_eq!(stats[0].referrer, "https://example.com/a");
        assert_eq!(stats[0].referrer_icon, "https://example.com/favicon.ico");
        assert_eq!(stats[0].relative_visitors, 0.25);
        assert_eq!(stats[0].bounce_rate, 0.25);

        let statements = backend.statements();
        let sql = &statements[0].sql;
        assert!(sql.contains("any(t.referrer) AS any_referrer"));
        assert!(sql.contains("any(t.referrer_icon) AS icon"));
        assert!(sql.contains("GROUP BY referrer_name HAVING sum(t.sign) > 0 ORDER BY"));
    }

    #[tokio::test]
    async fn test_referrer_lists_referrers_of_filtered_name() {
        let mut filter = day();
        filter.referrer_name = vec!["Example".into()];
        let (analyzer, backend) = analyzer(Vec::new());

        analyzer.referrer(Some(&filter)).await.unwrap();
        let statements = backend.statements();
        let sql = &statements[0].sql;
        assert!(sql.contains("t.referrer AS referrer"));
        assert!(sql.contains("GROUP BY referrer_name, referrer"));
        assert!(sql.contains("t.referrer_name = {p"));
    }

    #[tokio::test]
    async fn test_platform_shares() {
        let (analyzer, _) = analyzer(vec![rows(
            &["platform_desktop", "platform_mobile", "platform_unknown"],
            vec![vec![json!(6), json!(3), json!(1)]],
        )]);

        let stats = analyzer.platform(Some(&day())).await.unwrap();
        assert_eq!(stats.relative_platform_desktop, 0.6);
        assert_eq!(stats.relative_platform_mobile, 0.3);
        assert_eq!(stats.relative_platform_unknown, 0.1);
    }

    #[tokio::test]
    async fn test_platform_with_path_joins_page_views() {
        let mut filter = day();
        filter.path = vec!["/".into()];
        let (analyzer, backend) = analyzer(Vec::new());

        let stats = analyzer.platform(Some(&filter)).await.unwrap();
        assert_eq!(stats.relative_platform_desktop, 0.0);

        let statements = backend.statements();
        let sql = &statements[0].sql;
        assert!(sql.contains("FROM session t"));
        assert!(sql.contains("INNER JOIN (SELECT t.visitor_id AS visitor_id, t.session_id AS session_id FROM page_view t"));
        assert!(sql.contains(") pv ON pv.visitor_id = t.visitor_id"));
    }

    #[tokio::test]
    async fn test_countries_decode_into_value() {
        let (analyzer, backend) = analyzer(vec![rows(
            &["country_code", "visitors", "total_visitors"],
            vec![
                vec![json!("de"), json!(3), json!(4)],
                vec![json!(""), json!(1), json!(4)],
            ],
        )]);

        let stats = analyzer.countries(Some(&day())).await.unwrap();
        assert_eq!(stats[0].value, "de");
        assert_eq!(stats[0].relative_visitors, 0.75);
        assert_eq!(stats[1].value, "");

        let statements = backend.statements();
        assert!(statements[0].sql.contains("t.country_code AS country_code"));
        assert!(statements[0].sql.contains("ORDER BY visitors DESC, country_code ASC"));
    }

    #[tokio::test]
    async fn test_attribute_null_filter() {
        let mut filter = day();
        filter.utm_source = vec!["null".into()];
        let (analyzer, backend) = analyzer(Vec::new());

        analyzer.by_attribute(Some(&filter), Attribute::UtmSource).await.unwrap();
        let statements = backend.statements();
        assert!(statements[0].sql.contains("t.utm_source = ''"));
        assert!(!statements[0]
            .params
            .values()
            .contains(&ParamValue::String("null".into())));
    }

    #[tokio::test]
    async fn test_os_versions() {
        let (analyzer, backend) = analyzer(vec![rows(
            &["os", "os_version", "visitors", "total_visitors"],
            vec![vec![json!("Mac"), json!("14"), json!(2), json!(8)]],
        )]);

        let stats = analyzer.os_versions(Some(&day())).await.unwrap();
        assert_eq!(stats[0].os_version, "14");
        assert_eq!(stats[0].relative_visitors, 0.25);

        let statements = backend.statements();
        assert!(statements[0].sql.contains("GROUP BY os, os_version"));
    }

    #[tokio::test]
    async fn test_browser_versions() {
        let (analyzer, _) = analyzer(vec![rows(
            &["browser", "browser_version", "visitors", "total_visitors"],
            vec![vec![json!("Firefox"), json!("125.0"), json!(1), json!(2)]],
        )]);

        let stats = analyzer.browser_versions(Some(&day())).await.unwrap();
        assert_eq!(stats[0].browser, "Firefox");
        assert_eq!(stats[0].relative_visitors, 0.5);
    }
}
