//! Renderer
//!
//! Walks a [`QueryPlan`] (recursively for its joins) and produces the SQL
//! text and its bound parameters. This is the only place SQL is written.

use vantage_query::{Params, Statement};

use crate::builder::QueryBuilder;
use crate::field::Field;
use crate::filter::{CustomMetricType, Dimension, Direction, Filter, Sort};
use crate::plan::{QueryPlan, Source};
use crate::predicate::{
    Target, event_meta_predicate, search_predicate, time_predicate, values_predicate,
};

/// Render a plan into a statement
pub fn render(plan: &QueryPlan) -> Statement {
    let mut params = Params::new();
    let sql = render_plan(plan, &mut params);
    Statement::new(sql, params)
}

fn render_plan(plan: &QueryPlan, params: &mut Params) -> String {
    let filter = &plan.filter;
    let mut tokens = Tokens::new(filter);

    let mut query = QueryBuilder::new(source(plan, params));

    for field in &plan.fields {
        let expr = tokens.expand(field.column(plan.base), params);
        query = query.select_as(expr, field.name());
    }

    for join in &plan.joins {
        let subquery = render_plan(&join.plan, params);
        let on: Vec<String> = join
            .on
            .iter()
            .map(|(outer, inner)| {
                format!(
                    "{}.{} = {}",
                    join.alias,
                    inner.name(),
                    tokens.expand(outer.column(plan.base), params)
                )
            })
            .collect();
        query = query.join(join.kind.sql(), subquery, join.alias, on.join(" AND "));
    }

    query = query.where_clause(time_predicate(filter, params));
    for clause in dimension_predicates(plan, params) {
        query = query.where_clause(clause);
    }
    if plan.unsatisfiable {
        query = query.where_clause("0 = 1");
    }

    for field in &plan.group_by {
        query = query.group_by(field.name());
    }

    if plan.live_sessions {
        query = query.having("sum(t.sign) > 0");
    }
    for search in &filter.search {
        query = query.having(search_predicate(search.field.name(), &search.input, params));
    }

    for sort in &plan.order_by {
        query = query.order_by(order_term(plan, sort, params));
    }

    if filter.limit > 0 {
        query = query.limit(filter.limit as u64);
    }
    if filter.offset > 0 {
        query = query.offset(filter.offset as u64);
    }

    query.build()
}

fn source(plan: &QueryPlan, params: &mut Params) -> String {
    match plan.source {
        Source::Table => format!("{} t", plan.base.table()),
        Source::TimeOnPage => format!(
            "(SELECT *, dateDiff('second', t.time, leadInFrame(t.time, 1, t.time) \
             OVER (PARTITION BY t.visitor_id, t.session_id ORDER BY t.time ASC \
             ROWS BETWEEN CURRENT ROW AND 1 FOLLOWING)) AS time_on_page \
             FROM {} t WHERE {}) t",
            plan.base.table(),
            time_predicate(&plan.filter, params)
        ),
    }
}

fn dimension_predicates(plan: &QueryPlan, params: &mut Params) -> Vec<String> {
    let filter = &plan.filter;
    let mut clauses = Vec::new();

    for dimension in filter.active_dimensions() {
        let values = filter.values(dimension);
        let clause = match dimension {
            Dimension::EventMeta => event_meta_predicate(&filter.event_meta, params),
            Dimension::EventMetaKey => {
                values_predicate(Target::Array("t.event_meta_keys"), values, params)
            }
            Dimension::Platform => values_predicate(Target::Platform, values, params),
            Dimension::EventName if plan.event_membership => {
                values_predicate(Target::Array("ev.event_names"), values, params)
            }
            Dimension::PathPattern => {
                values_predicate(Target::Pattern(Field::Path.column(plan.base)), values, params)
            }
            _ => match dimension.field() {
                Some(field) => {
                    values_predicate(Target::Column(field.column(plan.base)), values, params)
                }
                None => None,
            },
        };
        clauses.extend(clause);
    }

    clauses
}

fn order_term(plan: &QueryPlan, sort: &Sort, params: &mut Params) -> String {
    let term = format!("{} {}", sort.field.name(), sort.direction.sql());
    if !plan.fill || sort.direction != Direction::Asc {
        return term;
    }

    match sort.field {
        Field::Day => {
            let period = plan.filter.period;
            let interval = period.interval();
            match (plan.filter.from, plan.filter.to) {
                (Some(from), Some(to)) => {
                    let from = period.align(from.date_naive());
                    let to = period.advance(period.align(to.date_naive()));
                    format!(
                        "{} WITH FILL FROM {} TO {} STEP INTERVAL {}",
                        term,
                        params.bind(from),
                        params.bind(to),
                        interval
                    )
                }
                _ => format!("{} WITH FILL STEP INTERVAL {}", term, interval),
            }
        }
        Field::Hour => format!("{} WITH FILL FROM 0 TO 24", term),
        _ => term,
    }
}

/// Template token replacement for one query level
///
/// Tokens that bind a parameter are bound once per level and reused.
struct Tokens<'a> {
    filter: &'a Filter,
    meta_key: Option<String>,
    metric_value: Option<String>,
    time_on_page: Option<String>,
    total_visitors: Option<String>,
    total_views: Option<String>,
}

impl<'a> Tokens<'a> {
    fn new(filter: &'a Filter) -> Self {
        Self {
            filter,
            meta_key: None,
            metric_value: None,
            time_on_page: None,
            total_visitors: None,
            total_views: None,
        }
    }

    fn expand(&mut self, template: &str, params: &mut Params) -> String {
        let filter = self.filter;
        let mut sql = template
            .replace("$day", filter.period.bucket_expr())
            .replace("$tz", filter.timezone().name());

        if sql.contains("$meta_key") {
            let key = self
                .meta_key
                .get_or_insert_with(|| {
                    let key = filter.event_meta_key.first().map(String::as_str).unwrap_or("");
                    params.bind(key)
                })
                .clone();
            sql = sql.replace("$meta_key", &key);
        }

        if sql.contains("$metric_value") {
            let value = self
                .metric_value
                .get_or_insert_with(|| {
                    let (key, kind) = filter
                        .custom_metric()
                        .unwrap_or(("", CustomMetricType::Float));
                    format!(
                        "{}(t.event_meta_values[indexOf(t.event_meta_keys, {})])",
                        kind.cast_fn(),
                        params.bind(key)
                    )
                })
                .clone();
            sql = sql.replace("$metric_value", &value);
        }

        if sql.contains("$time_on_page") {
            let value = self
                .time_on_page
                .get_or_insert_with(|| match filter.max_time_on_page_seconds {
                    0 => "t.time_on_page".to_string(),
                    cap => format!("least(t.time_on_page, {})", params.bind(i64::from(cap))),
                })
                .clone();
            sql = sql.replace("$time_on_page", &value);
        }

        if sql.contains("$total_visitors") {
            let value = self
                .total_visitors
                .get_or_insert_with(|| {
                    format!(
                        "(SELECT uniq(t.visitor_id) FROM session t WHERE {})",
                        time_predicate(&filter.time_only(), params)
                    )
                })
                .clone();
            sql = sql.replace("$total_visitors", &value);
        }

        if sql.contains("$total_views") {
            let value = self
                .total_views
                .get_or_insert_with(|| {
                    format!(
                        "(SELECT toUInt64(greatest(sum(t.page_views * t.sign), 0)) FROM session t WHERE {})",
                        time_predicate(&filter.time_only(), params)
                    )
                })
                .clone();
            sql = sql.replace("$total_views", &value);
        }

        sql
    }
}
