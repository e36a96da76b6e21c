//! Predicate compiler
//!
//! Turns filter values into boolean SQL fragments. User values only ever
//! reach the SQL text as bound placeholders; the only interpolated pieces
//! are registry expressions and the timezone name.

use std::collections::BTreeMap;

use vantage_query::Params;

use crate::filter::Filter;

/// What a set of filter values is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// Equality on a scalar expression
    Column(&'a str),
    /// Regular expression match on a scalar expression
    Pattern(&'a str),
    /// Membership in an array expression
    Array(&'a str),
    /// The desktop/mobile flags of a session
    Platform,
}

impl Target<'_> {
    fn null(&self, negated: bool) -> String {
        match (self, negated) {
            (Self::Column(expr) | Self::Pattern(expr), false) => format!("{} = ''", expr),
            (Self::Column(expr) | Self::Pattern(expr), true) => format!("{} != ''", expr),
            (Self::Array(expr), false) => format!("empty({})", expr),
            (Self::Array(expr), true) => format!("notEmpty({})", expr),
            (Self::Platform, false) => platform_condition("unknown").to_string(),
            (Self::Platform, true) => format!("NOT {}", platform_condition("unknown")),
        }
    }

    fn compare(&self, negated: bool, value: &str, params: &mut Params) -> Option<String> {
        let clause = match (self, negated) {
            (Self::Column(expr), false) => format!("{} = {}", expr, params.bind(value)),
            (Self::Column(expr), true) => format!("{} != {}", expr, params.bind(value)),
            (Self::Pattern(expr), false) => format!("match({}, {})", expr, params.bind(value)),
            (Self::Pattern(expr), true) => format!("NOT match({}, {})", expr, params.bind(value)),
            (Self::Array(expr), false) => format!("has({}, {})", expr, params.bind(value)),
            (Self::Array(expr), true) => format!("NOT has({}, {})", expr, params.bind(value)),
            (Self::Platform, negated) => {
                let condition = platform_condition(&value.to_lowercase());
                if condition.is_empty() {
                    tracing::warn!(platform = value, "ignoring unknown platform filter value");
                    return None;
                }
                if negated {
                    format!("NOT {}", condition)
                } else {
                    condition.to_string()
                }
            }
        };
        Some(clause)
    }
}

fn platform_condition(platform: &str) -> &'static str {
    match platform {
        "desktop" => "(t.desktop = 1 AND t.mobile = 0)",
        "mobile" => "(t.desktop = 0 AND t.mobile = 1)",
        "unknown" => "(t.desktop = 0 AND t.mobile = 0)",
        _ => "",
    }
}

/// Compile a multi-value restriction
///
/// Included values are OR'd, excluded values AND'd, and the two groups
/// AND'd together. `None` when there is nothing to restrict.
pub fn values_predicate(target: Target<'_>, values: &[String], params: &mut Params) -> Option<String> {
    let mut include = Vec::new();
    let mut exclude = Vec::new();

    for raw in values {
        let (negated, value) = match raw.strip_prefix('!') {
            Some(value) => (true, value),
            None => (false, raw.as_str()),
        };

        let clause = if value.eq_ignore_ascii_case("null") {
            Some(target.null(negated))
        } else {
            target.compare(negated, value, params)
        };

        if let Some(clause) = clause {
            if negated {
                exclude.push(clause);
            } else {
                include.push(clause);
            }
        }
    }

    let mut groups = Vec::new();
    match include.len() {
        0 => {}
        1 => groups.push(include.remove(0)),
        _ => groups.push(format!("({})", include.join(" OR "))),
    }
    if !exclude.is_empty() {
        groups.push(exclude.join(" AND "));
    }

    if groups.is_empty() {
        None
    } else {
        Some(groups.join(" AND "))
    }
}

/// Each key must carry its value; all pairs must hold
pub fn event_meta_predicate(meta: &BTreeMap<String, String>, params: &mut Params) -> Option<String> {
    let clauses: Vec<String> = meta
        .iter()
        .filter_map(|(key, value)| {
            let column = format!(
                "t.event_meta_values[indexOf(t.event_meta_keys, {})]",
                params.bind(key)
            );
            values_predicate(Target::Column(&column), std::slice::from_ref(value), params)
        })
        .collect();

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

/// Case-insensitive substring match
pub fn search_predicate(expr: &str, input: &str, params: &mut Params) -> String {
    format!("positionCaseInsensitiveUTF8({}, {}) > 0", expr, params.bind(input))
}

/// Client and time window restriction, present in every query
///
/// Calendar mode compares the local day of `t.time` to inclusive bounds;
/// with `include_time` the window is `[from, to)` on the instant.
pub fn time_predicate(filter: &Filter, params: &mut Params) -> String {
    let mut clauses = vec![format!("t.client_id = {}", params.bind(filter.client_id))];

    if filter.include_time {
        if let Some(from) = filter.from {
            clauses.push(format!("t.time >= {}", params.bind(from)));
        }
        if let Some(to) = filter.to {
            clauses.push(format!("t.time < {}", params.bind(to)));
        }
    } else {
        let tz = filter.timezone().name();
        if let Some(from) = filter.from {
            clauses.push(format!(
                "toDate(t.time, '{}') >= {}",
                tz,
                params.bind(from.date_naive())
            ));
        }
        if let Some(to) = filter.to {
            clauses.push(format!(
                "toDate(t.time, '{}') <= {}",
                tz,
                params.bind(to.date_naive())
            ));
        }
    }

    clauses.join(" AND ")
}
