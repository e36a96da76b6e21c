//! Query planner
//!
//! Decides which stream a query reads, which sub-queries it joins, and where
//! each filter dimension is applied. The plan is pure data; [`crate::render`]
//! turns it into SQL.
//!
//! Every active dimension is applied exactly once: directly on the base stream
//! when the base can test it, otherwise inside a joined sub-query over the
//! stream that owns it, grouped by visitor and session.

use crate::field::Field;
use crate::filter::{Dimension, Direction, Filter, Sort};
use crate::model::Stream;

/// What an analyzer operation wants from the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub fields: Vec<Field>,
    pub group_by: Vec<Field>,
    pub order_by: Vec<Sort>,
    /// Emit empty buckets for the ordered day/hour field
    pub fill: bool,
}

impl Request {
    pub fn new(fields: &[Field]) -> Self {
        Self {
            fields: fields.to_vec(),
            ..Default::default()
        }
    }

    pub fn group_by(mut self, fields: &[Field]) -> Self {
        self.group_by = fields.to_vec();
        self
    }

    pub fn order_by(mut self, field: Field, direction: Direction) -> Self {
        self.order_by.push(Sort { field, direction });
        self
    }

    pub fn with_fill(mut self) -> Self {
        self.fill = true;
        self
    }

    fn wanted(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().chain(self.group_by.iter()).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
        }
    }
}

/// Row source of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The base stream's table
    Table,
    /// Page views with the gap to the next view in the same session
    TimeOnPage,
}

/// A sub-query joined to the outer query
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub alias: &'static str,
    pub plan: Box<QueryPlan>,
    /// `(outer field, inner field)` equalities
    pub on: Vec<(Field, Field)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub base: Stream,
    pub source: Source,
    /// Restrictions applied on the base; dimensions moved into joins are cleared
    pub filter: Filter,
    pub fields: Vec<Field>,
    pub group_by: Vec<Field>,
    pub order_by: Vec<Sort>,
    pub fill: bool,
    pub joins: Vec<Join>,
    /// Event names are tested against the name set of a left-joined `ev`
    pub event_membership: bool,
    /// Only groups with a net positive sign survive grouping. Set on session
    /// joins and on grouped session queries, where a superseded version
    /// leaves a `+1`/`-1` pair behind under its old attribute values.
    pub live_sessions: bool,
    /// The filter can never match; rendered as `0 = 1`
    pub unsatisfiable: bool,
}

impl QueryPlan {
    fn join_target(base: Stream, filter: Filter, fields: Vec<Field>, group_by: Vec<Field>) -> Self {
        Self {
            base,
            source: Source::Table,
            filter,
            fields,
            group_by,
            order_by: Vec::new(),
            fill: false,
            joins: Vec::new(),
            event_membership: false,
            live_sessions: false,
            unsatisfiable: false,
        }
    }

    pub fn join(&self, alias: &str) -> Option<&Join> {
        self.joins.iter().find(|j| j.alias == alias)
    }
}

const SESSION_KEY: [Field; 2] = [Field::VisitorId, Field::SessionId];
const SESSION_ON: [(Field, Field); 2] = [
    (Field::VisitorId, Field::VisitorId),
    (Field::SessionId, Field::SessionId),
];

/// Stream a request is evaluated against
///
/// # Panics
///
/// Panics if no stream can express every requested field.
pub fn base_stream(filter: &Filter, request: &Request) -> Stream {
    let event_scoped = request.wanted().any(|f| f.is_event_scoped());
    let path_scoped = filter.is_active(Dimension::Path)
        || filter.is_active(Dimension::PathPattern)
        || request.wanted().any(|f| f == Field::Path);

    let preferred = if request.wanted().any(|f| f.is_entry_exit()) {
        Stream::Session
    } else if path_scoped && !event_scoped {
        Stream::PageView
    } else if event_scoped {
        Stream::Event
    } else {
        Stream::Session
    };

    let supports = |stream: Stream| request.wanted().all(|f| f.is_available(stream));
    if supports(preferred) {
        return preferred;
    }

    match [Stream::Session, Stream::PageView, Stream::Event]
        .into_iter()
        .find(|s| supports(*s))
    {
        Some(stream) => stream,
        None => panic!(
            "no stream can express fields {:?}",
            request.wanted().collect::<Vec<_>>()
        ),
    }
}

/// Plan a request under a validated filter
pub fn plan(filter: &Filter, request: &Request) -> QueryPlan {
    let base = base_stream(filter, request);
    let mut outer = filter.clone();

    outer
        .search
        .retain(|search| request.group_by.contains(&search.field));

    let caller_sort: Vec<Sort> = filter
        .sort
        .iter()
        .filter(|sort| request.fields.contains(&sort.field))
        .copied()
        .collect();
    let order_by = if caller_sort.is_empty() {
        request.order_by.clone()
    } else {
        caller_sort
    };

    let mut session_dims = Vec::new();
    let mut page_view_dims = Vec::new();
    let mut event_dims = Vec::new();
    for dimension in filter.active_dimensions() {
        if dimension.available_on(base) {
            continue;
        }
        match dimension.owner() {
            Stream::Session => session_dims.push(dimension),
            Stream::PageView => page_view_dims.push(dimension),
            Stream::Event => event_dims.push(dimension),
        }
    }

    let mut joins = Vec::new();
    let mut event_membership = false;

    let wants_bounces = base == Stream::PageView && request.fields.contains(&Field::Bounces);
    if !session_dims.is_empty() || wants_bounces {
        let mut fields = SESSION_KEY.to_vec();
        if wants_bounces {
            fields.push(Field::Bounced);
        }
        let mut sessions = QueryPlan::join_target(
            Stream::Session,
            filter.scoped_to(&session_dims),
            fields,
            SESSION_KEY.to_vec(),
        );
        sessions.live_sessions = true;
        joins.push(Join {
            kind: JoinKind::Inner,
            alias: "s",
            plan: Box::new(sessions),
            on: SESSION_ON.to_vec(),
        });
    }

    if !page_view_dims.is_empty() {
        joins.push(Join {
            kind: JoinKind::Inner,
            alias: "pv",
            plan: Box::new(QueryPlan::join_target(
                Stream::PageView,
                filter.scoped_to(&page_view_dims),
                SESSION_KEY.to_vec(),
                SESSION_KEY.to_vec(),
            )),
            on: SESSION_ON.to_vec(),
        });
    }

    if !event_dims.is_empty() {
        let join = if filter.excludes_event_names() {
            // Sessions without a matching event must survive the join, so the
            // name test moves to the outer query.
            event_membership = true;
            let scope: Vec<Dimension> = event_dims
                .iter()
                .copied()
                .filter(|d| *d != Dimension::EventName)
                .collect();
            let mut fields = SESSION_KEY.to_vec();
            fields.push(Field::EventNames);
            Join {
                kind: JoinKind::Left,
                alias: "ev",
                plan: Box::new(QueryPlan::join_target(
                    Stream::Event,
                    filter.scoped_to(&scope),
                    fields,
                    SESSION_KEY.to_vec(),
                )),
                on: SESSION_ON.to_vec(),
            }
        } else {
            Join {
                kind: JoinKind::Inner,
                alias: "ev",
                plan: Box::new(QueryPlan::join_target(
                    Stream::Event,
                    filter.scoped_to(&event_dims),
                    SESSION_KEY.to_vec(),
                    SESSION_KEY.to_vec(),
                )),
                on: SESSION_ON.to_vec(),
            }
        };
        joins.push(join);
    }

    for dimension in session_dims.iter().chain(&page_view_dims).chain(&event_dims) {
        if *dimension == Dimension::EventName && event_membership {
            continue;
        }
        outer.clear(*dimension);
    }

    if request.fields.contains(&Field::PeriodVisitors) {
        let bucket = if request.group_by.contains(&Field::Hour) {
            Field::Hour
        } else {
            Field::Day
        };
        joins.push(Join {
            kind: JoinKind::Left,
            alias: "uvd",
            plan: Box::new(QueryPlan::join_target(
                Stream::Session,
                filter.time_only(),
                vec![bucket, Field::Visitors],
                vec![bucket],
            )),
            on: vec![(bucket, bucket)],
        });
    }

    if request
        .fields
        .iter()
        .any(|f| matches!(f, Field::PathVisitors | Field::PathSessions))
    {
        let outer_path = if request.wanted().any(|f| f == Field::ExitPath) {
            Field::ExitPath
        } else {
            Field::EntryPath
        };
        joins.push(Join {
            kind: JoinKind::Inner,
            alias: "v",
            plan: Box::new(QueryPlan::join_target(
                Stream::PageView,
                filter.time_only(),
                vec![Field::Path, Field::Visitors, Field::Sessions],
                vec![Field::Path],
            )),
            on: vec![(outer_path, Field::Path)],
        });
    }

    let source = if request.fields.iter().any(|f| f.needs_time_on_page()) {
        Source::TimeOnPage
    } else {
        Source::Table
    };

    QueryPlan {
        base,
        source,
        unsatisfiable: filter.has_orphan_event_meta(),
        filter: outer,
        fields: request.fields.clone(),
        group_by: request.group_by.clone(),
        order_by,
        fill: request.fill,
        joins,
        event_membership,
        live_sessions: base == Stream::Session && !request.group_by.is_empty(),
    }
}
