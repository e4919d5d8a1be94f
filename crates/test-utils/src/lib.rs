//! Testing helpers for the query kernel.
//!
//! Provides a recording fake queryable plus static search and version
//! catalog stubs, so composition behavior can be asserted call-by-call
//! without a database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use modhub_query::error::QueryResult;
use modhub_query::query::queryable::{Direction, Queryable};
use modhub_query::query::spec::{BoxFuture, Includes, ResourceSpec, names, sync_filter};
use modhub_query::search::SearchBackend;
use modhub_query::version::VersionCatalog;

/// One recorded queryable mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SelectFields(Vec<String>),
    WhereEq(String, String),
    WhereEqBool(String, bool),
    WhereIn(String, Vec<String>),
    WhereInIds(String, Vec<i64>),
    WhereLike(String, String),
    WhereBetween(String, String, String),
    WhereGte(String, String),
    WhereLte(String, String),
    WithRelations(Vec<String>),
    OrderBy(String, Direction),
    OrderByExpr(String, Direction),
    OrderByRank(String, Vec<i64>),
    MatchNothing,
}

/// Queryable fake that records every mutation in call order.
#[derive(Debug, Default)]
pub struct RecordingQuery {
    pub calls: Vec<Call>,
}

impl RecordingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any predicate/projection/order call was recorded.
    pub fn is_untouched(&self) -> bool {
        self.calls.is_empty()
    }
}

impl Queryable for RecordingQuery {
    fn select_fields(&mut self, fields: &[String]) {
        self.calls.push(Call::SelectFields(fields.to_vec()));
    }

    fn where_eq(&mut self, column: &str, value: &str) {
        self.calls
            .push(Call::WhereEq(column.to_string(), value.to_string()));
    }

    fn where_eq_bool(&mut self, column: &str, value: bool) {
        self.calls.push(Call::WhereEqBool(column.to_string(), value));
    }

    fn where_in(&mut self, column: &str, values: &[String]) {
        self.calls
            .push(Call::WhereIn(column.to_string(), values.to_vec()));
    }

    fn where_in_ids(&mut self, column: &str, ids: &[i64]) {
        self.calls
            .push(Call::WhereInIds(column.to_string(), ids.to_vec()));
    }

    fn where_like(&mut self, column: &str, needle: &str) {
        self.calls
            .push(Call::WhereLike(column.to_string(), needle.to_string()));
    }

    fn where_between(&mut self, column: &str, start: &str, end: &str) {
        self.calls.push(Call::WhereBetween(
            column.to_string(),
            start.to_string(),
            end.to_string(),
        ));
    }

    fn where_gte(&mut self, column: &str, value: &str) {
        self.calls
            .push(Call::WhereGte(column.to_string(), value.to_string()));
    }

    fn where_lte(&mut self, column: &str, value: &str) {
        self.calls
            .push(Call::WhereLte(column.to_string(), value.to_string()));
    }

    fn with_relations(&mut self, paths: &[String]) {
        self.calls.push(Call::WithRelations(paths.to_vec()));
    }

    fn order_by(&mut self, column: &str, direction: Direction) {
        self.calls.push(Call::OrderBy(column.to_string(), direction));
    }

    fn order_by_expr(&mut self, expr: &str, direction: Direction) {
        self.calls
            .push(Call::OrderByExpr(expr.to_string(), direction));
    }

    fn order_by_rank(&mut self, column: &str, ids: &[i64]) {
        self.calls
            .push(Call::OrderByRank(column.to_string(), ids.to_vec()));
    }

    fn match_nothing(&mut self) {
        self.calls.push(Call::MatchNothing);
    }
}

/// Search backend returning a fixed ordered id list.
pub struct StaticSearch(pub Vec<i64>);

impl SearchBackend for StaticSearch {
    fn search<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, QueryResult<Vec<i64>>> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}

/// Version catalog returning a fixed version list.
pub struct StaticCatalog(pub Vec<String>);

impl StaticCatalog {
    pub fn from_strs(versions: &[&str]) -> Self {
        Self(versions.iter().map(|s| s.to_string()).collect())
    }
}

impl VersionCatalog for StaticCatalog {
    fn versions<'a>(&'a self) -> BoxFuture<'a, QueryResult<Vec<String>>> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}

/// A small specification exercising every engine feature: fuzzy and
/// boolean filters, flat includes, a dynamic attribute, and optional
/// search.
pub fn sample_spec(search: Option<Arc<dyn SearchBackend>>) -> ResourceSpec<RecordingQuery> {
    let mut filters = std::collections::BTreeMap::new();
    filters.insert(
        "name".to_string(),
        sync_filter(|query: &mut RecordingQuery, value: &str| {
            if !value.is_empty() {
                query.where_like("name", value);
            }
        }),
    );
    filters.insert(
        "featured".to_string(),
        sync_filter(|query: &mut RecordingQuery, value: &str| {
            match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => query.where_eq_bool("featured", true),
                "0" | "false" | "no" | "off" => query.where_eq_bool("featured", false),
                _ => {}
            }
        }),
    );
    filters.insert(
        "ids".to_string(),
        sync_filter(|query: &mut RecordingQuery, value: &str| {
            let ids: Vec<i64> = value
                .split(',')
                .filter_map(|part| part.trim().parse().ok())
                .collect();
            if !ids.is_empty() {
                query.where_in_ids("id", &ids);
            }
        }),
    );

    let mut dynamic_attributes = std::collections::BTreeMap::new();
    dynamic_attributes.insert("detail_url".to_string(), names(["slug"]));

    ResourceSpec {
        filters,
        includes: Includes::Flat(names(["owner", "versions"])),
        fields: names(["name", "slug", "created_at"]),
        required_fields: names(["id"]),
        dynamic_attributes,
        sorts: names(["name", "created_at"]),
        search,
        ..Default::default()
    }
}
