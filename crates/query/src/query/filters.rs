//! Reusable filter and sort constructors for resource specifications.
//!
//! Each constructor returns a [`FilterFn`] implementing one of the
//! public API's filter grammars: comma-separated id lists, fuzzy
//! substring match, boolean coercion, two-endpoint ranges, and
//! semver-style version constraints resolved against a live catalog.

use std::sync::Arc;

use crate::error::QueryResult;
use crate::query::queryable::{Direction, Queryable};
use crate::query::spec::{BoxFuture, Filter, FilterFn, SortFn, sync_filter};
use crate::version::{self, VersionCatalog};

/// Comma-separated integer ids → `IN` predicate.
///
/// Non-numeric entries are dropped; a value with no usable ids matches
/// nothing rather than silently widening to the whole set.
pub fn id_list<Q: Queryable + Send + 'static>(column: &'static str) -> FilterFn<Q> {
    sync_filter(move |query: &mut Q, value| {
        if value.is_empty() {
            return;
        }
        let ids = parse_id_list(value);
        if ids.is_empty() {
            query.match_nothing();
        } else {
            query.where_in_ids(column, &ids);
        }
    })
}

/// Escaped substring match.
pub fn fuzzy<Q: Queryable + Send + 'static>(column: &'static str) -> FilterFn<Q> {
    sync_filter(move |query: &mut Q, value| {
        if !value.is_empty() {
            query.where_like(column, value);
        }
    })
}

/// Exact equality.
pub fn exact<Q: Queryable + Send + 'static>(column: &'static str) -> FilterFn<Q> {
    sync_filter(move |query: &mut Q, value| {
        if !value.is_empty() {
            query.where_eq(column, value);
        }
    })
}

/// Boolean coercion: `1|true|yes|on` / `0|false|no|off`.
///
/// Unrecognized values are a no-op, not an error.
pub fn boolean<Q: Queryable + Send + 'static>(column: &'static str) -> FilterFn<Q> {
    sync_filter(move |query: &mut Q, value| {
        if let Some(flag) = parse_bool(value) {
            query.where_eq_bool(column, flag);
        }
    })
}

/// Two-endpoint `"start,end"` range; a single endpoint degrades to a
/// one-sided bound.
pub fn range<Q: Queryable + Send + 'static>(column: &'static str) -> FilterFn<Q> {
    sync_filter(move |query: &mut Q, value| {
        if value.is_empty() {
            return;
        }
        match split_range(value) {
            (Some(start), Some(end)) => query.where_between(column, start, end),
            (Some(start), None) => query.where_gte(column, start),
            (None, Some(end)) => query.where_lte(column, end),
            (None, None) => {}
        }
    })
}

/// Semver-style constraint resolved against the live version catalog.
///
/// The catalog is fetched fresh per invocation; the satisfying subset
/// becomes an `IN` predicate, and an unsatisfiable constraint matches
/// nothing.
pub fn semver_constraint<Q>(column: &'static str, catalog: Arc<dyn VersionCatalog>) -> FilterFn<Q>
where
    Q: Queryable + Send + 'static,
{
    Arc::new(ConstraintFilter { column, catalog })
}

struct ConstraintFilter {
    column: &'static str,
    catalog: Arc<dyn VersionCatalog>,
}

impl<Q> Filter<Q> for ConstraintFilter
where
    Q: Queryable + Send,
{
    fn apply<'a>(&'a self, query: &'a mut Q, value: &'a str) -> BoxFuture<'a, QueryResult<()>> {
        Box::pin(async move {
            let constraint = value.trim();
            if constraint.is_empty() {
                return Ok(());
            }
            let versions = self.catalog.versions().await?;
            let matching = version::matching_versions(&versions, constraint);
            if matching.is_empty() {
                query.match_nothing();
            } else {
                query.where_in(self.column, &matching);
            }
            Ok(())
        })
    }
}

/// Decomposed version ordering: major, minor, patch, then label, with
/// the empty label (a release) ahead of any pre-release label at equal
/// major.minor.patch.
pub fn version_sort<Q: Queryable>(table: &'static str) -> SortFn<Q> {
    Arc::new(move |query, direction| {
        query.order_by("version_major", direction);
        query.order_by("version_minor", direction);
        query.order_by("version_patch", direction);
        query.order_by_expr(
            &format!("CASE WHEN {table}.version_labels = '' THEN 0 ELSE 1 END"),
            Direction::Asc,
        );
        query.order_by("version_labels", direction);
    })
}

/// Parse a comma-separated integer list, dropping non-numeric entries.
pub fn parse_id_list(value: &str) -> Vec<i64> {
    value
        .split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

/// Coerce a request value to a boolean, if recognizable.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a `"start,end"` range into its endpoints.
fn split_range(value: &str) -> (Option<&str>, Option<&str>) {
    let (start, end) = match value.split_once(',') {
        Some((start, end)) => (start.trim(), end.trim()),
        None => (value.trim(), ""),
    };
    (
        (!start.is_empty()).then_some(start),
        (!end.is_empty()).then_some(end),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn id_list_parses_comma_separated_integers() {
        assert_eq!(parse_id_list("4,7,12"), vec![4, 7, 12]);
        assert_eq!(parse_id_list("4, 7 ,12"), vec![4, 7, 12]);
        assert_eq!(parse_id_list("4,abc,12"), vec![4, 12]);
        assert!(parse_id_list("abc").is_empty());
    }

    #[test]
    fn bool_coercion_table() {
        for value in ["1", "true", "yes", "on", "TRUE", "Yes"] {
            assert_eq!(parse_bool(value), Some(true), "{value}");
        }
        for value in ["0", "false", "no", "off", "FALSE", "No"] {
            assert_eq!(parse_bool(value), Some(false), "{value}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn range_splits_endpoints() {
        assert_eq!(split_range("a,b"), (Some("a"), Some("b")));
        assert_eq!(split_range("a,"), (Some("a"), None));
        assert_eq!(split_range(",b"), (None, Some("b")));
        assert_eq!(split_range("a"), (Some("a"), None));
    }
}
