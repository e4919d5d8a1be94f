//! Per-resource query specifications.
//!
//! A [`ResourceSpec`] declares what is legal to request for one
//! resource type: the filter whitelist (mapped to filter functions),
//! the includable relations, the selectable/required/dynamic fields,
//! and the sortable keys. It is plain configuration consumed by one
//! shared [`super::builder::QueryBuilder`], with no per-resource
//! subclassing.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::QueryResult;
use crate::query::queryable::{Direction, Queryable};
use crate::search::SearchBackend;

/// Boxed future alias used by the engine's async capability traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A filter applier: given the queryable and the raw request value,
/// narrow the query.
///
/// The apply phase is async so filters that consult live data (the
/// version catalog) can await; plain filters wrap a sync closure via
/// [`sync_filter`]. Filter appliers must be defensive no-ops on empty
/// values even though the builder already drops them.
pub trait Filter<Q>: Send + Sync {
    fn apply<'a>(&'a self, query: &'a mut Q, value: &'a str) -> BoxFuture<'a, QueryResult<()>>;
}

/// Shared handle to one filter applier.
pub type FilterFn<Q> = Arc<dyn Filter<Q>>;

/// A sort-application function replacing the default single-column
/// ordering for one sort key (e.g. decomposed version ordering).
pub type SortFn<Q> = Arc<dyn Fn(&mut Q, Direction) + Send + Sync>;

struct SyncFilter<F>(F);

impl<Q, F> Filter<Q> for SyncFilter<F>
where
    Q: Queryable + Send,
    F: Fn(&mut Q, &str) + Send + Sync,
{
    fn apply<'a>(&'a self, query: &'a mut Q, value: &'a str) -> BoxFuture<'a, QueryResult<()>> {
        (self.0)(query, value);
        Box::pin(async { Ok(()) })
    }
}

/// Wrap a synchronous filter body into a [`FilterFn`].
pub fn sync_filter<Q, F>(f: F) -> FilterFn<Q>
where
    Q: Queryable + Send + 'static,
    F: Fn(&mut Q, &str) + Send + Sync + 'static,
{
    Arc::new(SyncFilter(f))
}

/// Includable relations for one resource.
///
/// Either a flat set (public name equals the relation path) or an
/// expanding map where one public name fans out into one or more
/// underlying relation paths. Decided once at specification
/// construction time, never re-inspected at runtime.
#[derive(Debug, Clone)]
pub enum Includes {
    Flat(BTreeSet<String>),
    Expanding(BTreeMap<String, Vec<String>>),
}

impl Includes {
    /// Whether the public include name is allowed.
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::Flat(set) => set.contains(name),
            Self::Expanding(map) => map.contains_key(name),
        }
    }

    /// The sorted list of valid public names, for error messages.
    pub fn valid_names(&self) -> Vec<String> {
        match self {
            Self::Flat(set) => set.iter().cloned().collect(),
            Self::Expanding(map) => map.keys().cloned().collect(),
        }
    }

    /// Expand a validated public name into its relation paths.
    pub fn expand(&self, name: &str) -> Vec<String> {
        match self {
            Self::Flat(_) => vec![name.to_string()],
            Self::Expanding(map) => map.get(name).cloned().unwrap_or_default(),
        }
    }
}

/// Immutable per-resource query configuration.
///
/// One instance is constructed per request (cheap) and read-only
/// thereafter; the builder never mutates it.
pub struct ResourceSpec<Q> {
    /// Primary-key column, used by search ranking and `find_or_fail`.
    pub primary_key: String,

    /// Public filter name → filter function.
    pub filters: BTreeMap<String, FilterFn<Q>>,

    /// Includable relations.
    pub includes: Includes,

    /// Fields the caller may explicitly select.
    pub fields: BTreeSet<String>,

    /// Fields always projected regardless of selection (identity and
    /// relation foreign keys); exempt from whitelist validation.
    pub required_fields: BTreeSet<String>,

    /// Computed output field → underlying fields it depends on.
    pub dynamic_attributes: BTreeMap<String, BTreeSet<String>>,

    /// Sortable field names (direction comes from the request token).
    pub sorts: BTreeSet<String>,

    /// Sort keys whose ordering is replaced by a custom function.
    pub sort_overrides: BTreeMap<String, SortFn<Q>>,

    /// Full-text search capability; `None` means the resource is not
    /// searchable and search parameters are silently skipped.
    pub search: Option<Arc<dyn SearchBackend>>,
}

impl<Q> Default for ResourceSpec<Q> {
    fn default() -> Self {
        Self {
            primary_key: "id".to_string(),
            filters: BTreeMap::new(),
            includes: Includes::Flat(BTreeSet::new()),
            fields: BTreeSet::new(),
            required_fields: BTreeSet::new(),
            dynamic_attributes: BTreeMap::new(),
            sorts: BTreeSet::new(),
            sort_overrides: BTreeMap::new(),
            search: None,
        }
    }
}

/// Build a name set from string literals.
pub fn names<const N: usize>(items: [&str; N]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn flat_includes_expand_to_themselves() {
        let includes = Includes::Flat(names(["owner", "versions"]));
        assert!(includes.contains("owner"));
        assert!(!includes.contains("bogus"));
        assert_eq!(includes.expand("owner"), vec!["owner"]);
    }

    #[test]
    fn expanding_includes_fan_out() {
        let mut map = BTreeMap::new();
        map.insert(
            "dependencies".to_string(),
            vec![
                "resolved_dependencies".to_string(),
                "resolved_dependencies.mod".to_string(),
            ],
        );
        let includes = Includes::Expanding(map);
        assert_eq!(includes.expand("dependencies").len(), 2);
        assert_eq!(includes.valid_names(), vec!["dependencies"]);
    }

    #[test]
    fn valid_names_are_sorted() {
        let includes = Includes::Flat(names(["versions", "license", "owner"]));
        assert_eq!(includes.valid_names(), vec!["license", "owner", "versions"]);
    }
}
