//! Query composition.
//!
//! [`QueryBuilder`] takes one [`ResourceSpec`] plus the untrusted
//! request parameters and applies them to the resource's base query in
//! a fixed order: filters, includes, field projection, sorts, search.
//! Every parameter is validated against its whitelist before anything
//! from that step is applied; a single unknown token fails the whole
//! request with a message naming the token and the valid alternatives.

use std::collections::BTreeSet;
use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::{QueryError, QueryResult};
use crate::params::QueryParams;
use crate::query::queryable::{Direction, Queryable};
use crate::query::spec::ResourceSpec;
use crate::query::sql::{Page, SelectQuery};

/// Hard upper bound on page sizes, independent of configuration.
const MAX_PER_PAGE: u32 = 50;

/// Composes one request's parameters onto one resource query.
///
/// Constructed per request; the queryable is exclusively owned and the
/// specification is read-only. `apply` is intended to be called once;
/// calling it again reapplies onto the same cumulative queryable.
pub struct QueryBuilder<Q> {
    spec: ResourceSpec<Q>,
    query: Q,
    filters: Vec<(String, String)>,
    includes: Vec<String>,
    fields: Vec<String>,
    sorts: Vec<String>,
    search: Option<String>,
}

impl<Q> QueryBuilder<Q>
where
    Q: Queryable + Send,
{
    /// Create a builder over a base query already scoped to the
    /// resource's visibility rules.
    pub fn new(spec: ResourceSpec<Q>, base: Q) -> Self {
        Self {
            spec,
            query: base,
            filters: Vec::new(),
            includes: Vec::new(),
            fields: Vec::new(),
            sorts: Vec::new(),
            search: None,
        }
    }

    /// Set filter name/value pairs; `None` leaves the default.
    pub fn with_filters(mut self, filters: Option<Vec<(String, String)>>) -> Self {
        if let Some(filters) = filters {
            self.filters = filters;
        }
        self
    }

    /// Set requested include names; `None` leaves the default.
    pub fn with_includes(mut self, includes: Option<Vec<String>>) -> Self {
        if let Some(includes) = includes {
            self.includes = includes;
        }
        self
    }

    /// Set requested output fields; `None` leaves the default.
    pub fn with_fields(mut self, fields: Option<Vec<String>>) -> Self {
        if let Some(fields) = fields {
            self.fields = fields;
        }
        self
    }

    /// Set sort tokens (`-` prefix for descending); `None` leaves the
    /// default.
    pub fn with_sorts(mut self, sorts: Option<Vec<String>>) -> Self {
        if let Some(sorts) = sorts {
            self.sorts = sorts;
        }
        self
    }

    /// Set the free-text search query; `None` leaves the default.
    pub fn with_search(mut self, search: Option<String>) -> Self {
        if let Some(search) = search {
            self.search = Some(search);
        }
        self
    }

    /// Apply a full parsed parameter set in one call.
    pub fn with_params(self, params: QueryParams) -> Self {
        self.with_filters(Some(params.filters))
            .with_includes(Some(params.includes))
            .with_fields(Some(params.fields))
            .with_sorts(Some(params.sorts))
            .with_search(params.search)
    }

    /// Validate and apply all parameters, in the fixed order
    /// filters → includes → fields → sorts → search.
    ///
    /// On validation failure the queryable is abandoned by the caller;
    /// earlier steps' mutations are not rolled back.
    pub async fn apply(&mut self) -> QueryResult<()> {
        self.apply_filters().await?;
        self.apply_includes()?;
        self.apply_fields()?;
        self.apply_sorts()?;
        self.apply_search().await?;
        Ok(())
    }

    /// Consume the builder, returning the composed queryable.
    pub async fn build(mut self) -> QueryResult<Q> {
        self.apply().await?;
        Ok(self.query)
    }

    /// The queryable in its current composition state.
    pub fn queryable(&self) -> &Q {
        &self.query
    }

    async fn apply_filters(&mut self) -> QueryResult<()> {
        let requested: Vec<(String, String)> = self
            .filters
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .cloned()
            .collect();
        if requested.is_empty() {
            return Ok(());
        }

        let invalid: Vec<String> = requested
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| !self.spec.filters.contains_key(name))
            .collect();
        if !invalid.is_empty() {
            let valid: Vec<String> = self.spec.filters.keys().cloned().collect();
            return Err(QueryError::unknown_tokens("filter", &invalid, &valid));
        }

        for (name, value) in &requested {
            let Some(filter) = self.spec.filters.get(name).map(Arc::clone) else {
                continue;
            };
            filter.apply(&mut self.query, value).await?;
        }
        Ok(())
    }

    fn apply_includes(&mut self) -> QueryResult<()> {
        let requested: Vec<String> = self
            .includes
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        if requested.is_empty() {
            return Ok(());
        }

        // Validate every name before expanding any of them.
        let invalid: Vec<String> = requested
            .iter()
            .filter(|name| !self.spec.includes.contains(name))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            let valid = self.spec.includes.valid_names();
            return Err(QueryError::unknown_tokens("include", &invalid, &valid));
        }

        let mut paths: Vec<String> = Vec::new();
        for name in &requested {
            for path in self.spec.includes.expand(name) {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        self.query.with_relations(&paths);
        Ok(())
    }

    fn apply_fields(&mut self) -> QueryResult<()> {
        let requested: Vec<String> = self
            .fields
            .iter()
            .map(|field| field.trim().to_string())
            .filter(|field| !field.is_empty())
            .collect();
        let required: BTreeSet<String> = self
            .spec
            .required_fields
            .iter()
            .filter(|field| !field.is_empty())
            .cloned()
            .collect();

        let projected: BTreeSet<String> = if requested.is_empty() {
            // Never silently select everything from storage.
            self.spec.fields.union(&required).cloned().collect()
        } else {
            let dynamic_names: BTreeSet<String> =
                self.spec.dynamic_attributes.keys().cloned().collect();

            let invalid: Vec<String> = requested
                .iter()
                .filter(|field| !required.contains(*field))
                .filter(|field| {
                    !self.spec.fields.contains(*field) && !dynamic_names.contains(*field)
                })
                .cloned()
                .collect();
            if !invalid.is_empty() {
                let valid: Vec<String> = self
                    .spec
                    .fields
                    .iter()
                    .chain(dynamic_names.iter())
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                return Err(QueryError::unknown_tokens("field", &invalid, &valid));
            }

            // Dynamic attribute names are not storage columns; they pull
            // in their dependency fields instead.
            let dependency_fields = requested
                .iter()
                .filter(|field| dynamic_names.contains(*field))
                .flat_map(|field| {
                    self.spec
                        .dynamic_attributes
                        .get(field)
                        .cloned()
                        .unwrap_or_default()
                });

            requested
                .iter()
                .filter(|field| !dynamic_names.contains(*field))
                .cloned()
                .chain(required.iter().cloned())
                .chain(dependency_fields)
                .collect()
        };

        let columns: Vec<String> = projected.into_iter().collect();
        self.query.select_fields(&columns);
        Ok(())
    }

    fn apply_sorts(&mut self) -> QueryResult<()> {
        let tokens: Vec<String> = self
            .sorts
            .iter()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .collect();
        if tokens.is_empty() {
            return Ok(());
        }

        let parsed: Vec<(String, Direction)> = tokens
            .iter()
            .map(|token| match token.strip_prefix('-') {
                Some(name) => (name.to_string(), Direction::Desc),
                None => (token.clone(), Direction::Asc),
            })
            .collect();

        let invalid: Vec<String> = parsed
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| !self.spec.sorts.contains(name))
            .collect();
        if !invalid.is_empty() {
            let valid: Vec<String> = self.spec.sorts.iter().cloned().collect();
            return Err(QueryError::unknown_tokens("sort", &invalid, &valid));
        }

        // Multiple tokens compose into a multi-key ordering; the first
        // token is primary, later ones break ties.
        for (name, direction) in &parsed {
            if let Some(sort) = self.spec.sort_overrides.get(name).map(Arc::clone) {
                sort.as_ref()(&mut self.query, *direction);
            } else {
                self.query.order_by(name, *direction);
            }
        }
        Ok(())
    }

    async fn apply_search(&mut self) -> QueryResult<()> {
        let Some(term) = self.search.clone() else {
            return Ok(());
        };
        let term = term.trim().to_string();
        if term.is_empty() {
            return Ok(());
        }

        let Some(backend) = self.spec.search.as_ref().map(Arc::clone) else {
            // Not all resources are searchable; degrade to the composed
            // result rather than erroring.
            tracing::debug!("search requested on non-searchable resource, skipping");
            return Ok(());
        };

        let ids = backend.search(&term).await?;
        if ids.is_empty() {
            // A searched query that matches nothing must not fall back
            // to the unsearched result set.
            self.query.match_nothing();
            return Ok(());
        }

        let primary_key = self.spec.primary_key.clone();
        self.query.where_in_ids(&primary_key, &ids);
        self.query.order_by_rank(&primary_key, &ids);
        Ok(())
    }
}

impl QueryBuilder<SelectQuery> {
    /// Compose and execute, returning all matching records.
    pub async fn get(mut self, pool: &PgPool) -> QueryResult<Vec<serde_json::Value>> {
        self.apply().await?;
        self.query.fetch_all(pool).await
    }

    /// Compose and execute one page of results.
    ///
    /// An absent or zero `per_page` falls back to the configured
    /// default; the configured maximum bounds explicit requests, and
    /// [`MAX_PER_PAGE`] is the absolute ceiling no configuration can
    /// raise.
    pub async fn paginate(
        mut self,
        pool: &PgPool,
        config: &Config,
        page: u32,
        per_page: Option<u32>,
    ) -> QueryResult<Page> {
        let per_page = effective_per_page(config, per_page);
        self.apply().await?;
        self.query.fetch_page(pool, page.max(1), per_page).await
    }

    /// Compose and fetch a single record by primary key.
    pub async fn find_or_fail(mut self, pool: &PgPool, id: i64) -> QueryResult<serde_json::Value> {
        self.apply().await?;
        let primary_key = self.spec.primary_key.clone();
        self.query.fetch_one_by_id(pool, &primary_key, id).await
    }
}

/// Resolve the page size from the request and configuration.
fn effective_per_page(config: &Config, requested: Option<u32>) -> u32 {
    let per_page = config.clamp_per_page(requested);
    if per_page > MAX_PER_PAGE {
        tracing::warn!(
            configured = per_page,
            capped = MAX_PER_PAGE,
            "per_page exceeds hard maximum, capping"
        );
        return MAX_PER_PAGE;
    }
    per_page
}
