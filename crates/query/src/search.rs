//! Full-text search capability.
//!
//! Resources that support search expose a backend returning matching
//! identifiers in relevance order; the query builder constrains the
//! composed query to those identifiers and imposes the backend's
//! ordering. Uses PostgreSQL tsvector columns with GIN indexes.

use sqlx::PgPool;
use tracing::debug;

use crate::error::QueryResult;
use crate::query::spec::BoxFuture;

/// Search capability: free-text query → ordered matching identifiers.
pub trait SearchBackend: Send + Sync {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, QueryResult<Vec<i64>>>;
}

/// tsvector-backed search over one table's `search_vector` column.
#[derive(Clone)]
pub struct PgSearchBackend {
    pool: PgPool,
    table: String,
}

impl PgSearchBackend {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

impl SearchBackend for PgSearchBackend {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, QueryResult<Vec<i64>>> {
        Box::pin(async move {
            let Some(ts_query) = to_tsquery(query) else {
                return Ok(Vec::new());
            };

            debug!(query, ts_query = %ts_query, table = %self.table, "executing search");

            let ids: Vec<i64> = sqlx::query_scalar(&format!(
                r#"
                SELECT id
                FROM {table}
                WHERE search_vector @@ to_tsquery('english', $1)
                ORDER BY ts_rank(search_vector, to_tsquery('english', $1)) DESC, id ASC
                "#,
                table = self.table
            ))
            .bind(&ts_query)
            .fetch_all(&self.pool)
            .await?;

            debug!(matched = ids.len(), "search completed");
            Ok(ids)
        })
    }
}

/// Convert a free-text query to prefix-matching tsquery form.
///
/// Keeps only alphanumeric characters and spaces, then ANDs the terms
/// with prefix matching. Returns `None` when nothing usable remains.
fn to_tsquery(query: &str) -> Option<String> {
    let sanitized: String = query
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let terms: Vec<String> = sanitized
        .split_whitespace()
        .map(|term| format!("{term}:*"))
        .collect();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" & "))
}

impl std::fmt::Debug for PgSearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSearchBackend")
            .field("table", &self.table)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn tsquery_ands_terms_with_prefix_matching() {
        assert_eq!(to_tsquery("raid maps"), Some("raid:* & maps:*".to_string()));
    }

    #[test]
    fn tsquery_strips_special_characters() {
        let ts = to_tsquery("rust's | ! & (mod)").unwrap();
        assert!(!ts.contains('|'));
        assert!(!ts.contains('!'));
        assert!(!ts.contains('('));
        assert!(ts.contains("rust:*"));
        assert!(ts.contains("mod:*"));
    }

    #[test]
    fn tsquery_empty_when_nothing_usable() {
        assert_eq!(to_tsquery("!!! ???"), None);
        assert_eq!(to_tsquery(""), None);
    }
}
