//! Semantic-version constraint resolution and ordering.
//!
//! Version filters accept composer-style range expressions (`^1.2`,
//! `~2.0.1`, `>=1.0 <2.0`, `1.0.0 - 2.0.0`, `||`-separated
//! alternatives) and resolve them against the live list of known
//! version strings; the satisfying subset becomes an `IN` predicate.
//! Versions also sort by their decomposed components because a single
//! string column cannot order `1.10.0` after `1.9.0`.

use semver::{Version, VersionReq};
use sqlx::PgPool;

use crate::error::QueryResult;
use crate::query::spec::BoxFuture;

/// Live source of known version strings.
///
/// Queried fresh per filter invocation; version sets grow over time,
/// so the satisfying subset is never computed from a static snapshot.
pub trait VersionCatalog: Send + Sync {
    fn versions<'a>(&'a self) -> BoxFuture<'a, QueryResult<Vec<String>>>;
}

/// Version catalog backed by a Postgres table with a `version` column.
#[derive(Clone)]
pub struct PgVersionCatalog {
    pool: PgPool,
    table: String,
}

impl PgVersionCatalog {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

impl VersionCatalog for PgVersionCatalog {
    fn versions<'a>(&'a self) -> BoxFuture<'a, QueryResult<Vec<String>>> {
        Box::pin(async move {
            let versions: Vec<String> =
                sqlx::query_scalar(&format!("SELECT version FROM {}", self.table))
                    .fetch_all(&self.pool)
                    .await?;
            Ok(versions)
        })
    }
}

/// Return the subset of `versions` satisfying `constraint`, preserving
/// input order.
///
/// Unparseable catalog entries are skipped; an unparseable constraint
/// matches nothing. Pre-release versions only match alternatives that
/// themselves name a pre-release, per semver matching rules.
pub fn matching_versions(versions: &[String], constraint: &str) -> Vec<String> {
    let Some(alternatives) = parse_constraint(constraint) else {
        return Vec::new();
    };

    versions
        .iter()
        .filter(|raw| {
            Version::parse(raw.trim())
                .map(|version| alternatives.iter().any(|req| req.matches(&version)))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Parse a constraint into its `||`-separated alternatives.
///
/// Returns `None` if any alternative fails to parse, so malformed
/// constraints fail closed instead of widening the match.
fn parse_constraint(constraint: &str) -> Option<Vec<VersionReq>> {
    let constraint = constraint.trim();
    if constraint.is_empty() {
        return None;
    }

    constraint
        .split("||")
        .map(|alternative| VersionReq::parse(&normalize_alternative(alternative)).ok())
        .collect()
}

/// Rewrite grammar `semver::VersionReq` does not accept natively.
///
/// Hyphen ranges (`"1.0.0 - 2.0.0"`) become two-sided comparator pairs,
/// and space-separated comparators (`">=1.0 <2.0"`) become comma-joined.
fn normalize_alternative(alternative: &str) -> String {
    let alternative = alternative.trim();

    if let Some((low, high)) = alternative.split_once(" - ") {
        return format!(">={}, <={}", low.trim(), high.trim());
    }

    if alternative.contains(' ') && !alternative.contains(',') {
        return alternative.split_whitespace().collect::<Vec<_>>().join(", ");
    }

    alternative.to_string()
}

/// Decomposed sort key: `(major, minor, patch, label)`.
///
/// The empty label is a release, which orders before any pre-release
/// label at equal major.minor.patch (`1.1.0` before `1.1.0-alpha`).
pub fn sort_key(version: &str) -> Option<(u64, u64, u64, String)> {
    let parsed = Version::parse(version.trim()).ok()?;
    Some((
        parsed.major,
        parsed.minor,
        parsed.patch,
        parsed.pre.as_str().to_string(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn catalog() -> Vec<String> {
        ["1.0.0", "1.1.0", "1.2.0", "1.2.3", "2.0.0", "3.8.1", "3.9.0"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn caret_constraint() {
        let matched = matching_versions(&catalog(), "^1.2");
        assert_eq!(matched, vec!["1.2.0", "1.2.3"]);
    }

    #[test]
    fn tilde_constraint() {
        let matched = matching_versions(&catalog(), "~1.2.0");
        assert_eq!(matched, vec!["1.2.0", "1.2.3"]);
    }

    #[test]
    fn comparison_constraint() {
        let matched = matching_versions(&catalog(), ">=2.0.0");
        assert_eq!(matched, vec!["2.0.0", "3.8.1", "3.9.0"]);
    }

    #[test]
    fn two_sided_space_separated_constraint() {
        let matched = matching_versions(&catalog(), ">=1.1.0 <2.0.0");
        assert_eq!(matched, vec!["1.1.0", "1.2.0", "1.2.3"]);
    }

    #[test]
    fn hyphen_range_constraint() {
        let matched = matching_versions(&catalog(), "1.1.0 - 2.0.0");
        assert_eq!(matched, vec!["1.1.0", "1.2.0", "1.2.3", "2.0.0"]);
    }

    #[test]
    fn or_alternatives() {
        let matched = matching_versions(&catalog(), "~1.0.0 || ^3.8");
        assert_eq!(matched, vec!["1.0.0", "3.8.1", "3.9.0"]);
    }

    #[test]
    fn invalid_constraint_matches_nothing() {
        assert!(matching_versions(&catalog(), "not-a-range").is_empty());
        assert!(matching_versions(&catalog(), "").is_empty());
    }

    #[test]
    fn invalid_catalog_entries_skipped() {
        let versions = vec!["1.0.0".to_string(), "garbage".to_string()];
        assert_eq!(matching_versions(&versions, ">=0.1.0"), vec!["1.0.0"]);
    }

    #[test]
    fn sort_key_orders_release_before_prerelease() {
        let mut tokens = vec![
            "2.0.0",
            "1.2.1",
            "1.2.0",
            "1.1.1",
            "1.1.0-beta",
            "1.1.0-alpha",
            "1.1.0",
            "1.0.0",
        ];
        tokens.sort_by_key(|t| sort_key(t).unwrap());
        assert_eq!(
            tokens,
            vec![
                "1.0.0",
                "1.1.0",
                "1.1.0-alpha",
                "1.1.0-beta",
                "1.1.1",
                "1.2.0",
                "1.2.1",
                "2.0.0",
            ]
        );
    }
}
