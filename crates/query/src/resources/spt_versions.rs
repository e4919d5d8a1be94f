//! SPT version resource binding.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::query::QueryBuilder;
use crate::query::filters::{id_list, range, semver_constraint, version_sort};
use crate::query::spec::{Includes, ResourceSpec, names};
use crate::query::sql::SelectQuery;
use crate::version::VersionCatalog;

/// Base query; every SPT version is publicly listable.
pub fn base_query() -> SelectQuery {
    SelectQuery::new("spt_versions")
}

/// Query specification for the SPT versions listing.
///
/// The `version` filter resolves constraints against the catalog of
/// this same table, so `^3.8` narrows to the releases satisfying it.
pub fn spec(catalog: Arc<dyn VersionCatalog>) -> ResourceSpec<SelectQuery> {
    let mut filters = BTreeMap::new();
    filters.insert("id".to_string(), id_list("id"));
    filters.insert("version".to_string(), semver_constraint("version", catalog));
    filters.insert("version_major".to_string(), id_list("version_major"));
    filters.insert("version_minor".to_string(), id_list("version_minor"));
    filters.insert("version_patch".to_string(), id_list("version_patch"));
    filters.insert("created_at".to_string(), range("created_at"));
    filters.insert("updated_at".to_string(), range("updated_at"));

    let mut sort_overrides = BTreeMap::new();
    sort_overrides.insert("version".to_string(), version_sort("spt_versions"));

    ResourceSpec {
        filters,
        includes: Includes::Flat(names([])),
        fields: names([
            "version",
            "version_major",
            "version_minor",
            "version_patch",
            "version_labels",
            "color_class",
            "link",
            "created_at",
            "updated_at",
        ]),
        required_fields: names(["id"]),
        sorts: names(["version", "created_at", "updated_at"]),
        sort_overrides,
        ..Default::default()
    }
}

/// Convenience constructor for one request's builder.
pub fn builder(catalog: Arc<dyn VersionCatalog>) -> QueryBuilder<SelectQuery> {
    QueryBuilder::new(spec(catalog), base_query())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::QueryResult;
    use crate::query::spec::BoxFuture;

    struct StaticCatalog(Vec<String>);

    impl VersionCatalog for StaticCatalog {
        fn versions<'a>(&'a self) -> BoxFuture<'a, QueryResult<Vec<String>>> {
            Box::pin(async move { Ok(self.0.clone()) })
        }
    }

    fn catalog() -> Arc<dyn VersionCatalog> {
        Arc::new(StaticCatalog(
            ["3.8.0", "3.9.0", "4.0.0"].iter().map(|s| s.to_string()).collect(),
        ))
    }

    #[tokio::test]
    async fn version_constraint_narrows_listing() {
        let query = builder(catalog())
            .with_filters(Some(vec![("version".to_string(), ">=3.9.0".to_string())]))
            .build()
            .await
            .unwrap();
        assert!(query.build_select().contains("\"version\" IN ('3.9.0', '4.0.0')"));
    }

    #[tokio::test]
    async fn any_include_is_rejected() {
        let result = builder(catalog())
            .with_includes(Some(vec!["mods".to_string()]))
            .build()
            .await;
        assert!(result.unwrap_err().to_string().contains("unknown include(s): mods"));
    }

    #[tokio::test]
    async fn version_sort_uses_decomposed_columns() {
        let query = builder(catalog())
            .with_sorts(Some(vec!["version".to_string()]))
            .build()
            .await
            .unwrap();
        let sql = query.build_select();
        assert!(sql.contains("\"version_major\" ASC"));
        assert!(sql.contains("CASE WHEN spt_versions.version_labels = '' THEN 0 ELSE 1 END"));
    }
}
