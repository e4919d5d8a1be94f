//! Mod version resource binding.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::query::filters::{fuzzy, id_list, range, semver_constraint, version_sort};
use crate::query::spec::{Includes, ResourceSpec, names};
use crate::query::sql::SelectQuery;
use crate::query::{QueryBuilder, Queryable};
use crate::version::VersionCatalog;

/// Base query scoped to visible versions of visible mods.
pub fn base_query() -> SelectQuery {
    let mut query = SelectQuery::new("mod_versions");
    query.where_eq_bool("disabled", false);
    query.and_where_raw(
        "mod_versions.published_at IS NOT NULL AND mod_versions.published_at <= NOW()",
    );
    query.and_where_raw(
        "EXISTS (SELECT 1 FROM mods WHERE mods.id = mod_versions.mod_id \
         AND mods.disabled = FALSE \
         AND mods.published_at IS NOT NULL AND mods.published_at <= NOW())",
    );
    query
}

/// Query specification for the mod versions listing.
///
/// `spt_catalog` supplies the live SPT version list the `spt_version`
/// constraint filter resolves against.
pub fn spec(spt_catalog: Arc<dyn VersionCatalog>) -> ResourceSpec<SelectQuery> {
    let mut filters = BTreeMap::new();
    filters.insert("id".to_string(), id_list("id"));
    filters.insert("hub_id".to_string(), id_list("hub_id"));
    filters.insert("version".to_string(), fuzzy("version"));
    filters.insert("description".to_string(), fuzzy("description"));
    filters.insert("link".to_string(), fuzzy("link"));
    filters.insert("virus_total_link".to_string(), fuzzy("virus_total_link"));
    filters.insert("downloads".to_string(), range("downloads"));
    filters.insert("created_at".to_string(), range("created_at"));
    filters.insert("updated_at".to_string(), range("updated_at"));
    filters.insert("published_at".to_string(), range("published_at"));
    filters.insert(
        "spt_version".to_string(),
        semver_constraint("spt_version", spt_catalog),
    );

    let mut includes = BTreeMap::new();
    includes.insert("mod".to_string(), vec!["mod".to_string()]);
    // One public include fans out into two underlying relation loads.
    includes.insert(
        "dependencies".to_string(),
        vec![
            "resolved_dependencies".to_string(),
            "resolved_dependencies.mod".to_string(),
        ],
    );

    let mut sort_overrides = BTreeMap::new();
    sort_overrides.insert("version".to_string(), version_sort("mod_versions"));

    ResourceSpec {
        filters,
        includes: Includes::Expanding(includes),
        fields: names([
            "hub_id",
            "version",
            "description",
            "link",
            "spt_version",
            "virus_total_link",
            "downloads",
            "created_at",
            "updated_at",
            "published_at",
        ]),
        required_fields: names(["id", "mod_id"]),
        sorts: names([
            "version",
            "downloads",
            "created_at",
            "updated_at",
            "published_at",
        ]),
        sort_overrides,
        ..Default::default()
    }
}

/// Convenience constructor for one request's builder.
pub fn builder(spt_catalog: Arc<dyn VersionCatalog>) -> QueryBuilder<SelectQuery> {
    QueryBuilder::new(spec(spt_catalog), base_query())
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
            ["3.8.0", "3.8.1", "3.9.0", "4.0.0"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ))
    }

    #[tokio::test]
    async fn spt_version_constraint_becomes_in_predicate() {
        let query = builder(catalog())
            .with_filters(Some(vec![("spt_version".to_string(), "~3.8.0".to_string())]))
            .build()
            .await
            .unwrap();
        let sql = query.build_select();
        assert!(sql.contains("\"spt_version\" IN ('3.8.0', '3.8.1')"));
    }

    #[tokio::test]
    async fn unsatisfiable_constraint_matches_nothing() {
        let query = builder(catalog())
            .with_filters(Some(vec![("spt_version".to_string(), "^9.0".to_string())]))
            .build()
            .await
            .unwrap();
        assert!(query.build_select().contains("FALSE"));
    }

    #[tokio::test]
    async fn dependencies_include_fans_out() {
        let query = builder(catalog())
            .with_includes(Some(vec!["dependencies".to_string()]))
            .build()
            .await
            .unwrap();
        assert_eq!(
            query.relations(),
            ["resolved_dependencies", "resolved_dependencies.mod"]
        );
    }

    #[tokio::test]
    async fn version_sort_decomposes_into_components() {
        let query = builder(catalog())
            .with_sorts(Some(vec!["-version".to_string()]))
            .build()
            .await
            .unwrap();
        let sql = query.build_select();
        assert!(sql.contains("\"version_major\" DESC"));
        assert!(sql.contains("\"version_minor\" DESC"));
        assert!(sql.contains("\"version_patch\" DESC"));
        assert!(sql.contains("CASE WHEN mod_versions.version_labels = '' THEN 0 ELSE 1 END"));
        assert!(sql.contains("\"version_labels\" DESC"));
    }

    #[tokio::test]
    async fn parent_mod_visibility_enforced() {
        let query = builder(catalog()).build().await.unwrap();
        assert!(query.build_select().contains("EXISTS (SELECT 1 FROM mods"));
    }
}
