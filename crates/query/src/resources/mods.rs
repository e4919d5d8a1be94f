//! Mod resource binding.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::query::filters::{boolean, fuzzy, id_list, range};
use crate::query::spec::{Includes, ResourceSpec, names};
use crate::query::sql::SelectQuery;
use crate::query::{QueryBuilder, Queryable};
use crate::search::SearchBackend;

/// Base query scoped to publicly visible mods: enabled and currently
/// published.
pub fn base_query() -> SelectQuery {
    let mut query = SelectQuery::new("mods");
    query.where_eq_bool("disabled", false);
    query.and_where_raw("mods.published_at IS NOT NULL AND mods.published_at <= NOW()");
    query
}

/// Query specification for the mods listing.
pub fn spec(search: Option<Arc<dyn SearchBackend>>) -> ResourceSpec<SelectQuery> {
    let mut filters = BTreeMap::new();
    filters.insert("id".to_string(), id_list("id"));
    filters.insert("hub_id".to_string(), id_list("hub_id"));
    filters.insert("name".to_string(), fuzzy("name"));
    filters.insert("slug".to_string(), fuzzy("slug"));
    filters.insert("teaser".to_string(), fuzzy("teaser"));
    filters.insert("source_code_link".to_string(), fuzzy("source_code_link"));
    filters.insert("featured".to_string(), boolean("featured"));
    filters.insert("contains_ads".to_string(), boolean("contains_ads"));
    filters.insert(
        "contains_ai_content".to_string(),
        boolean("contains_ai_content"),
    );
    filters.insert("created_at".to_string(), range("created_at"));
    filters.insert("updated_at".to_string(), range("updated_at"));
    filters.insert("published_at".to_string(), range("published_at"));

    let mut dynamic_attributes = BTreeMap::new();
    dynamic_attributes.insert("detail_url".to_string(), names(["slug"]));

    ResourceSpec {
        filters,
        includes: Includes::Flat(names(["license", "owner", "versions"])),
        fields: names([
            "hub_id",
            "name",
            "slug",
            "teaser",
            "description",
            "thumbnail",
            "source_code_link",
            "featured",
            "contains_ads",
            "contains_ai_content",
            "downloads",
            "created_at",
            "updated_at",
            "published_at",
        ]),
        required_fields: names(["id", "owner_id", "license_id"]),
        dynamic_attributes,
        sorts: names([
            "name",
            "downloads",
            "featured",
            "created_at",
            "updated_at",
            "published_at",
        ]),
        search,
        ..Default::default()
    }
}

/// Convenience constructor for one request's builder.
pub fn builder(search: Option<Arc<dyn SearchBackend>>) -> QueryBuilder<SelectQuery> {
    QueryBuilder::new(spec(search), base_query())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn base_scope_restricts_visibility() {
        let query = builder(None).build().await.unwrap();
        let sql = query.build_select();
        assert!(sql.contains("\"disabled\" = FALSE"));
        assert!(sql.contains("published_at IS NOT NULL"));
    }

    #[tokio::test]
    async fn default_projection_is_allowed_plus_required() {
        let query = builder(None).build().await.unwrap();
        let sql = query.build_select();
        assert!(sql.contains("\"mods\".\"id\""));
        assert!(sql.contains("\"mods\".\"owner_id\""));
        assert!(sql.contains("\"mods\".\"name\""));
        assert!(!sql.contains("\"mods\".*"));
    }

    #[tokio::test]
    async fn featured_filter_coerces_boolean() {
        let query = builder(None)
            .with_filters(Some(vec![("featured".to_string(), "yes".to_string())]))
            .build()
            .await
            .unwrap();
        assert!(query.build_select().contains("\"featured\" = TRUE"));

        let query = builder(None)
            .with_filters(Some(vec![("featured".to_string(), "off".to_string())]))
            .build()
            .await
            .unwrap();
        assert!(query.build_select().contains("\"featured\" = FALSE"));
    }

    #[tokio::test]
    async fn detail_url_pulls_in_slug() {
        let query = builder(None)
            .with_fields(Some(vec!["detail_url".to_string()]))
            .build()
            .await
            .unwrap();
        let sql = query.build_select();
        assert!(sql.contains("\"mods\".\"slug\""));
        assert!(!sql.contains("detail_url"));
    }

    #[tokio::test]
    async fn unknown_filter_rejected() {
        let result = builder(None)
            .with_filters(Some(vec![("bogus".to_string(), "1".to_string())]))
            .build()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown filter(s): bogus"));
        assert!(err.contains("featured"));
    }

    #[tokio::test]
    async fn includes_recorded_as_relations() {
        let query = builder(None)
            .with_includes(Some(vec!["owner".to_string(), "versions".to_string()]))
            .build()
            .await
            .unwrap();
        assert_eq!(query.relations(), ["owner", "versions"]);
    }
}
