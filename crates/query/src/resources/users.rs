//! User resource binding.

use std::collections::BTreeMap;

use crate::query::QueryBuilder;
use crate::query::filters::{fuzzy, id_list, range};
use crate::query::spec::{Includes, ResourceSpec, names};
use crate::query::sql::SelectQuery;

/// Base query; user listings exclude nothing beyond the columns the
/// specification whitelists.
pub fn base_query() -> SelectQuery {
    SelectQuery::new("users")
}

/// Query specification for the users listing.
///
/// Users carry no search backend, so search parameters silently skip.
pub fn spec() -> ResourceSpec<SelectQuery> {
    let mut filters = BTreeMap::new();
    filters.insert("id".to_string(), id_list("id"));
    filters.insert("hub_id".to_string(), id_list("hub_id"));
    filters.insert("name".to_string(), fuzzy("name"));
    filters.insert("created_at".to_string(), range("created_at"));

    let mut dynamic_attributes = BTreeMap::new();
    dynamic_attributes.insert("profile_url".to_string(), names(["id", "name"]));

    ResourceSpec {
        filters,
        includes: Includes::Flat(names(["role"])),
        fields: names(["hub_id", "name", "created_at", "updated_at"]),
        required_fields: names(["id", "role_id"]),
        dynamic_attributes,
        sorts: names(["name", "created_at"]),
        ..Default::default()
    }
}

/// Convenience constructor for one request's builder.
pub fn builder() -> QueryBuilder<SelectQuery> {
    QueryBuilder::new(spec(), base_query())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_silently_skips_without_backend() {
        let query = builder()
            .with_search(Some("nikita".to_string()))
            .build()
            .await
            .unwrap();
        let sql = query.build_select();
        assert!(!sql.contains("FALSE"));
        assert!(!sql.contains("CASE"));
    }

    #[tokio::test]
    async fn profile_url_pulls_in_dependencies() {
        let query = builder()
            .with_fields(Some(vec!["profile_url".to_string()]))
            .build()
            .await
            .unwrap();
        let sql = query.build_select();
        assert!(sql.contains("\"users\".\"name\""));
        assert!(sql.contains("\"users\".\"id\""));
        assert!(!sql.contains("profile_url"));
    }

    #[tokio::test]
    async fn name_filter_is_fuzzy() {
        let query = builder()
            .with_filters(Some(vec![("name".to_string(), "chomp".to_string())]))
            .build()
            .await
            .unwrap();
        let sql = query.build_select();
        assert!(sql.contains("LIKE"));
        assert!(sql.contains("%chomp%"));
    }
}
