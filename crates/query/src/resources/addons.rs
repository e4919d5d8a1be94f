//! Addon resource binding.

use std::collections::BTreeMap;

use crate::query::filters::{fuzzy, id_list, range};
use crate::query::spec::{Includes, ResourceSpec, names};
use crate::query::sql::SelectQuery;
use crate::query::{QueryBuilder, Queryable};

/// Base query scoped to enabled addons.
pub fn base_query() -> SelectQuery {
    let mut query = SelectQuery::new("addons");
    query.where_eq_bool("disabled", false);
    query
}

/// Query specification for the addons listing.
pub fn spec() -> ResourceSpec<SelectQuery> {
    let mut filters = BTreeMap::new();
    filters.insert("id".to_string(), id_list("id"));
    filters.insert("name".to_string(), fuzzy("name"));
    filters.insert("created_at".to_string(), range("created_at"));

    ResourceSpec {
        filters,
        includes: Includes::Flat(names(["owner"])),
        fields: names(["name", "summary", "downloads", "created_at", "updated_at"]),
        required_fields: names(["id", "owner_id"]),
        sorts: names(["name", "downloads", "created_at"]),
        ..Default::default()
    }
}

/// Convenience constructor for one request's builder.
pub fn builder() -> QueryBuilder<SelectQuery> {
    QueryBuilder::new(spec(), base_query())
}
