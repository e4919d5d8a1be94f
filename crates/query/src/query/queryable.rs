//! Abstract queryable capability.
//!
//! The query builder composes filters, includes, projection, sorts, and
//! search onto this interface without knowing how the data layer
//! renders or executes it. Production uses the sea-query-backed
//! [`super::sql::SelectQuery`]; tests use a recording fake.

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Mutable data-query object the engine composes onto.
///
/// All methods mutate in place; the queryable is exclusively owned by
/// one builder for the lifetime of one request.
pub trait Queryable {
    /// Project exactly these columns.
    fn select_fields(&mut self, fields: &[String]);

    /// Equality predicate.
    fn where_eq(&mut self, column: &str, value: &str);

    /// Boolean equality predicate.
    fn where_eq_bool(&mut self, column: &str, value: bool);

    /// Membership predicate over string values.
    fn where_in(&mut self, column: &str, values: &[String]);

    /// Membership predicate over integer identifiers.
    fn where_in_ids(&mut self, column: &str, ids: &[i64]);

    /// Escaped substring match.
    fn where_like(&mut self, column: &str, needle: &str);

    /// Two-endpoint inclusive range.
    fn where_between(&mut self, column: &str, start: &str, end: &str);

    /// Lower-bound-only range.
    fn where_gte(&mut self, column: &str, value: &str);

    /// Upper-bound-only range.
    fn where_lte(&mut self, column: &str, value: &str);

    /// Record relation paths to eager-load alongside the primary rows.
    fn with_relations(&mut self, paths: &[String]);

    /// Append an ordering key on a column.
    fn order_by(&mut self, column: &str, direction: Direction);

    /// Append an ordering key on a raw expression.
    fn order_by_expr(&mut self, expr: &str, direction: Direction);

    /// Replace all ordering with the exact rank order of `ids`, and
    /// constrain results to those identifiers' relevance positions.
    fn order_by_rank(&mut self, column: &str, ids: &[i64]);

    /// Force the query to match zero rows.
    fn match_nothing(&mut self);
}
