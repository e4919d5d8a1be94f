//! SQL-backed queryable using SeaQuery.
//!
//! [`SelectQuery`] accumulates composition parts (conditions,
//! projection, relation paths, ordering, rank constraints) and renders
//! PostgreSQL on demand, so ordering overrides never have to unpick an
//! already-built statement. Execution fetches rows as JSON via
//! `row_to_json` inside a statement-timeout transaction.

use sea_query::{Alias, Asterisk, Expr, Order, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{QueryError, QueryResult};
use crate::query::queryable::{Direction, Queryable};

/// One ordering key.
#[derive(Debug, Clone)]
enum OrderSpec {
    Column(String, Direction),
    Raw(String, Direction),
    /// Exact relevance order: each id maps to its rank position.
    Rank(String, Vec<i64>),
}

/// Mutable SQL query under composition.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    conditions: Vec<SimpleExpr>,
    columns: Vec<String>,
    relations: Vec<String>,
    orders: Vec<OrderSpec>,
    forced_empty: bool,
}

impl SelectQuery {
    /// Create a query over `table` with no conditions.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
            columns: Vec::new(),
            relations: Vec::new(),
            orders: Vec::new(),
            forced_empty: false,
        }
    }

    /// Append a raw SQL condition (resource visibility scoping).
    pub fn and_where_raw(&mut self, fragment: &str) {
        self.conditions.push(Expr::cust(fragment.to_owned()));
    }

    /// Relation paths recorded for eager loading; consumed by the
    /// hydration layer after the primary rows are fetched.
    pub fn relations(&self) -> &[String] {
        &self.relations
    }

    fn render(&self) -> SelectStatement {
        let mut query = Query::select();

        if self.columns.is_empty() {
            query.column((Alias::new(&self.table), Asterisk));
        } else {
            for column in &self.columns {
                query.column((Alias::new(&self.table), Alias::new(column)));
            }
        }

        query.from(Alias::new(&self.table));

        for condition in &self.conditions {
            query.and_where(condition.clone());
        }
        if self.forced_empty {
            query.and_where(Expr::cust("FALSE"));
        }

        for order in &self.orders {
            match order {
                OrderSpec::Column(column, direction) => {
                    query.order_by(
                        (Alias::new(&self.table), Alias::new(column)),
                        to_order(*direction),
                    );
                }
                OrderSpec::Raw(fragment, direction) => {
                    query.order_by_expr(Expr::cust(fragment.clone()), to_order(*direction));
                }
                OrderSpec::Rank(column, ids) => {
                    query.order_by_expr(Expr::cust(rank_case(&self.table, column, ids)), Order::Asc);
                }
            }
        }

        query
    }

    /// Build the SELECT without pagination.
    pub fn build_select(&self) -> String {
        self.render().to_string(PostgresQueryBuilder)
    }

    /// Build the SELECT with LIMIT/OFFSET pagination.
    pub fn build_page(&self, page: u32, per_page: u32) -> String {
        let mut query = self.render();
        let offset = u64::from(page.saturating_sub(1)) * u64::from(per_page);
        query.limit(u64::from(per_page));
        query.offset(offset);
        query.to_string(PostgresQueryBuilder)
    }

    /// Build a COUNT query over the same conditions.
    pub fn build_count(&self) -> String {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        query.from(Alias::new(&self.table));
        for condition in &self.conditions {
            query.and_where(condition.clone());
        }
        if self.forced_empty {
            query.and_where(Expr::cust("FALSE"));
        }
        query.to_string(PostgresQueryBuilder)
    }

    fn column_expr(&self, column: &str) -> Expr {
        Expr::col((Alias::new(&self.table), Alias::new(column)))
    }

    /// Fetch all matching rows as JSON objects.
    pub async fn fetch_all(&self, pool: &PgPool) -> QueryResult<Vec<serde_json::Value>> {
        let sql = self.build_select();
        let rows = sqlx::query_scalar(&format!("SELECT row_to_json(t) FROM ({sql}) t"))
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    /// Fetch one page of rows plus the total count.
    ///
    /// Count and page queries run in one transaction with a statement
    /// timeout so a pathological composed query cannot hold a worker.
    pub async fn fetch_page(&self, pool: &PgPool, page: u32, per_page: u32) -> QueryResult<Page> {
        let mut tx = pool.begin().await?;

        sqlx::query("SET LOCAL statement_timeout = '10s'")
            .execute(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(&self.build_count())
            .fetch_one(&mut *tx)
            .await?;

        let page_sql = self.build_page(page, per_page);
        let items: Vec<serde_json::Value> =
            sqlx::query_scalar(&format!("SELECT row_to_json(t) FROM ({page_sql}) t"))
                .fetch_all(&mut *tx)
                .await?;

        tx.commit().await?;

        tracing::debug!(total, page, per_page, "query page fetched");
        Ok(Page::new(items, total as u64, page, per_page))
    }

    /// Fetch the single row matching a primary-key equality constraint.
    pub async fn fetch_one_by_id(
        &self,
        pool: &PgPool,
        column: &str,
        id: i64,
    ) -> QueryResult<serde_json::Value> {
        let mut constrained = self.clone();
        let by_id = constrained.column_expr(column).eq(id);
        constrained.conditions.push(by_id);
        let sql = constrained.build_select();
        let row: Option<serde_json::Value> =
            sqlx::query_scalar(&format!("SELECT row_to_json(t) FROM ({sql}) t"))
                .fetch_optional(pool)
                .await?;
        row.ok_or(QueryError::NotFound)
    }
}

impl Queryable for SelectQuery {
    fn select_fields(&mut self, fields: &[String]) {
        self.columns = fields.to_vec();
    }

    fn where_eq(&mut self, column: &str, value: &str) {
        let expr = self.column_expr(column).eq(value.to_owned());
        self.conditions.push(expr);
    }

    fn where_eq_bool(&mut self, column: &str, value: bool) {
        let expr = self.column_expr(column).eq(value);
        self.conditions.push(expr);
    }

    fn where_in(&mut self, column: &str, values: &[String]) {
        let expr = self.column_expr(column).is_in(values.to_vec());
        self.conditions.push(expr);
    }

    fn where_in_ids(&mut self, column: &str, ids: &[i64]) {
        let expr = self.column_expr(column).is_in(ids.to_vec());
        self.conditions.push(expr);
    }

    fn where_like(&mut self, column: &str, needle: &str) {
        let expr = self
            .column_expr(column)
            .like(format!("%{}%", escape_like_wildcards(needle)));
        self.conditions.push(expr);
    }

    fn where_between(&mut self, column: &str, start: &str, end: &str) {
        let expr = self
            .column_expr(column)
            .between(Expr::val(start.to_owned()), Expr::val(end.to_owned()));
        self.conditions.push(expr);
    }

    fn where_gte(&mut self, column: &str, value: &str) {
        let expr = self.column_expr(column).gte(Expr::val(value.to_owned()));
        self.conditions.push(expr);
    }

    fn where_lte(&mut self, column: &str, value: &str) {
        let expr = self.column_expr(column).lte(Expr::val(value.to_owned()));
        self.conditions.push(expr);
    }

    fn with_relations(&mut self, paths: &[String]) {
        self.relations.extend(paths.iter().cloned());
    }

    fn order_by(&mut self, column: &str, direction: Direction) {
        self.orders
            .push(OrderSpec::Column(column.to_string(), direction));
    }

    fn order_by_expr(&mut self, expr: &str, direction: Direction) {
        self.orders.push(OrderSpec::Raw(expr.to_string(), direction));
    }

    fn order_by_rank(&mut self, column: &str, ids: &[i64]) {
        self.orders.clear();
        self.orders
            .push(OrderSpec::Rank(column.to_string(), ids.to_vec()));
    }

    fn match_nothing(&mut self) {
        self.forced_empty = true;
    }
}

const fn to_order(direction: Direction) -> Order {
    match direction {
        Direction::Asc => Order::Asc,
        Direction::Desc => Order::Desc,
    }
}

/// `CASE <pk> WHEN id THEN position ... END` for relevance ordering.
fn rank_case(table: &str, column: &str, ids: &[i64]) -> String {
    let mut expr = format!("CASE {table}.{column}");
    for (position, id) in ids.iter().enumerate() {
        expr.push_str(&format!(" WHEN {id} THEN {position}"));
    }
    expr.push_str(" END");
    expr
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// One page of results with pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Rows as JSON values.
    pub items: Vec<serde_json::Value>,

    /// Total count before paging.
    pub total: u64,

    /// Current page number (1-indexed).
    pub page: u32,

    /// Items per page.
    pub per_page: u32,

    /// Total number of pages.
    pub total_pages: u32,

    /// Whether there's a next page.
    pub has_next: bool,

    /// Whether there's a previous page.
    pub has_prev: bool,
}

impl Page {
    /// Create a new page with paging calculations.
    pub fn new(items: Vec<serde_json::Value>, total: u64, page: u32, per_page: u32) -> Self {
        let total_pages = if per_page > 0 {
            ((total as f64) / (f64::from(per_page))).ceil() as u32
        } else {
            1
        };

        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn select_all_when_no_projection() {
        let query = SelectQuery::new("mods");
        let sql = query.build_select();
        assert!(sql.contains("SELECT \"mods\".*"));
        assert!(sql.contains("FROM \"mods\""));
    }

    #[test]
    fn projection_lists_columns() {
        let mut query = SelectQuery::new("mods");
        query.select_fields(&["id".to_string(), "name".to_string()]);
        let sql = query.build_select();
        assert!(sql.contains("\"mods\".\"id\""));
        assert!(sql.contains("\"mods\".\"name\""));
        assert!(!sql.contains("*"));
    }

    #[test]
    fn like_wildcards_escaped() {
        let mut query = SelectQuery::new("mods");
        query.where_like("name", "100%_done");
        let sql = query.build_select();
        assert!(
            sql.contains("100\\\\%\\\\_done") || sql.contains("100\\%\\_done"),
            "LIKE wildcards should be escaped: {sql}"
        );
    }

    #[test]
    fn match_nothing_renders_false() {
        let mut query = SelectQuery::new("mods");
        query.match_nothing();
        assert!(query.build_select().contains("FALSE"));
        assert!(query.build_count().contains("FALSE"));
    }

    #[test]
    fn rank_order_replaces_prior_ordering() {
        let mut query = SelectQuery::new("mods");
        query.order_by("name", Direction::Asc);
        query.order_by_rank("id", &[7, 3, 9]);
        let sql = query.build_select();
        assert!(sql.contains("CASE mods.id WHEN 7 THEN 0 WHEN 3 THEN 1 WHEN 9 THEN 2 END"));
        assert!(!sql.contains("ORDER BY \"mods\".\"name\""));
    }

    #[test]
    fn pagination_offset() {
        let query = SelectQuery::new("mods");
        assert!(query.build_page(1, 10).contains("OFFSET 0"));
        assert!(query.build_page(3, 10).contains("OFFSET 20"));
        assert!(query.build_page(3, 10).contains("LIMIT 10"));
    }

    #[test]
    fn count_omits_ordering_and_limit() {
        let mut query = SelectQuery::new("mods");
        query.order_by("name", Direction::Desc);
        let sql = query.build_count();
        assert!(sql.contains("COUNT(*)"));
        assert!(!sql.contains("ORDER BY"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn between_and_bounds() {
        let mut query = SelectQuery::new("mods");
        query.where_between("created_at", "2024-01-01", "2024-12-31");
        query.where_gte("downloads", "100");
        let sql = query.build_select();
        assert!(sql.contains("BETWEEN"));
        assert!(sql.contains(">="));
    }

    #[test]
    fn relations_recorded_not_rendered() {
        let mut query = SelectQuery::new("mods");
        query.with_relations(&["owner".to_string(), "license".to_string()]);
        assert_eq!(query.relations(), ["owner", "license"]);
        assert!(!query.build_select().contains("owner"));
    }

    #[test]
    fn page_metadata_math() {
        let page = Page::new(vec![serde_json::json!({"id": 1})], 25, 2, 10);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_prev);

        let last = Page::new(vec![], 25, 3, 10);
        assert!(!last.has_next);

        let empty = Page::new(vec![], 0, 1, 10);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }
}
