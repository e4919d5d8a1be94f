//! Connection pool for composed queries.
//!
//! One shared pool serves every resource binding; page fetches open
//! short statement-timeout transactions on it (see
//! [`crate::query::sql::SelectQuery::fetch_page`]), so the pool size
//! bounds concurrent query composition end to end.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Connect a pool sized from [`Config::database_max_connections`].
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    tracing::debug!(
        max_connections = config.database_max_connections,
        "query pool connected"
    );
    Ok(pool)
}

/// Whether the pool can currently reach the database.
pub async fn check_health(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}
