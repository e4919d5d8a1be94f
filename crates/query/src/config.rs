//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Query layer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Page size used when the caller does not supply one (default: 12).
    pub default_per_page: u32,

    /// Upper bound on caller-supplied page sizes (default: 50).
    pub max_per_page: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let default_per_page = env::var("DEFAULT_PER_PAGE")
            .unwrap_or_else(|_| "12".to_string())
            .parse()
            .context("DEFAULT_PER_PAGE must be a valid u32")?;

        let max_per_page = env::var("MAX_PER_PAGE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .context("MAX_PER_PAGE must be a valid u32")?;

        Ok(Self {
            database_url,
            database_max_connections,
            default_per_page,
            max_per_page,
        })
    }

    /// Resolve a caller-supplied page size against the configured bounds.
    pub fn clamp_per_page(&self, requested: Option<u32>) -> u32 {
        match requested {
            None | Some(0) => self.default_per_page,
            Some(n) => n.min(self.max_per_page),
        }
    }
}
