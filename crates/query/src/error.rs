//! Query engine error types.

use thiserror::Error;

/// Errors raised while composing or executing a resource query.
///
/// `InvalidQuery` and `NotFound` are user-input-class failures that the
/// HTTP boundary translates into 4xx responses; the remaining variants
/// are infrastructure failures.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("not found")]
    NotFound,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl QueryError {
    /// Build an `InvalidQuery` naming the offending tokens and the full
    /// set of valid alternatives, so an API consumer can self-correct.
    pub fn unknown_tokens(kind: &str, invalid: &[String], valid: &[String]) -> Self {
        Self::InvalidQuery(format!(
            "unknown {kind}(s): {}; allowed {kind}s are: {}",
            invalid.join(", "),
            valid.join(", ")
        ))
    }
}

/// Result type alias using QueryError.
pub type QueryResult<T> = Result<T, QueryError>;
