//! Modhub API query kernel.
//!
//! The declarative query layer behind the platform's public REST API:
//! per-resource specifications whitelist what a request may filter,
//! include, select, and sort; one shared builder validates the
//! untrusted parameters and composes them onto a SQL query in a fixed
//! order, with full-text search applied last.

pub mod config;
pub mod db;
pub mod error;
pub mod params;
pub mod query;
pub mod resources;
pub mod search;
pub mod version;

pub use error::{QueryError, QueryResult};
pub use params::QueryParams;
pub use query::{Direction, Includes, Page, QueryBuilder, Queryable, ResourceSpec, SelectQuery};
