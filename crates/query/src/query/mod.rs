//! Declarative resource query engine.
//!
//! Turns an untrusted, flat set of request parameters (filters,
//! includes, fields, sorts, search) into a safe, composed data query:
//! - [`spec::ResourceSpec`]: per-resource whitelists and filter functions
//! - [`builder::QueryBuilder`]: validation and fixed-order composition
//! - [`sql::SelectQuery`]: the sea-query-backed queryable
//! - [`filters`]: reusable filter grammars

pub mod builder;
pub mod filters;
pub mod queryable;
pub mod spec;
pub mod sql;

pub use builder::QueryBuilder;
pub use queryable::{Direction, Queryable};
pub use spec::{Filter, FilterFn, Includes, ResourceSpec, SortFn};
pub use sql::{Page, SelectQuery};
