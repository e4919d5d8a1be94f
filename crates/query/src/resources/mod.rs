//! Per-resource query specifications for the public API.
//!
//! Each module is configuration, not logic: a whitelist of filters,
//! includes, fields, and sorts fed to the shared query builder, plus a
//! base query already scoped to the resource's visibility rules.

pub mod addons;
pub mod mod_versions;
pub mod mods;
pub mod spt_versions;
pub mod users;
