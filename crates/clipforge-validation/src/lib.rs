//! clipforge-validation: rule-based validators for every trust boundary
//! (§4.J). Dashboard cells, CLI args, configuration, environment variables,
//! and external-API JSON responses all pass through here before being
//! accepted into a typed value. Deliberately has no dependency on any other
//! workspace crate so nothing ever needs to route around it to avoid a cycle.

pub mod coerce;
pub mod error;
pub mod json_schema;
pub mod patterns;

pub use coerce::{safe_bool, safe_enum, safe_float, safe_int, safe_path_under, safe_text};
pub use error::ValidationError;
pub use json_schema::check_allowed_keys;
pub use patterns::contains_dangerous_pattern;
