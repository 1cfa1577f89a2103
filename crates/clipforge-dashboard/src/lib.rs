//! clipforge-dashboard: the Dashboard Adapter (§4.C), the sole component
//! permitted to talk to the external row store.
//!
//! - `adapter`: the `DashboardAdapter` trait, `ItemFilter`, and the shared
//!   field-write merge logic.
//! - `memory`: `InMemoryDashboard`, used for tests.
//! - `sqlite`: `SqliteDashboard`, the default durable implementation backed
//!   by an embedded sqlite file with an in-memory read cache.

pub mod adapter;
pub mod error;
pub mod memory;
pub mod sqlite;

pub use adapter::{DashboardAdapter, ItemFilter, NewItem};
pub use error::DashboardError;
pub use memory::InMemoryDashboard;
pub use sqlite::SqliteDashboard;
