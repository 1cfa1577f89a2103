//! clipforge-domain: neutral data types shared by every other crate.
//!
//! A re-export-only domain crate: no behavior beyond small inherent helpers
//! lives here, only the shapes (`Item`, `ItemState`, `ArtifactKind`,
//! `StageName`, the error taxonomy) that the rest of the workspace agrees
//! on.

pub mod artifact_kind;
pub mod error;
pub mod ids;
pub mod item;
pub mod stage;
pub mod state;

pub use artifact_kind::ArtifactKind;
pub use error::{ClassifiedError, DomainError, ErrorKind, RetryPolicy};
pub use ids::ItemId;
pub use item::{ArtifactRef, Item, Source};
pub use stage::{DurationBucket, OperationClass, StageName};
pub use state::{DashboardStatus, ItemState};
