//! Item event definitions and the `EventStore` trait (§4.D).

mod store;
mod types;

pub use store::{EventStore, FileEventStore, InMemoryEventStore};
pub use types::{ItemEvent, ItemEventKind, ReconciliationWinner};
