//! clipforge-core: the Stage Registry and Item State Machine engine (§4.D,
//! §4.E).
//!
//! - `event`: append-only per-item event log (`ItemEvent`/`EventStore`) that
//!   every state transition is recorded to before any projection is updated.
//! - `repo`: replays an item's events into an `ItemProjection`, and
//!   implements the startup reconciliation policy between local state and
//!   the dashboard row.
//! - `registry`: the static `StageRegistry` table resolving an item's unique
//!   next-eligible stage.
//! - `stage_adapter`: the `StageAdapter` trait and `StageContext` every
//!   concrete adapter in `clipforge-adapters` implements/consumes.
//! - `fingerprint`: deterministic per-(item, stage, attempt) hashing used for
//!   idempotency keys and duplicate-re-run detection.
//! - `hashing`: canonical JSON and hash helpers underlying fingerprints.
//! - `errors`: engine-internal errors.

pub mod constants;
pub mod errors;
pub mod event;
pub mod fingerprint;
pub mod hashing;
pub mod registry;
pub mod repo;
pub mod stage_adapter;

pub use errors::CoreEngineError;
pub use event::{EventStore, FileEventStore, InMemoryEventStore, ItemEvent, ItemEventKind, ReconciliationWinner};
pub use fingerprint::stage_fingerprint;
pub use registry::{StageDefinition, StageRegistry};
pub use repo::{reconcile, replay, replay_from_store, ItemProjection, ReconciliationOutcome};
pub use stage_adapter::{StageAdapter, StageContext, StageOutcome};
