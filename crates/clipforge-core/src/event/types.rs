//! Event types recorded for the Item State Machine (§4.D). Every state
//! transition is driven by one of these events before the in-memory/dashboard
//! projection is updated; the event log is the source of truth for
//! reconciliation at startup.

use chrono::{DateTime, Utc};
use clipforge_domain::{ClassifiedError, ItemId, StageName};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemEventKind {
    /// The item was created by the ideation or trend-ingest stage.
    ItemCreated,
    /// The operator edited the dashboard to approve the item.
    Approved,
    /// A stage began executing. Does not imply success.
    StageStarted { stage: StageName, attempt: u32 },
    /// A stage completed and produced the given artifact paths (final,
    /// already-renamed paths — never temp names).
    StageCompleted { stage: StageName, artifact_paths: Vec<String>, fingerprint: String },
    /// A stage failed with a classified error. `retryable` mirrors the error
    /// kind's retry policy at the time of the failure.
    StageFailed { stage: StageName, error: ClassifiedError, retryable: bool },
    /// A retry was scheduled for `stage`, to become eligible at `after_ts`.
    RetryScheduled { stage: StageName, attempt: u32, after_ts: DateTime<Utc> },
    /// An operator-triggered reset re-entered the item at `to_state`,
    /// discarding any `retryable_error`/`failed` tail.
    Reset { to_state: String },
    /// Recorded at startup when reconciliation (§4.D) had to pick a winner
    /// between the local state file and the dashboard row.
    Reconciled { winner: ReconciliationWinner, resulting_state: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconciliationWinner {
    LocalState,
    Dashboard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemEvent {
    pub seq: u64,
    pub item_id: ItemId,
    pub kind: ItemEventKind,
    pub ts: DateTime<Utc>,
}
