//! Item State Machine states (§4.D) and the forward-only DAG they form.

use crate::stage::StageName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemState {
    PendingApproval,
    Approved,
    Scripting,
    Scripted,
    Narrating,
    Narrated,
    SourcingClips,
    ClipsSourced,
    Assembling,
    Assembled,
    Captioning,
    Captioned,
    MetadataPending,
    MetadataReady,
    Publishing,
    Published,
    Failed { stage: StageName },
    RetryableError { stage: StageName, after_ts: DateTime<Utc> },
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Published | ItemState::Failed { .. })
    }

    /// The stage that would run next from this state, if any. `None` means the
    /// item is either terminal or waiting on something outside the stage DAG
    /// (e.g. `PendingApproval` waits on an operator edit, not a stage).
    pub fn next_stage(&self) -> Option<StageName> {
        match self {
            ItemState::PendingApproval => None,
            ItemState::Approved => Some(StageName::Scripting),
            ItemState::Scripting => Some(StageName::Scripting),
            ItemState::Scripted => Some(StageName::Narration),
            ItemState::Narrating => Some(StageName::Narration),
            ItemState::Narrated => Some(StageName::ClipSourcing),
            ItemState::SourcingClips => Some(StageName::ClipSourcing),
            ItemState::ClipsSourced => Some(StageName::Assembly),
            ItemState::Assembling => Some(StageName::Assembly),
            ItemState::Assembled => Some(StageName::Captioning),
            ItemState::Captioning => Some(StageName::Captioning),
            ItemState::Captioned => Some(StageName::MetadataSynthesis),
            ItemState::MetadataPending => Some(StageName::MetadataSynthesis),
            ItemState::MetadataReady => Some(StageName::Publishing),
            ItemState::Publishing => Some(StageName::Publishing),
            ItemState::Published => None,
            ItemState::Failed { .. } => None,
            ItemState::RetryableError { stage, .. } => Some(*stage),
        }
    }

    /// State reached when `stage` reports completion while the item was in
    /// `self`. Returns `None` if `stage` could not have produced a transition
    /// out of `self` (defensive; the registry should never call this wrongly).
    pub fn on_stage_completed(&self, stage: StageName) -> Option<ItemState> {
        match (self, stage) {
            (ItemState::Approved, StageName::Scripting) => Some(ItemState::Scripted),
            (ItemState::Scripted, StageName::Narration) => Some(ItemState::Narrated),
            (ItemState::Narrated, StageName::ClipSourcing) => Some(ItemState::ClipsSourced),
            (ItemState::ClipsSourced, StageName::Assembly) => Some(ItemState::Assembled),
            (ItemState::Assembled, StageName::Captioning) => Some(ItemState::Captioned),
            (ItemState::Captioned, StageName::MetadataSynthesis) => Some(ItemState::MetadataReady),
            (ItemState::MetadataReady, StageName::Publishing) => Some(ItemState::Published),
            _ => None,
        }
    }

    /// The state the item was in immediately before `stage` started running.
    /// The inverse of `next_stage`/`on_stage_completed`: used to re-enter an
    /// item that failed or is stuck in `retryable_error` at its last
    /// successful state rather than always rewinding to `Approved`.
    ///
    /// `Ideation`/`TrendIngest`/`ApprovalWatcher` never appear as the `stage`
    /// of a `Failed`/`RetryableError` item (they run before the item enters
    /// this state machine), so they fall back to `Approved`.
    pub fn predecessor_for_stage(stage: StageName) -> ItemState {
        match stage {
            StageName::Scripting => ItemState::Approved,
            StageName::Narration => ItemState::Scripted,
            StageName::ClipSourcing => ItemState::Narrated,
            StageName::Assembly => ItemState::ClipsSourced,
            StageName::Captioning => ItemState::Assembled,
            StageName::MetadataSynthesis => ItemState::Captioned,
            StageName::Publishing => ItemState::MetadataReady,
            StageName::Ideation | StageName::TrendIngest | StageName::ApprovalWatcher => ItemState::Approved,
        }
    }

    /// True if `to` is forward-reachable from `self` in the DAG (property 1,
    /// §8): either `to == self`, or `to` is `self`'s completion successor, or
    /// `to` is a `RetryableError`/`Failed` for the stage `self` would run next.
    pub fn allows_forward_transition_to(&self, to: &ItemState) -> bool {
        if self == to {
            return true;
        }
        if let Some(stage) = self.next_stage() {
            if let Some(completed) = self.on_stage_completed(stage) {
                if &completed == to {
                    return true;
                }
            }
            match to {
                ItemState::Failed { stage: fs } if *fs == stage => return true,
                ItemState::RetryableError { stage: rs, .. } if *rs == stage => return true,
                _ => {}
            }
        }
        false
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemState::PendingApproval => write!(f, "pending_approval"),
            ItemState::Approved => write!(f, "approved"),
            ItemState::Scripting => write!(f, "scripting"),
            ItemState::Scripted => write!(f, "scripted"),
            ItemState::Narrating => write!(f, "narrating"),
            ItemState::Narrated => write!(f, "narrated"),
            ItemState::SourcingClips => write!(f, "sourcing_clips"),
            ItemState::ClipsSourced => write!(f, "clips_sourced"),
            ItemState::Assembling => write!(f, "assembling"),
            ItemState::Assembled => write!(f, "assembled"),
            ItemState::Captioning => write!(f, "captioning"),
            ItemState::Captioned => write!(f, "captioned"),
            ItemState::MetadataPending => write!(f, "metadata_pending"),
            ItemState::MetadataReady => write!(f, "metadata_ready"),
            ItemState::Publishing => write!(f, "publishing"),
            ItemState::Published => write!(f, "published"),
            ItemState::Failed { stage } => write!(f, "failed({stage})"),
            ItemState::RetryableError { stage, after_ts } => {
                write!(f, "retryable_error({stage}, after={after_ts})")
            }
        }
    }
}

/// Dashboard-visible status labels (§6 external interface). Distinct from
/// `ItemState`: several internal states collapse onto `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DashboardStatus {
    PendingApproval,
    Approved,
    InProgress,
    Completed,
    Failed,
}

impl DashboardStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DashboardStatus::PendingApproval => "Pending Approval",
            DashboardStatus::Approved => "Approved",
            DashboardStatus::InProgress => "In Progress",
            DashboardStatus::Completed => "Completed",
            DashboardStatus::Failed => "Failed",
        }
    }
}

impl From<&ItemState> for DashboardStatus {
    fn from(s: &ItemState) -> Self {
        match s {
            ItemState::PendingApproval => DashboardStatus::PendingApproval,
            ItemState::Approved => DashboardStatus::Approved,
            ItemState::Published => DashboardStatus::Completed,
            ItemState::Failed { .. } => DashboardStatus::Failed,
            _ => DashboardStatus::InProgress,
        }
    }
}
