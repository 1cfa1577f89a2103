//! The `Item` aggregate (§3 Data Model).

use crate::artifact_kind::ArtifactKind;
use crate::error::ClassifiedError;
use crate::ids::ItemId;
use crate::stage::StageName;
use crate::state::ItemState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    AiIdeation,
    SocialTrend,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::AiIdeation => "ai_ideation",
            Source::SocialTrend => "social_trend",
        }
    }
}

/// A reference to an artifact already finalized in the Atomic Artifact Store:
/// just enough to re-locate and re-verify it (§3 invariant 3), never the
/// payload itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub path: String,
    pub size: u64,
    pub sha256: String,
    pub producing_stage: StageName,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub source: Source,
    pub concept_text: String,
    pub state: ItemState,
    pub stage_attempts: HashMap<StageName, u32>,
    pub artifacts: HashMap<ArtifactKind, ArtifactRef>,
    pub error: Option<ClassifiedError>,
    pub publication_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(item_id: ItemId, source: Source, concept_text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            item_id,
            source,
            concept_text: concept_text.into(),
            state: ItemState::PendingApproval,
            stage_attempts: HashMap::new(),
            artifacts: HashMap::new(),
            error: None,
            publication_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn attempts_for(&self, stage: StageName) -> u32 {
        self.stage_attempts.get(&stage).copied().unwrap_or(0)
    }

    /// Stable per-(item, stage) fingerprint seed used as a provider-side
    /// idempotency key where supported (§3, §4.A). Combining the item id, the
    /// stage, and the *current* attempt count is what makes re-running a
    /// failed attempt generate a fresh idempotency key rather than replaying
    /// the same one forever.
    pub fn idempotency_seed(&self, stage: StageName) -> String {
        format!("{}:{}:{}", self.item_id, stage, self.attempts_for(stage))
    }
}
