//! The `StageAdapter` trait (§4.G): the uniform contract all nine concrete
//! stage adapters implement. Adapters are injected with everything they
//! need through `StageContext` rather than reaching for process-wide
//! singletons.

use async_trait::async_trait;
use clipforge_artifacts::ArtifactStore;
use clipforge_domain::{ArtifactKind, ArtifactRef, ClassifiedError, Item};
use clipforge_resilience::ResilientCaller;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a stage execution needs, built once by the supervisor and
/// shared (cheaply cloned, all fields are `Arc`s) across every job.
#[derive(Clone)]
pub struct StageContext {
    pub cancellation: CancellationToken,
    pub caller: Arc<dyn ResilientCaller>,
    pub artifact_store: Arc<ArtifactStore>,
}

/// What a successful stage execution produced (§4.G): new artifacts plus
/// dashboard field writes. Both are merged into the Item by the caller under
/// the per-item lock as part of the three-step commit.
#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    pub produced_artifacts: Vec<(ArtifactKind, ArtifactRef)>,
    pub field_updates: HashMap<String, serde_json::Value>,
}

#[async_trait]
pub trait StageAdapter: Send + Sync {
    async fn execute(&self, ctx: &StageContext, item: &Item) -> Result<StageOutcome, ClassifiedError>;
}
