//! The nine concrete `StageAdapter` implementations (§4.G), one per
//! external collaborator.

pub mod approval_watcher;
pub mod assembly;
pub mod captioning;
pub mod clip_sourcing;
pub mod ideation;
pub mod metadata_synthesis;
pub mod narration;
pub mod publishing;
pub mod scripting;
pub mod trend_ingest;

pub use approval_watcher::ApprovalWatcherAdapter;
pub use assembly::AssemblyAdapter;
pub use captioning::CaptioningAdapter;
pub use clip_sourcing::ClipSourcingAdapter;
pub use ideation::IdeationAdapter;
pub use metadata_synthesis::MetadataSynthesisAdapter;
pub use narration::NarrationAdapter;
pub use publishing::PublishingAdapter;
pub use scripting::ScriptingAdapter;
pub use trend_ingest::TrendIngestAdapter;

/// Shared helper for building a real (tempdir-backed) `StageContext` in unit
/// tests, so each adapter's tests exercise the actual artifact store and
/// resilient caller rather than a mock.
#[cfg(test)]
pub(crate) mod test_support {
    use clipforge_core::StageContext;
    use std::sync::Arc;

    pub fn stage_context(root: &std::path::Path) -> StageContext {
        StageContext {
            cancellation: tokio_util::sync::CancellationToken::new(),
            caller: Arc::new(clipforge_resilience::DefaultResilientCaller::new(Arc::new(
                clipforge_resilience::ResilienceRegistry::new(),
            ))),
            artifact_store: Arc::new(clipforge_artifacts::ArtifactStore::new(root)),
        }
    }
}
