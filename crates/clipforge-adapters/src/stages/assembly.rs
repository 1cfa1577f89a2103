//! Assembly adapter (§4.G, §6 "Media muxing"): concats the sourced clips,
//! trims/loops to the narration's duration, and muxes in the narration
//! audio, producing the `assembled_video` artifact.

use async_trait::async_trait;
use clipforge_core::{StageAdapter, StageContext, StageOutcome};
use clipforge_domain::{ArtifactKind, ClassifiedError, ErrorKind, Item, StageName};
use std::sync::Arc;

use crate::capabilities::MediaMuxer;

const TARGET_DURATION_SECS: f64 = 45.0;

pub struct AssemblyAdapter {
    muxer: Arc<dyn MediaMuxer>,
}

impl AssemblyAdapter {
    pub fn new(muxer: Arc<dyn MediaMuxer>) -> Self {
        Self { muxer }
    }
}

#[async_trait]
impl StageAdapter for AssemblyAdapter {
    async fn execute(&self, ctx: &StageContext, item: &Item) -> Result<StageOutcome, ClassifiedError> {
        let lock = ctx
            .artifact_store
            .lock_item(&item.item_id)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Assembly))?;
        let clip_paths = ctx
            .artifact_store
            .list_finalized(ArtifactKind::StockClip, &item.item_id, &lock)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Assembly))?;
        if clip_paths.is_empty() {
            return Err(ClassifiedError::new(ErrorKind::Unexpected, "no sourced clips to assemble", StageName::Assembly));
        }

        let audio_ref = item
            .artifacts
            .get(&ArtifactKind::Narration)
            .ok_or_else(|| ClassifiedError::new(ErrorKind::Unexpected, "missing narration artifact", StageName::Assembly))?;

        let guard = ctx
            .artifact_store
            .begin_write(ArtifactKind::AssembledVideo, &item.item_id)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Assembly))?;
        self.muxer
            .assemble(ctx, &clip_paths, std::path::Path::new(&audio_ref.path), TARGET_DURATION_SECS, guard.temp_path())
            .await?;
        let artifact = guard
            .finalize(StageName::Assembly)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Assembly))?;

        let mut outcome = StageOutcome::default();
        outcome.produced_artifacts.push((ArtifactKind::AssembledVideo, artifact));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeMediaMuxer;
    use crate::stages::test_support::stage_context;
    use clipforge_domain::{ArtifactRef, ItemId, Source};

    async fn item_with_clips_and_narration(ctx: &StageContext) -> Item {
        let item_id = ItemId::new("item-1");
        let mut item = Item::new(item_id.clone(), Source::AiIdeation, "concept");
        for _ in 0..3 {
            let guard = ctx.artifact_store.begin_write(ArtifactKind::StockClip, &item_id).await.unwrap();
            tokio::fs::write(guard.temp_path(), b"clip").await.unwrap();
            guard.finalize(StageName::ClipSourcing).await.unwrap();
        }
        let narration = ctx
            .artifact_store
            .write_bytes(ArtifactKind::Narration, &item_id, StageName::Narration, b"audio")
            .await
            .unwrap();
        item.artifacts.insert(ArtifactKind::Narration, narration);
        item
    }

    #[tokio::test]
    async fn assembles_the_sourced_clips_with_the_narration_track() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let item = item_with_clips_and_narration(&ctx).await;
        let adapter = AssemblyAdapter::new(Arc::new(FakeMediaMuxer));

        let outcome = adapter.execute(&ctx, &item).await.unwrap();
        let (kind, artifact) = &outcome.produced_artifacts[0];
        assert_eq!(*kind, ArtifactKind::AssembledVideo);
        assert!(tokio::fs::metadata(&artifact.path).await.unwrap().len() > 0);
    }

    #[tokio::test]
    async fn fails_fast_with_no_sourced_clips() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let item_id = ItemId::new("item-2");
        let mut item = Item::new(item_id.clone(), Source::AiIdeation, "concept");
        item.artifacts.insert(
            ArtifactKind::Narration,
            ArtifactRef {
                path: "unused".into(),
                size: 0,
                sha256: "x".into(),
                producing_stage: StageName::Narration,
                created_at: chrono::Utc::now(),
            },
        );
        let adapter = AssemblyAdapter::new(Arc::new(FakeMediaMuxer));

        let err = adapter.execute(&ctx, &item).await.unwrap_err();
        assert_eq!(err.kind, clipforge_domain::ErrorKind::Unexpected);
    }
}
