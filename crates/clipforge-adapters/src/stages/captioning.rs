//! Captioning adapter (§4.G, §6 "Caption timing" + "Media muxing"): aligns
//! the script against the narration's word timings, then burns the
//! resulting subtitles into the assembled video.

use async_trait::async_trait;
use clipforge_core::{StageAdapter, StageContext, StageOutcome};
use clipforge_domain::{ArtifactKind, ClassifiedError, ErrorKind, Item, StageName};
use std::sync::Arc;

use crate::capabilities::{CaptionAligner, MediaMuxer, WordTiming};
use crate::stages::narration::word_timings_path;

pub struct CaptioningAdapter {
    aligner: Arc<dyn CaptionAligner>,
    muxer: Arc<dyn MediaMuxer>,
}

impl CaptioningAdapter {
    pub fn new(aligner: Arc<dyn CaptionAligner>, muxer: Arc<dyn MediaMuxer>) -> Self {
        Self { aligner, muxer }
    }
}

#[async_trait]
impl StageAdapter for CaptioningAdapter {
    async fn execute(&self, ctx: &StageContext, item: &Item) -> Result<StageOutcome, ClassifiedError> {
        let script_ref = item
            .artifacts
            .get(&ArtifactKind::Script)
            .ok_or_else(|| ClassifiedError::new(ErrorKind::Unexpected, "missing script artifact", StageName::Captioning))?;
        let narration_ref = item
            .artifacts
            .get(&ArtifactKind::Narration)
            .ok_or_else(|| ClassifiedError::new(ErrorKind::Unexpected, "missing narration artifact", StageName::Captioning))?;
        let video_ref = item.artifacts.get(&ArtifactKind::AssembledVideo).ok_or_else(|| {
            ClassifiedError::new(ErrorKind::Unexpected, "missing assembled video artifact", StageName::Captioning)
        })?;

        let script = tokio::fs::read_to_string(&script_ref.path)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Captioning))?;
        let timings_bytes = tokio::fs::read(word_timings_path(&narration_ref.path))
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Captioning))?;
        let raw_timings: Vec<(String, u32, u32)> = serde_json::from_slice(&timings_bytes)
            .map_err(|e| ClassifiedError::new(ErrorKind::Unexpected, e.to_string(), StageName::Captioning))?;
        let word_timings: Vec<WordTiming> =
            raw_timings.into_iter().map(|(word, start_ms, end_ms)| WordTiming { word, start_ms, end_ms }).collect();

        let srt = self.aligner.align(ctx, &script, &word_timings).await?;
        let captions_dir = std::env::temp_dir().join("clipforge-captions").join(item.item_id.as_str());
        tokio::fs::create_dir_all(&captions_dir)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Captioning))?;
        let captions_path = captions_dir.join("captions.srt");
        tokio::fs::write(&captions_path, srt)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Captioning))?;

        let guard = ctx
            .artifact_store
            .begin_write(ArtifactKind::CaptionedVideo, &item.item_id)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Captioning))?;
        self.muxer
            .burn_captions(ctx, std::path::Path::new(&video_ref.path), &captions_path, guard.temp_path())
            .await?;
        let artifact = guard
            .finalize(StageName::Captioning)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Captioning))?;
        let _ = tokio::fs::remove_dir_all(&captions_dir).await;

        let mut outcome = StageOutcome::default();
        outcome.produced_artifacts.push((ArtifactKind::CaptionedVideo, artifact));
        Ok(outcome)
    }
}
