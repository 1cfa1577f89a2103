//! Narration adapter (§4.G, §6 "Text-to-speech"): synthesizes narration
//! audio and word-level timings from the scripting stage's artifact.

use async_trait::async_trait;
use clipforge_core::{stage_fingerprint, StageAdapter, StageContext, StageOutcome};
use clipforge_domain::{ArtifactKind, ClassifiedError, ErrorKind, Item, StageName};
use std::sync::Arc;

use crate::capabilities::SpeechSynthesizer;

pub struct NarrationAdapter {
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl NarrationAdapter {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { synthesizer }
    }
}

#[async_trait]
impl StageAdapter for NarrationAdapter {
    async fn execute(&self, ctx: &StageContext, item: &Item) -> Result<StageOutcome, ClassifiedError> {
        let script_ref = item
            .artifacts
            .get(&ArtifactKind::Script)
            .ok_or_else(|| ClassifiedError::new(ErrorKind::Unexpected, "missing script artifact", StageName::Narration))?;
        let script = tokio::fs::read_to_string(&script_ref.path)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Narration))?;

        let attempt = item.attempts_for(StageName::Narration);
        let key = stage_fingerprint(&item.item_id, StageName::Narration, attempt);
        let narration = self.synthesizer.synthesize(ctx, &script, &key).await?;

        let artifact = ctx
            .artifact_store
            .write_bytes(ArtifactKind::Narration, &item.item_id, StageName::Narration, &narration.audio_bytes)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Narration))?;

        // Word timings are an internal contract with the captioning stage,
        // not an Item-tracked artifact (§3 only names six artifact kinds) —
        // colocated with the audio file under a derived path rather than
        // routed through the hash-tracked store.
        let timings_path = word_timings_path(&artifact.path);
        let timings_json = serde_json::to_vec(&narration.word_timings.iter().map(timing_tuple).collect::<Vec<_>>())
            .map_err(|e| ClassifiedError::new(ErrorKind::Unexpected, e.to_string(), StageName::Narration))?;
        tokio::fs::write(&timings_path, timings_json)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Narration))?;

        let mut outcome = StageOutcome::default();
        outcome.produced_artifacts.push((ArtifactKind::Narration, artifact));
        Ok(outcome)
    }
}

fn timing_tuple(w: &crate::capabilities::WordTiming) -> (String, u32, u32) {
    (w.word.clone(), w.start_ms, w.end_ms)
}

/// Derives the word-timings sidecar path from the narration audio path
/// (`<...>.wav` -> `<...>.timings.json`).
pub fn word_timings_path(audio_path: &str) -> std::path::PathBuf {
    std::path::PathBuf::from(format!("{audio_path}.timings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeSpeechSynthesizer;
    use crate::stages::test_support::stage_context;
    use clipforge_domain::{ItemId, Source};

    async fn item_with_script(ctx: &StageContext, script: &str) -> Item {
        let item_id = ItemId::new("item-1");
        let mut item = Item::new(item_id.clone(), Source::AiIdeation, "concept");
        let artifact = ctx
            .artifact_store
            .write_bytes(ArtifactKind::Script, &item_id, StageName::Scripting, script.as_bytes())
            .await
            .unwrap();
        item.artifacts.insert(ArtifactKind::Script, artifact);
        item
    }

    #[tokio::test]
    async fn produces_narration_audio_and_a_word_timings_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let item = item_with_script(&ctx, "three short words here").await;
        let adapter = NarrationAdapter::new(Arc::new(FakeSpeechSynthesizer));

        let outcome = adapter.execute(&ctx, &item).await.unwrap();
        let (kind, artifact) = &outcome.produced_artifacts[0];
        assert_eq!(*kind, ArtifactKind::Narration);
        assert!(tokio::fs::metadata(&artifact.path).await.unwrap().len() > 0);
        let sidecar = word_timings_path(&artifact.path);
        let timings: Vec<(String, u32, u32)> =
            serde_json::from_slice(&tokio::fs::read(&sidecar).await.unwrap()).unwrap();
        assert_eq!(timings.len(), 4);
    }

    #[tokio::test]
    async fn fails_fast_when_no_script_artifact_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let item = Item::new(ItemId::new("item-2"), Source::AiIdeation, "concept");
        let adapter = NarrationAdapter::new(Arc::new(FakeSpeechSynthesizer));

        let err = adapter.execute(&ctx, &item).await.unwrap_err();
        assert_eq!(err.kind, clipforge_domain::ErrorKind::Unexpected);
    }
}
