//! Scripting adapter (§4.G, §6 "Text generation"): turns `concept_text` into
//! a ~160-word script artifact.

use async_trait::async_trait;
use clipforge_core::{stage_fingerprint, StageAdapter, StageContext, StageOutcome};
use clipforge_domain::{ArtifactKind, ClassifiedError, Item, StageName};
use std::sync::Arc;

use crate::capabilities::TextGenerator;

pub struct ScriptingAdapter {
    generator: Arc<dyn TextGenerator>,
}

impl ScriptingAdapter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl StageAdapter for ScriptingAdapter {
    async fn execute(&self, ctx: &StageContext, item: &Item) -> Result<StageOutcome, ClassifiedError> {
        let attempt = item.attempts_for(StageName::Scripting);
        let key = stage_fingerprint(&item.item_id, StageName::Scripting, attempt);
        let script = self.generator.generate_script(ctx, &item.concept_text, &key).await?;

        let artifact = ctx
            .artifact_store
            .write_bytes(ArtifactKind::Script, &item.item_id, StageName::Scripting, script.as_bytes())
            .await
            .map_err(|e| ClassifiedError::new(clipforge_domain::ErrorKind::Resource, e.to_string(), StageName::Scripting))?;

        let mut outcome = StageOutcome::default();
        outcome.produced_artifacts.push((ArtifactKind::Script, artifact));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeTextGenerator;
    use crate::stages::test_support::stage_context;
    use clipforge_domain::Source;

    #[tokio::test]
    async fn produces_a_script_artifact_from_the_concept() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let adapter = ScriptingAdapter::new(Arc::new(FakeTextGenerator));
        let item = Item::new(clipforge_domain::ItemId::new("item-1"), Source::AiIdeation, "three morning habits");

        let outcome = adapter.execute(&ctx, &item).await.unwrap();
        assert_eq!(outcome.produced_artifacts.len(), 1);
        let (kind, artifact) = &outcome.produced_artifacts[0];
        assert_eq!(*kind, ArtifactKind::Script);
        let contents = tokio::fs::read_to_string(&artifact.path).await.unwrap();
        assert!(contents.contains("three morning habits"));
    }

    #[tokio::test]
    async fn rerunning_with_the_same_attempt_count_yields_an_identical_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let adapter = ScriptingAdapter::new(Arc::new(FakeTextGenerator));
        let item = Item::new(clipforge_domain::ItemId::new("item-1"), Source::AiIdeation, "three morning habits");

        let first = adapter.execute(&ctx, &item).await.unwrap();
        let second = adapter.execute(&ctx, &item).await.unwrap();
        assert_eq!(first.produced_artifacts[0].1.sha256, second.produced_artifacts[0].1.sha256);
    }
}
