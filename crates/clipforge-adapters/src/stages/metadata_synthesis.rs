//! Metadata-synthesis adapter (§4.G, §6 "Text generation"): generates
//! title/description/tags from the finished script, producing the
//! `metadata_json` artifact.

use async_trait::async_trait;
use clipforge_core::{stage_fingerprint, StageAdapter, StageContext, StageOutcome};
use clipforge_domain::{ArtifactKind, ClassifiedError, ErrorKind, Item, StageName};
use serde_json::json;
use std::sync::Arc;

use crate::capabilities::TextGenerator;

pub struct MetadataSynthesisAdapter {
    generator: Arc<dyn TextGenerator>,
}

impl MetadataSynthesisAdapter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl StageAdapter for MetadataSynthesisAdapter {
    async fn execute(&self, ctx: &StageContext, item: &Item) -> Result<StageOutcome, ClassifiedError> {
        let script_ref = item.artifacts.get(&ArtifactKind::Script).ok_or_else(|| {
            ClassifiedError::new(ErrorKind::Unexpected, "missing script artifact", StageName::MetadataSynthesis)
        })?;
        let script = tokio::fs::read_to_string(&script_ref.path)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::MetadataSynthesis))?;

        let attempt = item.attempts_for(StageName::MetadataSynthesis);
        let key = stage_fingerprint(&item.item_id, StageName::MetadataSynthesis, attempt);
        let metadata = self.generator.generate_metadata(ctx, &script, &key).await?;

        let payload = json!({
            "title": metadata.title,
            "description": metadata.description,
            "tags": metadata.tags,
        });
        let bytes = serde_json::to_vec_pretty(&payload)
            .map_err(|e| ClassifiedError::new(ErrorKind::Unexpected, e.to_string(), StageName::MetadataSynthesis))?;

        let artifact = ctx
            .artifact_store
            .write_bytes(ArtifactKind::MetadataJson, &item.item_id, StageName::MetadataSynthesis, &bytes)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::MetadataSynthesis))?;

        let mut outcome = StageOutcome::default();
        outcome.produced_artifacts.push((ArtifactKind::MetadataJson, artifact));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeTextGenerator;
    use crate::stages::test_support::stage_context;
    use clipforge_domain::{ItemId, Source};

    #[tokio::test]
    async fn produces_metadata_json_from_the_script() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let item_id = ItemId::new("item-1");
        let mut item = Item::new(item_id.clone(), Source::AiIdeation, "concept");
        let script = ctx
            .artifact_store
            .write_bytes(ArtifactKind::Script, &item_id, StageName::Scripting, b"Three morning habits. Read more inside.")
            .await
            .unwrap();
        item.artifacts.insert(ArtifactKind::Script, script);

        let adapter = MetadataSynthesisAdapter::new(Arc::new(FakeTextGenerator));
        let outcome = adapter.execute(&ctx, &item).await.unwrap();
        let (kind, artifact) = &outcome.produced_artifacts[0];
        assert_eq!(*kind, ArtifactKind::MetadataJson);
        let payload: serde_json::Value = serde_json::from_slice(&tokio::fs::read(&artifact.path).await.unwrap()).unwrap();
        assert_eq!(payload["title"], "Three morning habits");
        assert!(payload["tags"].as_array().unwrap().contains(&json!("shorts")));
    }
}
