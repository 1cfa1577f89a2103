//! Publishing adapter (§4.G, §6 "Publication"): uploads the captioned video
//! with the synthesized metadata and records the resulting URL.

use async_trait::async_trait;
use clipforge_core::{stage_fingerprint, StageAdapter, StageContext, StageOutcome};
use clipforge_domain::{ArtifactKind, ClassifiedError, ErrorKind, Item, StageName};
use serde_json::json;
use std::sync::Arc;

use crate::capabilities::{PublishRequest, Publisher};

pub struct PublishingAdapter {
    publisher: Arc<dyn Publisher>,
    privacy: String,
    made_for_kids: bool,
    category_id: String,
}

impl PublishingAdapter {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        privacy: impl Into<String>,
        made_for_kids: bool,
        category_id: impl Into<String>,
    ) -> Self {
        Self { publisher, privacy: privacy.into(), made_for_kids, category_id: category_id.into() }
    }
}

#[derive(serde::Deserialize)]
struct Metadata {
    title: String,
    description: String,
    tags: Vec<String>,
}

#[async_trait]
impl StageAdapter for PublishingAdapter {
    async fn execute(&self, ctx: &StageContext, item: &Item) -> Result<StageOutcome, ClassifiedError> {
        let video_ref = item
            .artifacts
            .get(&ArtifactKind::CaptionedVideo)
            .ok_or_else(|| ClassifiedError::new(ErrorKind::Unexpected, "missing captioned video artifact", StageName::Publishing))?;
        let metadata_ref = item.artifacts.get(&ArtifactKind::MetadataJson).ok_or_else(|| {
            ClassifiedError::new(ErrorKind::Unexpected, "missing metadata artifact", StageName::Publishing)
        })?;
        let metadata_bytes = tokio::fs::read(&metadata_ref.path)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Publishing))?;
        let metadata: Metadata = serde_json::from_slice(&metadata_bytes)
            .map_err(|e| ClassifiedError::new(ErrorKind::Unexpected, e.to_string(), StageName::Publishing))?;

        let attempt = item.attempts_for(StageName::Publishing);
        let key = stage_fingerprint(&item.item_id, StageName::Publishing, attempt);
        let request = PublishRequest {
            title: metadata.title,
            description: metadata.description,
            tags: metadata.tags,
            privacy: self.privacy.clone(),
            made_for_kids: self.made_for_kids,
            category_id: self.category_id.clone(),
            video_path: std::path::PathBuf::from(&video_ref.path),
        };
        let url = self.publisher.publish(ctx, &request, &key).await?;

        let mut outcome = StageOutcome::default();
        outcome.field_updates.insert("publication_url".to_string(), json!(url));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakePublisher;
    use crate::stages::test_support::stage_context;
    use clipforge_domain::{ItemId, Source};

    #[tokio::test]
    async fn publishes_using_the_captioned_video_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let item_id = ItemId::new("item-1");
        let mut item = Item::new(item_id.clone(), Source::AiIdeation, "concept");

        let video = ctx
            .artifact_store
            .write_bytes(ArtifactKind::CaptionedVideo, &item_id, StageName::Captioning, b"video")
            .await
            .unwrap();
        item.artifacts.insert(ArtifactKind::CaptionedVideo, video);

        let metadata_payload = json!({"title": "t", "description": "d", "tags": ["a", "b"]});
        let metadata = ctx
            .artifact_store
            .write_bytes(
                ArtifactKind::MetadataJson,
                &item_id,
                StageName::MetadataSynthesis,
                serde_json::to_vec(&metadata_payload).unwrap().as_slice(),
            )
            .await
            .unwrap();
        item.artifacts.insert(ArtifactKind::MetadataJson, metadata);

        let adapter = PublishingAdapter::new(Arc::new(FakePublisher), "private", false, "22");
        let outcome = adapter.execute(&ctx, &item).await.unwrap();
        let url = outcome.field_updates.get("publication_url").unwrap().as_str().unwrap();
        assert!(url.starts_with("https://video.example/watch?v="));
    }

    #[tokio::test]
    async fn fails_fast_when_metadata_artifact_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let item_id = ItemId::new("item-2");
        let mut item = Item::new(item_id.clone(), Source::AiIdeation, "concept");
        let video = ctx
            .artifact_store
            .write_bytes(ArtifactKind::CaptionedVideo, &item_id, StageName::Captioning, b"video")
            .await
            .unwrap();
        item.artifacts.insert(ArtifactKind::CaptionedVideo, video);

        let adapter = PublishingAdapter::new(Arc::new(FakePublisher), "private", false, "22");
        let err = adapter.execute(&ctx, &item).await.unwrap_err();
        assert_eq!(err.kind, clipforge_domain::ErrorKind::Unexpected);
    }
}
