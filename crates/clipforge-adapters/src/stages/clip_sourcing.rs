//! Clip-sourcing adapter (§4.G, §6 "Stock-clip search" + "Large-file
//! download"): searches for candidate stock clips then downloads each one,
//! finalizing every clip as its own `stock_clip` artifact.

use async_trait::async_trait;
use clipforge_core::{StageAdapter, StageContext, StageOutcome};
use clipforge_domain::{ArtifactKind, ClassifiedError, ErrorKind, Item, StageName};
use std::sync::Arc;

use crate::capabilities::{Downloader, StockClipSearch};

pub struct ClipSourcingAdapter {
    search: Arc<dyn StockClipSearch>,
    downloader: Arc<dyn Downloader>,
    clips_needed: usize,
}

impl ClipSourcingAdapter {
    pub fn new(search: Arc<dyn StockClipSearch>, downloader: Arc<dyn Downloader>, clips_needed: usize) -> Self {
        Self { search, downloader, clips_needed }
    }

    fn keyword(item: &Item) -> String {
        item.concept_text.split_whitespace().take(3).collect::<Vec<_>>().join(" ")
    }
}

#[async_trait]
impl StageAdapter for ClipSourcingAdapter {
    async fn execute(&self, ctx: &StageContext, item: &Item) -> Result<StageOutcome, ClassifiedError> {
        let keyword = Self::keyword(item);
        let candidates = self.search.search(ctx, &keyword, self.clips_needed).await?;
        if candidates.len() < self.clips_needed {
            return Err(ClassifiedError::new(
                ErrorKind::Unexpected,
                format!("only {} of {} required clips found", candidates.len(), self.clips_needed),
                StageName::ClipSourcing,
            ));
        }

        // Multiple clips share one artifact kind (§3 identity is
        // `(item_id, kind, version)`); `Item.artifacts` keeps only the most
        // recent reference per kind, so downstream stages recover the full
        // set via a locked directory scan (`ArtifactStore::list_finalized`)
        // rather than through `Item.artifacts`.
        let mut outcome = StageOutcome::default();
        for (i, candidate) in candidates.into_iter().take(self.clips_needed).enumerate() {
            let guard = ctx
                .artifact_store
                .begin_write(ArtifactKind::StockClip, &item.item_id)
                .await
                .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::ClipSourcing))?;
            self.downloader.download(ctx, &candidate.url, guard.temp_path()).await?;
            let artifact = guard
                .finalize(StageName::ClipSourcing)
                .await
                .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::ClipSourcing))?;
            tracing::debug!(item_id = %item.item_id, clip_index = i, "clip finalized");
            outcome.produced_artifacts.push((ArtifactKind::StockClip, artifact));
        }
        Ok(outcome)
    }
}
