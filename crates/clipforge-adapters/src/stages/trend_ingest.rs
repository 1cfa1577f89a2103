//! Trend-ingest adapter (§4.G, §6 "Trend ingest"): the second item-creation
//! source, alongside `IdeationAdapter`. The trend collaborator is an Open
//! Question resolved as optional — a deployment without one wires
//! `NoopTrendSource` and this adapter simply finds nothing each pass.

use async_trait::async_trait;
use clipforge_core::{StageAdapter, StageContext, StageOutcome};
use clipforge_dashboard::{DashboardAdapter, NewItem};
use clipforge_domain::{ClassifiedError, ErrorKind, Item, Source, StageName};
use std::sync::Arc;

use crate::capabilities::TrendSource;

pub struct TrendIngestAdapter {
    trend_source: Arc<dyn TrendSource>,
    dashboard: Arc<dyn DashboardAdapter>,
    min_score: f64,
}

impl TrendIngestAdapter {
    pub fn new(trend_source: Arc<dyn TrendSource>, dashboard: Arc<dyn DashboardAdapter>, min_score: f64) -> Self {
        Self { trend_source, dashboard, min_score }
    }

    pub async fn run_once(&self, ctx: &StageContext) -> Result<Vec<Item>, ClassifiedError> {
        let candidates = self.trend_source.list_recent(ctx, self.min_score).await?;
        let mut created = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let item = self
                .dashboard
                .append_item(NewItem { source: Source::SocialTrend, concept_text: candidate.title })
                .await
                .map_err(|e| ClassifiedError::new(ErrorKind::Unexpected, e.to_string(), StageName::TrendIngest))?;
            created.push(item);
        }
        Ok(created)
    }
}

#[async_trait]
impl StageAdapter for TrendIngestAdapter {
    async fn execute(&self, ctx: &StageContext, _item: &Item) -> Result<StageOutcome, ClassifiedError> {
        self.run_once(ctx).await?;
        Ok(StageOutcome::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeTrendSource, NoopTrendSource};
    use crate::stages::test_support::stage_context;
    use clipforge_dashboard::InMemoryDashboard;

    #[tokio::test]
    async fn run_once_ingests_candidates_above_the_score_floor() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let dashboard: Arc<dyn DashboardAdapter> = Arc::new(InMemoryDashboard::new());
        let adapter = TrendIngestAdapter::new(Arc::new(FakeTrendSource), dashboard.clone(), 50.0);

        let created = adapter.run_once(&ctx).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].source, Source::SocialTrend);
    }

    /// §9 Open Question #1: the trend source degrades gracefully when absent.
    #[tokio::test]
    async fn run_once_with_no_trend_source_ingests_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let dashboard: Arc<dyn DashboardAdapter> = Arc::new(InMemoryDashboard::new());
        let adapter = TrendIngestAdapter::new(Arc::new(NoopTrendSource), dashboard, 50.0);

        let created = adapter.run_once(&ctx).await.unwrap();
        assert!(created.is_empty());
    }
}
