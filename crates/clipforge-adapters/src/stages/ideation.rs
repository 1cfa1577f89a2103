//! Ideation adapter (§4.G, §6 "Text generation"): proposes new concepts and
//! appends them to the dashboard as `pending_approval` items. Unlike the rest
//! of the pipeline's stages, this one does not act on an existing Item — the
//! supervisor's discovery loop calls it directly on a schedule rather than
//! dispatching it through the Stage Registry's per-item resolution.

use async_trait::async_trait;
use clipforge_core::{StageAdapter, StageContext, StageOutcome};
use clipforge_dashboard::{DashboardAdapter, NewItem};
use clipforge_domain::{ClassifiedError, Item, Source};
use std::sync::Arc;

use crate::capabilities::TextGenerator;

pub struct IdeationAdapter {
    generator: Arc<dyn TextGenerator>,
    dashboard: Arc<dyn DashboardAdapter>,
    ideas_per_run: usize,
}

impl IdeationAdapter {
    pub fn new(generator: Arc<dyn TextGenerator>, dashboard: Arc<dyn DashboardAdapter>, ideas_per_run: usize) -> Self {
        Self { generator, dashboard, ideas_per_run }
    }

    /// Runs one ideation pass, appending a `pending_approval` item per
    /// generated concept. Called by the supervisor's discovery loop, not
    /// through `StageAdapter::execute` (there is no pre-existing Item yet).
    pub async fn run_once(&self, ctx: &StageContext) -> Result<Vec<Item>, ClassifiedError> {
        let ideas = self.generator.generate_ideas(ctx, self.ideas_per_run).await?;
        let mut created = Vec::with_capacity(ideas.len());
        for concept in ideas {
            let item = self
                .dashboard
                .append_item(NewItem { source: Source::AiIdeation, concept_text: concept })
                .await
                .map_err(|e| {
                    ClassifiedError::new(
                        clipforge_domain::ErrorKind::Unexpected,
                        e.to_string(),
                        clipforge_domain::StageName::Ideation,
                    )
                })?;
            created.push(item);
        }
        Ok(created)
    }
}

#[async_trait]
impl StageAdapter for IdeationAdapter {
    async fn execute(&self, ctx: &StageContext, _item: &Item) -> Result<StageOutcome, ClassifiedError> {
        self.run_once(ctx).await?;
        Ok(StageOutcome::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeTextGenerator;
    use crate::stages::test_support::stage_context;
    use clipforge_dashboard::InMemoryDashboard;
    use clipforge_domain::ItemState;

    #[tokio::test]
    async fn run_once_appends_one_pending_approval_item_per_idea() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = stage_context(dir.path());
        let dashboard: Arc<dyn DashboardAdapter> = Arc::new(InMemoryDashboard::new());
        let adapter = IdeationAdapter::new(Arc::new(FakeTextGenerator), dashboard.clone(), 3);

        let created = adapter.run_once(&ctx).await.unwrap();
        assert_eq!(created.len(), 3);
        for item in &created {
            assert_eq!(item.state, ItemState::PendingApproval);
            assert_eq!(item.source, Source::AiIdeation);
        }
        let listed = dashboard.list_items(&clipforge_dashboard::ItemFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 3);
    }
}
