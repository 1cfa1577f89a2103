//! Approval-watcher adapter (§4.G, §4.D): watches for the operator edit that
//! moves an item from `pending_approval` to `approved`. Unlike the other
//! seven pipeline stages, `pending_approval` has no `next_stage`
//! (`ItemState::next_stage` returns `None` for it, §4.D) — an operator
//! action, not a stage completion, is what advances it. The supervisor's
//! discovery loop calls this directly on every `pending_approval` item
//! instead of routing it through `StageRegistry::resolve_next`.

use async_trait::async_trait;
use clipforge_core::{StageAdapter, StageContext, StageOutcome};
use clipforge_dashboard::DashboardAdapter;
use clipforge_domain::{ClassifiedError, ErrorKind, Item, ItemState, StageName};
use serde_json::json;
use std::sync::Arc;

pub struct ApprovalWatcherAdapter {
    dashboard: Arc<dyn DashboardAdapter>,
}

impl ApprovalWatcherAdapter {
    pub fn new(dashboard: Arc<dyn DashboardAdapter>) -> Self {
        Self { dashboard }
    }
}

#[async_trait]
impl StageAdapter for ApprovalWatcherAdapter {
    async fn execute(&self, _ctx: &StageContext, item: &Item) -> Result<StageOutcome, ClassifiedError> {
        let current = self
            .dashboard
            .get_item(&item.item_id)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Unexpected, e.to_string(), StageName::ApprovalWatcher))?;

        let mut outcome = StageOutcome::default();
        if current.state == ItemState::Approved {
            outcome.field_updates.insert("state".to_string(), json!(ItemState::Approved));
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_dashboard::InMemoryDashboard;

    #[tokio::test]
    async fn surfaces_no_update_while_still_pending() {
        let dashboard: Arc<dyn DashboardAdapter> = Arc::new(InMemoryDashboard::new());
        let created = dashboard
            .append_item(clipforge_dashboard::NewItem {
                source: clipforge_domain::Source::AiIdeation,
                concept_text: "x".into(),
            })
            .await
            .unwrap();
        let adapter = ApprovalWatcherAdapter::new(dashboard.clone());
        let ctx = StageContext {
            cancellation: tokio_util::sync::CancellationToken::new(),
            caller: Arc::new(clipforge_resilience::DefaultResilientCaller::new(Arc::new(
                clipforge_resilience::ResilienceRegistry::new(),
            ))),
            artifact_store: Arc::new(clipforge_artifacts::ArtifactStore::new(std::env::temp_dir())),
        };
        let outcome = adapter.execute(&ctx, &created).await.unwrap();
        assert!(outcome.field_updates.is_empty());
    }
}
