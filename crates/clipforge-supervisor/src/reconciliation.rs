//! Startup reconciliation (§4.D): before the scheduler starts dispatching
//! work, every item's local event log is replayed and compared against its
//! dashboard row. A crash between the local commit and the dashboard commit
//! of the three-step commit (§4.D) leaves the two disagreeing; this module
//! is what makes the next `run-once`/`run-loop` invocation self-healing
//! instead of requiring an operator to intervene.

use std::sync::{Arc, Mutex};

use clipforge_artifacts::ArtifactStore;
use clipforge_core::event::{EventStore, ItemEventKind, ReconciliationWinner as CoreWinner};
use clipforge_core::{reconcile, replay_from_store};
use clipforge_dashboard::{DashboardAdapter, ItemFilter};
use serde_json::json;
use std::collections::HashMap;

/// Walks every item currently known to the dashboard, replays its local
/// event log, and reconciles any disagreement. Returns the number of items
/// whose dashboard row was corrected.
pub async fn reconcile_at_startup(
    dashboard: &dyn DashboardAdapter,
    events: &Arc<Mutex<dyn EventStore>>,
    artifact_store: &ArtifactStore,
) -> usize {
    let items = match dashboard.list_items(&ItemFilter::default()).await {
        Ok(items) => items,
        Err(err) => {
            tracing::error!(%err, "reconciliation could not list dashboard items, skipping");
            return 0;
        }
    };

    let mut corrected = 0;
    for item in items {
        let local_projection = {
            let store = events.lock().expect("event store lock poisoned");
            replay_from_store(&*store, &item.item_id)
        };

        if local_projection.state == item.state {
            continue;
        }

        let guard = match artifact_store.lock_item(&item.item_id).await {
            Ok(guard) => guard,
            Err(err) => {
                tracing::error!(item_id = %item.item_id, %err, "failed to acquire item lock during reconciliation");
                continue;
            }
        };

        let mut artifacts_intact = true;
        for artifact_ref in item.artifacts.values() {
            match artifact_store.verify_reference(&item.item_id, artifact_ref, &guard).await {
                Ok(true) => {}
                Ok(false) => {
                    artifacts_intact = false;
                    break;
                }
                Err(err) => {
                    tracing::warn!(item_id = %item.item_id, %err, "failed to verify artifact during reconciliation");
                    artifacts_intact = false;
                    break;
                }
            }
        }
        drop(guard);

        let outcome = reconcile(&local_projection.state, &item.state, artifacts_intact);
        if outcome.state == item.state {
            continue;
        }

        tracing::warn!(
            item_id = %item.item_id,
            dashboard_state = ?item.state,
            local_state = ?local_projection.state,
            resulting_state = ?outcome.state,
            "reconciling disagreement between local event log and dashboard row"
        );

        let mut fields = HashMap::new();
        fields.insert("state".to_string(), json!(outcome.state));
        if let Err(err) = dashboard.update_fields(&item.item_id, fields, &item.state).await {
            tracing::error!(item_id = %item.item_id, %err, "failed to apply reconciled state to dashboard");
            continue;
        }

        let winner_label = match outcome.winner {
            CoreWinner::LocalState => "local_state",
            CoreWinner::Dashboard => "dashboard",
        };
        events.lock().expect("event store lock poisoned").append_kind(
            item.item_id.clone(),
            ItemEventKind::Reconciled { winner: outcome.winner, resulting_state: format!("{:?}", outcome.state) },
        );
        tracing::info!(item_id = %item.item_id, winner = winner_label, "reconciliation complete");
        corrected += 1;
    }
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_core::event::InMemoryEventStore;
    use clipforge_core::event::ItemEventKind as Kind;
    use clipforge_dashboard::{InMemoryDashboard, NewItem};
    use clipforge_domain::{Source, StageName};

    #[tokio::test]
    async fn corrects_dashboard_row_to_match_further_along_local_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let dashboard = InMemoryDashboard::new();
        let item = dashboard
            .append_item(NewItem { source: Source::AiIdeation, concept_text: "x".into() })
            .await
            .unwrap();
        // Approve so the dashboard side has a known non-initial state.
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), json!(clipforge_domain::ItemState::Approved));
        let item = dashboard.update_fields(&item.item_id, fields, &item.state).await.unwrap();

        let events: Arc<Mutex<dyn EventStore>> = Arc::new(Mutex::new(InMemoryEventStore::new()));
        {
            let mut guard = events.lock().unwrap();
            guard.append_kind(item.item_id.clone(), Kind::ItemCreated);
            guard.append_kind(item.item_id.clone(), Kind::Approved);
            guard.append_kind(item.item_id.clone(), Kind::StageStarted { stage: StageName::Scripting, attempt: 1 });
            guard.append_kind(
                item.item_id.clone(),
                Kind::StageCompleted {
                    stage: StageName::Scripting,
                    artifact_paths: vec![],
                    fingerprint: "fp".into(),
                },
            );
        }

        let corrected = reconcile_at_startup(&dashboard, &events, &store).await;
        assert_eq!(corrected, 1);
        let refreshed = dashboard.get_item(&item.item_id).await.unwrap();
        assert_eq!(refreshed.state, clipforge_domain::ItemState::Scripted);
    }
}
