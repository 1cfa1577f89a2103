//! Turns a stage's outcome (success or classified failure) into the
//! local event-log entry and dashboard field write that make the transition
//! durable (§4.D "three-step commit": artifact finalize, then local state
//! update, then dashboard update — the artifact is already on disk by the
//! time a `StageOutcome` exists, so this module covers the remaining two
//! steps, strictly in that order, so a crash between them always leaves the
//! local log ahead of the dashboard for reconciliation to catch at startup).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use clipforge_core::event::{EventStore, ItemEventKind};
use clipforge_core::{stage_fingerprint, StageOutcome};
use clipforge_dashboard::DashboardAdapter;
use clipforge_domain::{ArtifactKind, ArtifactRef, ClassifiedError, Item, ItemState, StageName};
use clipforge_policies::{ErrorClassificationPolicy, RetryDecision};
use serde_json::json;

pub type SharedEventStore = Arc<Mutex<dyn EventStore>>;

/// Commits a successful stage execution: advances the Item State Machine,
/// merges produced artifacts, and appends a `StageCompleted` event.
///
/// Returns `Ok(false)` (not an error) when the dashboard row moved out from
/// under us between read and write (`DashboardError::Stale`) — the next
/// discovery tick re-evaluates the item from its current row rather than
/// this stage retrying blindly against stale expectations.
pub async fn commit_success(
    dashboard: &dyn DashboardAdapter,
    events: &SharedEventStore,
    item: &Item,
    stage: StageName,
    outcome: StageOutcome,
) -> Result<bool, clipforge_dashboard::DashboardError> {
    let attempt = item.attempts_for(stage);
    let next_state = item
        .state
        .on_stage_completed(stage)
        .unwrap_or_else(|| panic!("stage {stage} completed from a state with no successor: {:?}", item.state));

    let mut artifacts: HashMap<ArtifactKind, ArtifactRef> = HashMap::new();
    let mut artifact_paths = Vec::with_capacity(outcome.produced_artifacts.len());
    for (kind, artifact_ref) in &outcome.produced_artifacts {
        artifact_paths.push(artifact_ref.path.clone());
        artifacts.insert(*kind, artifact_ref.clone());
    }

    let mut attempts_map: HashMap<StageName, u32> = HashMap::new();
    attempts_map.insert(stage, attempt + 1);

    let mut fields: HashMap<String, serde_json::Value> = HashMap::new();
    fields.insert("state".to_string(), json!(next_state));
    fields.insert("stage_attempts".to_string(), json!(attempts_map));
    if !artifacts.is_empty() {
        fields.insert("artifacts".to_string(), json!(artifacts));
    }
    fields.insert("error".to_string(), serde_json::Value::Null);
    for (key, value) in outcome.field_updates {
        fields.insert(key, value);
    }

    let fingerprint = stage_fingerprint(&item.item_id, stage, attempt);
    events.lock().expect("event store lock poisoned").append_kind(
        item.item_id.clone(),
        ItemEventKind::StageCompleted { stage, artifact_paths, fingerprint },
    );

    match dashboard.update_fields(&item.item_id, fields, &item.state).await {
        Ok(_) => {}
        Err(clipforge_dashboard::DashboardError::Stale { .. }) => return Ok(false),
        Err(e) => return Err(e),
    }

    Ok(true)
}

/// Commits a failed stage execution: runs the retry policy, transitions the
/// item to `retryable_error` or `failed`, and records a `StageFailed` (plus
/// `RetryScheduled`, when applicable) event.
pub async fn commit_failure(
    dashboard: &dyn DashboardAdapter,
    events: &SharedEventStore,
    policy: &dyn ErrorClassificationPolicy,
    max_attempts: u32,
    item: &Item,
    stage: StageName,
    error: ClassifiedError,
) -> Result<bool, clipforge_dashboard::DashboardError> {
    let attempt = item.attempts_for(stage);
    let (decision, rationale) = policy.decide(&error, attempt, max_attempts);
    tracing::info!(
        item_id = %item.item_id, stage = %stage, policy = rationale.policy_id,
        error_kind = ?rationale.error_kind, attempts = rationale.attempts, retried = rationale.retried,
        "stage failure classified"
    );

    let next_state = match &decision {
        RetryDecision::RetryAfter { after_ts, .. } => ItemState::RetryableError { stage, after_ts: *after_ts },
        RetryDecision::Fail { .. } => ItemState::Failed { stage },
    };

    let mut attempts_map: HashMap<StageName, u32> = HashMap::new();
    attempts_map.insert(stage, attempt + 1);

    let mut fields: HashMap<String, serde_json::Value> = HashMap::new();
    fields.insert("state".to_string(), json!(next_state));
    fields.insert("stage_attempts".to_string(), json!(attempts_map));
    if matches!(decision, RetryDecision::Fail { .. }) || error.kind.surfaces_immediately() {
        fields.insert("error".to_string(), json!(error));
    }

    let retryable = matches!(decision, RetryDecision::RetryAfter { .. });
    {
        let mut store = events.lock().expect("event store lock poisoned");
        store.append_kind(
            item.item_id.clone(),
            ItemEventKind::StageFailed { stage, error: error.clone(), retryable },
        );
        if let RetryDecision::RetryAfter { after_ts, .. } = decision {
            store.append_kind(
                item.item_id.clone(),
                ItemEventKind::RetryScheduled { stage, attempt: attempt + 1, after_ts },
            );
        }
    }

    match dashboard.update_fields(&item.item_id, fields, &item.state).await {
        Ok(_) => {}
        Err(clipforge_dashboard::DashboardError::Stale { .. }) => return Ok(false),
        Err(e) => return Err(e),
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_core::event::InMemoryEventStore;
    use clipforge_dashboard::{DashboardAdapter, InMemoryDashboard, NewItem};
    use clipforge_domain::{ArtifactRef, ErrorKind, Source};
    use clipforge_policies::DefaultRetryPolicy;

    async fn approved_item(dashboard: &dyn DashboardAdapter) -> Item {
        let item = dashboard.append_item(NewItem { source: Source::AiIdeation, concept_text: "x".into() }).await.unwrap();
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), json!(ItemState::Approved));
        dashboard.update_fields(&item.item_id, fields, &item.state).await.unwrap()
    }

    #[tokio::test]
    async fn commit_success_advances_state_and_records_artifacts() {
        let dashboard: Arc<dyn DashboardAdapter> = Arc::new(InMemoryDashboard::new());
        let events: SharedEventStore = Arc::new(Mutex::new(InMemoryEventStore::new()));
        let item = approved_item(dashboard.as_ref()).await;

        let artifact = ArtifactRef {
            path: "/tmp/script.txt".into(),
            size: 5,
            sha256: "abc".into(),
            producing_stage: StageName::Scripting,
            created_at: chrono::Utc::now(),
        };
        let mut outcome = clipforge_core::StageOutcome::default();
        outcome.produced_artifacts.push((ArtifactKind::Script, artifact));

        let committed = commit_success(dashboard.as_ref(), &events, &item, StageName::Scripting, outcome).await.unwrap();
        assert!(committed);

        let updated = dashboard.get_item(&item.item_id).await.unwrap();
        assert_eq!(updated.state, ItemState::Scripted);
        assert!(updated.artifacts.contains_key(&ArtifactKind::Script));
        assert_eq!(events.lock().unwrap().len_for(&item.item_id), 1);
    }

    #[tokio::test]
    async fn commit_success_returns_false_on_stale_expected_state() {
        let dashboard: Arc<dyn DashboardAdapter> = Arc::new(InMemoryDashboard::new());
        let events: SharedEventStore = Arc::new(Mutex::new(InMemoryEventStore::new()));
        let mut item = approved_item(dashboard.as_ref()).await;
        // Advance the row out from under the stale `item` snapshot.
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), json!(ItemState::Scripting));
        dashboard.update_fields(&item.item_id, fields, &item.state).await.unwrap();
        item.state = ItemState::Approved; // the caller's stale view

        let committed =
            commit_success(dashboard.as_ref(), &events, &item, StageName::Scripting, clipforge_core::StageOutcome::default())
                .await
                .unwrap();
        assert!(!committed);
    }

    #[tokio::test]
    async fn commit_failure_with_client_error_fails_immediately() {
        let dashboard: Arc<dyn DashboardAdapter> = Arc::new(InMemoryDashboard::new());
        let events: SharedEventStore = Arc::new(Mutex::new(InMemoryEventStore::new()));
        let policy = DefaultRetryPolicy::new();
        let item = approved_item(dashboard.as_ref()).await;
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), json!(ItemState::Scripting));
        let item = dashboard.update_fields(&item.item_id, fields, &item.state).await.unwrap();

        let error = ClassifiedError::new(ErrorKind::Client, "bad prompt", StageName::Scripting);
        commit_failure(dashboard.as_ref(), &events, &policy, 5, &item, StageName::Scripting, error).await.unwrap();

        let updated = dashboard.get_item(&item.item_id).await.unwrap();
        assert_eq!(updated.state, ItemState::Failed { stage: StageName::Scripting });
        assert!(updated.error.is_some());
    }

    #[tokio::test]
    async fn commit_failure_with_transient_error_schedules_a_retry() {
        let dashboard: Arc<dyn DashboardAdapter> = Arc::new(InMemoryDashboard::new());
        let events: SharedEventStore = Arc::new(Mutex::new(InMemoryEventStore::new()));
        let policy = DefaultRetryPolicy::new();
        let item = approved_item(dashboard.as_ref()).await;
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), json!(ItemState::Scripting));
        let item = dashboard.update_fields(&item.item_id, fields, &item.state).await.unwrap();

        let error = ClassifiedError::new(ErrorKind::Transient, "503", StageName::Scripting);
        commit_failure(dashboard.as_ref(), &events, &policy, 5, &item, StageName::Scripting, error).await.unwrap();

        let updated = dashboard.get_item(&item.item_id).await.unwrap();
        assert!(matches!(updated.state, ItemState::RetryableError { stage: StageName::Scripting, .. }));
        // §7: not surfaced to the dashboard until attempts are exhausted.
        assert!(updated.error.is_none());
    }
}
