//! End-to-end pipeline scenarios (§8 "End-to-end scenarios"), driven
//! entirely against the no-network fakes `Supervisor::bootstrap` wires by
//! default — no real collaborator, dashboard server, or media muxer is
//! reachable from a test process, so these exercise the full stage DAG
//! (ideation through publishing) against the real sqlite-backed dashboard
//! and the real atomic artifact store.

use std::collections::HashMap;

use clipforge_domain::ItemState;
use clipforge_supervisor::config::{PublishSettings, Settings, WorkerPoolOverrides};
use clipforge_supervisor::Supervisor;
use serde_json::json;

fn test_settings(data_root: std::path::PathBuf) -> Settings {
    Settings {
        data_root,
        retention_days: 7,
        discovery_interval_secs: 5,
        shutdown_drain_timeout_secs: 5,
        gc_interval_secs: 3600,
        ideas_per_ideation_run: 0,
        trend_min_score: 50.0,
        clips_needed: 3,
        publish: PublishSettings { privacy: "private".to_string(), made_for_kids: false, category_id: "22".to_string() },
        worker_pools: WorkerPoolOverrides::default(),
        metrics_port: 0,
    }
}

/// Drives discovery-and-drain ticks until every non-terminal item reaches a
/// terminal state (or the iteration cap is hit, which fails the test rather
/// than hanging forever on a stuck pipeline).
async fn run_until_terminal(supervisor: &Supervisor, max_ticks: usize) {
    for _ in 0..max_ticks {
        supervisor.run_once().await.unwrap();
        let items = supervisor.list_items().await.unwrap();
        if items.iter().all(|i| i.state.is_terminal()) {
            return;
        }
    }
    panic!("pipeline did not reach a terminal state within {max_ticks} ticks");
}

#[tokio::test]
async fn happy_path_runs_an_approved_item_through_to_publication() {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(dir.path().to_path_buf());
    let supervisor = Supervisor::bootstrap(settings).await.unwrap();

    let created = supervisor
        .dashboard
        .append_item(clipforge_dashboard::NewItem {
            source: clipforge_domain::Source::AiIdeation,
            concept_text: "Three Morning Habits".to_string(),
        })
        .await
        .unwrap();
    let mut fields = HashMap::new();
    fields.insert("state".to_string(), json!(ItemState::Approved));
    supervisor.dashboard.update_fields(&created.item_id, fields, &created.state).await.unwrap();

    run_until_terminal(&supervisor, 20).await;

    let finished = supervisor.dashboard.get_item(&created.item_id).await.unwrap();
    assert_eq!(finished.state, ItemState::Published);
    assert!(finished.publication_url.is_some());
    assert!(finished.publication_url.as_ref().unwrap().starts_with("https://video.example/"));

    for kind in [
        clipforge_domain::ArtifactKind::Script,
        clipforge_domain::ArtifactKind::Narration,
        clipforge_domain::ArtifactKind::StockClip,
        clipforge_domain::ArtifactKind::AssembledVideo,
        clipforge_domain::ArtifactKind::CaptionedVideo,
        clipforge_domain::ArtifactKind::MetadataJson,
    ] {
        let lock = supervisor.artifact_store.lock_item(&created.item_id).await.unwrap();
        let files = supervisor.artifact_store.list_finalized(kind, &created.item_id, &lock).await.unwrap();
        assert!(!files.is_empty(), "expected at least one finalized {kind:?} artifact");
    }
}

#[tokio::test]
async fn reset_reenters_a_failed_item_at_approved() {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(dir.path().to_path_buf());
    let supervisor = Supervisor::bootstrap(settings).await.unwrap();

    let created = supervisor
        .dashboard
        .append_item(clipforge_dashboard::NewItem {
            source: clipforge_domain::Source::AiIdeation,
            concept_text: "a concept".to_string(),
        })
        .await
        .unwrap();
    let mut fields = HashMap::new();
    fields.insert(
        "state".to_string(),
        json!(ItemState::Failed { stage: clipforge_domain::StageName::Scripting }),
    );
    fields.insert(
        "error".to_string(),
        json!(clipforge_domain::ClassifiedError::new(
            clipforge_domain::ErrorKind::Client,
            "bad prompt",
            clipforge_domain::StageName::Scripting
        )),
    );
    supervisor.dashboard.update_fields(&created.item_id, fields, &created.state).await.unwrap();

    supervisor.reset_item(&created.item_id).await.unwrap();

    let reset = supervisor.dashboard.get_item(&created.item_id).await.unwrap();
    assert_eq!(reset.state, ItemState::Approved);
    assert!(reset.error.is_none());
}

/// A failure at a stage past the first one must re-enter at the stage's
/// actual predecessor, not unconditionally at `Approved` — the item already
/// completed scripting/narration/clip-sourcing/assembly and a reset must not
/// discard that progress.
#[tokio::test]
async fn reset_reenters_an_item_failed_past_the_first_stage_at_its_last_successful_state() {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(dir.path().to_path_buf());
    let supervisor = Supervisor::bootstrap(settings).await.unwrap();

    let created = supervisor
        .dashboard
        .append_item(clipforge_dashboard::NewItem {
            source: clipforge_domain::Source::AiIdeation,
            concept_text: "a concept".to_string(),
        })
        .await
        .unwrap();
    let mut fields = HashMap::new();
    fields.insert(
        "state".to_string(),
        json!(ItemState::Failed { stage: clipforge_domain::StageName::Captioning }),
    );
    fields.insert(
        "error".to_string(),
        json!(clipforge_domain::ClassifiedError::new(
            clipforge_domain::ErrorKind::Client,
            "caption renderer rejected the clip",
            clipforge_domain::StageName::Captioning
        )),
    );
    supervisor.dashboard.update_fields(&created.item_id, fields, &created.state).await.unwrap();

    supervisor.reset_item(&created.item_id).await.unwrap();

    let reset = supervisor.dashboard.get_item(&created.item_id).await.unwrap();
    assert_eq!(reset.state, ItemState::Assembled);
    assert!(reset.error.is_none());
}

#[tokio::test]
async fn gc_once_leaves_artifacts_for_items_still_within_the_retention_window() {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(dir.path().to_path_buf());
    let supervisor = Supervisor::bootstrap(settings).await.unwrap();

    let created = supervisor
        .dashboard
        .append_item(clipforge_dashboard::NewItem {
            source: clipforge_domain::Source::AiIdeation,
            concept_text: "a concept".to_string(),
        })
        .await
        .unwrap();
    let mut fields = HashMap::new();
    fields.insert("state".to_string(), json!(ItemState::Published));
    supervisor.dashboard.update_fields(&created.item_id, fields, &created.state).await.unwrap();
    supervisor
        .artifact_store
        .write_bytes(
            clipforge_domain::ArtifactKind::Script,
            &created.item_id,
            clipforge_domain::StageName::Scripting,
            b"script",
        )
        .await
        .unwrap();

    let collected = supervisor.gc_once().await;
    assert_eq!(collected, 0, "a just-published item is within the retention window");

    let lock = supervisor.artifact_store.lock_item(&created.item_id).await.unwrap();
    let files =
        supervisor.artifact_store.list_finalized(clipforge_domain::ArtifactKind::Script, &created.item_id, &lock).await.unwrap();
    assert_eq!(files.len(), 1);
}
