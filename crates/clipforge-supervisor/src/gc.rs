//! Retention garbage collection (§9 Open Question #3): removes the on-disk
//! artifacts of terminal items (`published`/`failed`) once they have sat
//! past `retention_days`. The dashboard row and event log are left alone —
//! only the Atomic Artifact Store's bytes are reclaimed — so an operator can
//! still see what happened to an item after its clips are gone.

use std::sync::Arc;

use chrono::Utc;
use clipforge_artifacts::ArtifactStore;
use clipforge_dashboard::{DashboardAdapter, ItemFilter};
use clipforge_domain::ItemState;

/// One sweep: lists every dashboard item in a terminal state whose
/// `updated_at` is older than `retention_days`, and removes its artifact
/// tree under the item's lock. Returns the number of items collected.
pub async fn sweep(dashboard: &dyn DashboardAdapter, artifact_store: &ArtifactStore, retention_days: u32) -> usize {
    let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
    let items = match dashboard.list_items(&ItemFilter { states: None, updated_after: None }).await {
        Ok(items) => items,
        Err(err) => {
            tracing::error!(%err, "gc sweep could not list dashboard items");
            return 0;
        }
    };

    let mut collected = 0;
    for item in items {
        if !is_terminal_and_stale(&item.state, item.updated_at, cutoff) {
            continue;
        }
        let guard = match artifact_store.lock_item(&item.item_id).await {
            Ok(guard) => guard,
            Err(err) => {
                tracing::warn!(item_id = %item.item_id, %err, "gc failed to acquire item lock");
                continue;
            }
        };
        match artifact_store.remove_item_artifacts(&item.item_id, &guard).await {
            Ok(()) => {
                tracing::info!(item_id = %item.item_id, "retention gc removed artifacts");
                collected += 1;
            }
            Err(err) => tracing::warn!(item_id = %item.item_id, %err, "gc failed to remove artifacts"),
        }
    }
    collected
}

fn is_terminal_and_stale(
    state: &ItemState,
    updated_at: chrono::DateTime<Utc>,
    cutoff: chrono::DateTime<Utc>,
) -> bool {
    matches!(state, ItemState::Published | ItemState::Failed { .. }) && updated_at < cutoff
}

/// Runs `sweep` on a fixed interval until `cancellation` fires.
pub async fn run_loop(
    dashboard: Arc<dyn DashboardAdapter>,
    artifact_store: Arc<ArtifactStore>,
    retention_days: u32,
    interval: std::time::Duration,
    cancellation: tokio_util::sync::CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => return,
            _ = ticker.tick() => {
                let collected = sweep(dashboard.as_ref(), &artifact_store, retention_days).await;
                if collected > 0 {
                    tracing::info!(collected, "retention gc sweep complete");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn stale_published_item_is_collected() {
        let cutoff = Utc::now() - Duration::days(7);
        let updated_at = Utc::now() - Duration::days(10);
        assert!(is_terminal_and_stale(&ItemState::Published, updated_at, cutoff));
    }

    #[test]
    fn fresh_published_item_is_not_collected() {
        let cutoff = Utc::now() - Duration::days(7);
        let updated_at = Utc::now() - Duration::days(1);
        assert!(!is_terminal_and_stale(&ItemState::Published, updated_at, cutoff));
    }

    #[test]
    fn in_flight_item_is_never_collected_regardless_of_age() {
        let cutoff = Utc::now() - Duration::days(7);
        let updated_at = Utc::now() - Duration::days(365);
        assert!(!is_terminal_and_stale(&ItemState::Scripting, updated_at, cutoff));
    }
}
