//! The discovery loop (§4.E, §4.F): on each tick, lists dashboard items,
//! resolves the next eligible stage for each via the Stage Registry, and
//! dispatches unclaimed `(item, stage)` pairs to the matching stage queue.
//! `ideation`/`trend_ingest` create items rather than acting on one, and
//! `approval_watcher` waits on an operator edit rather than a stage
//! completion — all three fall outside `StageRegistry::resolve_next` and are
//! driven directly from here instead (§4.D).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use clipforge_core::StageContext;
use clipforge_core::StageRegistry;
use clipforge_dashboard::{DashboardAdapter, ItemFilter};
use clipforge_domain::{Item, ItemId, ItemState, Source, StageName};
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::job::{InFlightKey, StageJob};

/// Placeholder id passed to the two item-creating stages, whose
/// `StageAdapter::execute` ignores the `&Item` argument entirely.
const DISCOVERY_TRIGGER_ITEM_ID: &str = "__discovery_trigger__";

fn discovery_trigger() -> Item {
    Item::new(ItemId::new(DISCOVERY_TRIGGER_ITEM_ID), Source::AiIdeation, "")
}

pub struct DiscoveryLoop {
    pub registry: Arc<StageRegistry>,
    pub dashboard: Arc<dyn DashboardAdapter>,
    pub ctx: StageContext,
    pub senders: HashMap<StageName, mpsc::Sender<StageJob>>,
    pub in_flight: Arc<DashMap<InFlightKey, ()>>,
}

impl DiscoveryLoop {
    /// One discovery pass. Returns the number of jobs newly dispatched, for
    /// logging/testing.
    pub async fn tick(&self) -> usize {
        self.run_creation_stage(StageName::Ideation).await;
        self.run_creation_stage(StageName::TrendIngest).await;

        let items = match self.dashboard.list_items(&ItemFilter::default()).await {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(%err, "discovery loop failed to list items");
                return 0;
            }
        };

        let mut dispatched = 0;
        let now = Utc::now();
        for item in items {
            if item.state.is_terminal() {
                continue;
            }
            if item.state == ItemState::PendingApproval {
                self.watch_approval(&item).await;
                continue;
            }
            let Some(def) = self.registry.resolve_next(&item.state, now) else {
                continue;
            };
            if self.dispatch(item.item_id.clone(), def.name).await {
                dispatched += 1;
            }
        }
        dispatched
    }

    async fn dispatch(&self, item_id: ItemId, stage: StageName) -> bool {
        let key: InFlightKey = (item_id.clone(), stage);
        if self.in_flight.contains_key(&key) {
            return false;
        }
        let Some(sender) = self.senders.get(&stage) else {
            tracing::error!(%stage, "no worker queue registered for stage");
            return false;
        };
        // Reserve before sending: a worker finishing between this check and
        // the send would otherwise let a second tick dispatch a duplicate.
        self.in_flight.insert(key.clone(), ());
        match sender.try_send(StageJob { item_id, stage }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.in_flight.remove(&key);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.in_flight.remove(&key);
                false
            }
        }
    }

    async fn run_creation_stage(&self, stage: StageName) {
        let key: InFlightKey = (ItemId::new(DISCOVERY_TRIGGER_ITEM_ID), stage);
        if self.in_flight.contains_key(&key) {
            return;
        }
        let Some(adapter) = self.registry.adapter(stage) else { return };
        self.in_flight.insert(key.clone(), ());
        let trigger = discovery_trigger();
        if let Err(err) = adapter.execute(&self.ctx, &trigger).await {
            tracing::warn!(%stage, %err, "discovery-source stage failed");
        }
        self.in_flight.remove(&key);
    }

    async fn watch_approval(&self, item: &Item) {
        let Some(adapter) = self.registry.adapter(StageName::ApprovalWatcher) else { return };
        let key: InFlightKey = (item.item_id.clone(), StageName::ApprovalWatcher);
        if self.in_flight.contains_key(&key) {
            return;
        }
        self.in_flight.insert(key.clone(), ());
        let result = adapter.execute(&self.ctx, item).await;
        self.in_flight.remove(&key);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(item_id = %item.item_id, %err, "approval watcher failed");
                return;
            }
        };
        if outcome.field_updates.is_empty() {
            return;
        }
        if let Err(err) = self.dashboard.update_fields(&item.item_id, outcome.field_updates, &item.state).await {
            tracing::warn!(item_id = %item.item_id, %err, "failed to record approval");
        }
    }
}
