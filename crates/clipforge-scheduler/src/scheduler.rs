//! Composition root for the scheduler: wires the Stage Registry's worker
//! pools to the discovery loop and owns graceful shutdown (§4.F, §8
//! "graceful shutdown drains in-flight work before exiting").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clipforge_core::{StageContext, StageRegistry};
use clipforge_dashboard::DashboardAdapter;
use clipforge_domain::StageName;
use clipforge_policies::ErrorClassificationPolicy;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::commit::SharedEventStore;
use crate::discovery::DiscoveryLoop;
use crate::job::{InFlightKey, StageJob};
use crate::worker::{spawn_stage_workers, QUEUE_CAPACITY};

pub struct SchedulerConfig {
    pub discovery_interval: Duration,
    pub shutdown_drain_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { discovery_interval: Duration::from_secs(5), shutdown_drain_timeout: Duration::from_secs(30) }
    }
}

pub struct Scheduler {
    discovery: DiscoveryLoop,
    worker_handles: Vec<tokio::task::JoinHandle<()>>,
    senders: HashMap<StageName, mpsc::Sender<StageJob>>,
    config: SchedulerConfig,
    cancellation: CancellationToken,
}

impl Scheduler {
    pub fn build(
        registry: Arc<StageRegistry>,
        dashboard: Arc<dyn DashboardAdapter>,
        events: SharedEventStore,
        policy: Arc<dyn ErrorClassificationPolicy + Send + Sync>,
        ctx: StageContext,
        config: SchedulerConfig,
    ) -> Self {
        let in_flight: Arc<DashMap<InFlightKey, ()>> = Arc::new(DashMap::new());
        let mut senders = HashMap::new();
        let mut worker_handles = Vec::new();

        for stage in StageName::ALL {
            let Some(def) = registry.definition(stage) else { continue };
            let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
            senders.insert(stage, tx);
            let handles = spawn_stage_workers(
                stage,
                def.worker_pool_size,
                rx,
                registry.clone(),
                dashboard.clone(),
                events.clone(),
                policy.clone(),
                ctx.clone(),
                in_flight.clone(),
            );
            worker_handles.extend(handles);
        }

        let discovery =
            DiscoveryLoop { registry, dashboard, ctx: ctx.clone(), senders: senders.clone(), in_flight };

        Self { discovery, worker_handles, senders, config, cancellation: ctx.cancellation.clone() }
    }

    /// Runs the discovery loop until the shared `CancellationToken` fires,
    /// then closes every stage queue and waits (bounded by
    /// `shutdown_drain_timeout`) for in-flight workers to finish.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.discovery_interval);
        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => break,
                _ = interval.tick() => {
                    let dispatched = self.discovery.tick().await;
                    if dispatched > 0 {
                        tracing::debug!(dispatched, "discovery tick dispatched jobs");
                    }
                }
            }
        }
        self.shutdown().await;
    }

    /// Runs exactly one discovery tick, for CLI `run-once` semantics, then
    /// waits for whatever it dispatched to drain.
    pub async fn run_once(self) {
        self.discovery.tick().await;
        self.shutdown().await;
    }

    async fn shutdown(self) {
        drop(self.senders);
        let drain = async {
            for handle in self.worker_handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(self.config.shutdown_drain_timeout, drain).await.is_err() {
            tracing::warn!("shutdown drain timed out with workers still in flight");
        }
    }
}
