//! Per-stage worker pools: a bounded `mpsc` queue per `StageName`, drained by
//! `worker_pool_size` (§4.F) concurrent tasks sharing one receiver.

use std::sync::Arc;

use clipforge_core::{StageContext, StageRegistry};
use clipforge_dashboard::DashboardAdapter;
use clipforge_domain::{ClassifiedError, ErrorKind, StageName};
use clipforge_policies::ErrorClassificationPolicy;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::commit::{commit_failure, commit_success, SharedEventStore};
use crate::job::{InFlightKey, StageJob};

pub const QUEUE_CAPACITY: usize = 256;

/// Spawns `pool_size` workers draining `rx` for a single stage, returning
/// their join handles. All workers for a stage share one receiver so work
/// distributes itself rather than being pre-partitioned.
#[allow(clippy::too_many_arguments)]
pub fn spawn_stage_workers(
    stage: StageName,
    pool_size: usize,
    rx: mpsc::Receiver<StageJob>,
    registry: Arc<StageRegistry>,
    dashboard: Arc<dyn DashboardAdapter>,
    events: SharedEventStore,
    policy: Arc<dyn ErrorClassificationPolicy + Send + Sync>,
    ctx: StageContext,
    in_flight: Arc<DashMap<InFlightKey, ()>>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));
    (0..pool_size.max(1))
        .map(|worker_index| {
            let rx = rx.clone();
            let registry = registry.clone();
            let dashboard = dashboard.clone();
            let events = events.clone();
            let policy = policy.clone();
            let ctx = ctx.clone();
            let in_flight = in_flight.clone();
            tokio::spawn(async move {
                worker_loop(stage, worker_index, rx, registry, dashboard, events, policy, ctx, in_flight).await;
            })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    stage: StageName,
    worker_index: usize,
    rx: Arc<Mutex<mpsc::Receiver<StageJob>>>,
    registry: Arc<StageRegistry>,
    dashboard: Arc<dyn DashboardAdapter>,
    events: SharedEventStore,
    policy: Arc<dyn ErrorClassificationPolicy + Send + Sync>,
    ctx: StageContext,
    in_flight: Arc<DashMap<InFlightKey, ()>>,
) {
    loop {
        let job = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };
        let Some(job) = job else {
            tracing::debug!(%stage, worker_index, "stage queue closed, worker exiting");
            return;
        };

        let key: InFlightKey = (job.item_id.clone(), stage);
        let result = run_job(stage, &job, &registry, dashboard.as_ref(), &events, policy.as_ref(), &ctx).await;
        in_flight.remove(&key);

        if let Err(err) = result {
            tracing::error!(item_id = %job.item_id, %stage, %err, "failed to commit stage outcome");
        }
    }
}

async fn run_job(
    stage: StageName,
    job: &StageJob,
    registry: &StageRegistry,
    dashboard: &dyn DashboardAdapter,
    events: &SharedEventStore,
    policy: &dyn ErrorClassificationPolicy,
    ctx: &StageContext,
) -> Result<(), clipforge_dashboard::DashboardError> {
    let item = match dashboard.get_item(&job.item_id).await {
        Ok(item) => item,
        Err(clipforge_dashboard::DashboardError::NotFound(_)) => return Ok(()),
        Err(e) => return Err(e),
    };
    let Some(def) = registry.definition(stage) else {
        tracing::error!(%stage, "dispatched stage has no registry definition");
        return Ok(());
    };
    let Some(adapter) = registry.adapter(stage) else {
        tracing::error!(%stage, "dispatched stage has no registered adapter");
        return Ok(());
    };

    let attempt = item.attempts_for(stage) + 1;
    {
        let mut store = events.lock().expect("event store lock poisoned");
        store.append_kind(item.item_id.clone(), clipforge_core::event::ItemEventKind::StageStarted { stage, attempt });
    }

    let outcome = tokio::select! {
        res = adapter.execute(ctx, &item) => res,
        _ = ctx.cancellation.cancelled() => Err(ClassifiedError::new(ErrorKind::Unexpected, "cancelled during shutdown", stage)),
    };

    match outcome {
        Ok(outcome) => {
            commit_success(dashboard, events, &item, stage, outcome).await?;
        }
        Err(error) => {
            commit_failure(dashboard, events, policy, def.max_attempts, &item, stage, error).await?;
        }
    }
    Ok(())
}
