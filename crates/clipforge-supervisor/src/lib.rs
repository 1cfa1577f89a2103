//! clipforge-supervisor: the composition root. Wires the Stage Registry,
//! dashboard, artifact store, resilience layer, and scheduler into a running
//! process, and owns everything that isn't specific to one pipeline stage:
//! configuration, logging, metrics, startup reconciliation, retention GC,
//! health reporting, and signal-driven graceful shutdown (§4.H, §4.I, §10).

pub mod adapters;
pub mod config;
pub mod gc;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod reconciliation;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use clipforge_artifacts::ArtifactStore;
use clipforge_core::event::{EventStore, FileEventStore};
use clipforge_core::{StageContext, StageRegistry};
use clipforge_dashboard::{DashboardAdapter, ItemFilter, SqliteDashboard};
use clipforge_domain::{ItemId, ItemState};
use clipforge_policies::{DefaultRetryPolicy, ErrorClassificationPolicy};
use clipforge_resilience::{DefaultResilientCaller, ResilienceRegistry, ResilientCaller};
use clipforge_scheduler::{Scheduler, SchedulerConfig};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use config::Settings;
use metrics::Metrics;

/// Everything a running process needs, built once in `bootstrap` and then
/// either driven through `run_once`/`run_loop` or queried directly by the
/// CLI's `status`/`gc`/`reset` subcommands.
pub struct Supervisor {
    pub settings: Settings,
    pub dashboard: Arc<dyn DashboardAdapter>,
    pub artifact_store: Arc<ArtifactStore>,
    pub resilience: Arc<ResilienceRegistry>,
    pub events: Arc<Mutex<dyn EventStore>>,
    pub registry: Arc<StageRegistry>,
    pub metrics: Arc<Metrics>,
    pub policy: Arc<dyn ErrorClassificationPolicy + Send + Sync>,
    pub ctx: StageContext,
}

impl Supervisor {
    /// Builds every component and wires the nine stage adapters against the
    /// no-network fakes (§6: "no particular provider SDK implemented" — a
    /// deployment swaps these for real clients behind the same capability
    /// traits without touching the supervisor). Restores any circuit breaker
    /// snapshot persisted before the previous shutdown.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        std::fs::create_dir_all(settings.data_root.join("state"))?;

        let dashboard: Arc<dyn DashboardAdapter> =
            Arc::new(SqliteDashboard::connect(&settings.items_db_path()).await?);
        let artifact_store = Arc::new(ArtifactStore::new(settings.artifact_root()));
        let events: Arc<Mutex<dyn EventStore>> =
            Arc::new(Mutex::new(FileEventStore::new(settings.data_root.join("state").join("events"))));

        let resilience = Arc::new(ResilienceRegistry::new());
        resilience.restore_snapshot(&settings.circuit_breaker_snapshot_path()).await;
        let caller: Arc<dyn ResilientCaller> = Arc::new(DefaultResilientCaller::new(resilience.clone()));

        let cancellation = CancellationToken::new();
        let ctx = StageContext { cancellation, caller, artifact_store: artifact_store.clone() };

        let registry = Arc::new(StageRegistry::build(adapters::build(&settings, dashboard.clone())));
        let metrics = Arc::new(Metrics::new()?);
        let policy: Arc<dyn ErrorClassificationPolicy + Send + Sync> = Arc::new(DefaultRetryPolicy::new());

        Ok(Self { settings, dashboard, artifact_store, resilience, events, registry, metrics, policy, ctx })
    }

    fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            discovery_interval: Duration::from_secs(self.settings.discovery_interval_secs),
            shutdown_drain_timeout: Duration::from_secs(self.settings.shutdown_drain_timeout_secs),
        }
    }

    fn build_scheduler(&self) -> Scheduler {
        Scheduler::build(
            self.registry.clone(),
            self.dashboard.clone(),
            self.events.clone(),
            self.policy.clone(),
            self.ctx.clone(),
            self.scheduler_config(),
        )
    }

    /// Runs reconciliation, then exactly one discovery tick and waits for
    /// whatever it dispatched to drain — the CLI `run-once` subcommand.
    pub async fn run_once(&self) -> anyhow::Result<()> {
        reconciliation::reconcile_at_startup(self.dashboard.as_ref(), &self.events, &self.artifact_store).await;
        self.build_scheduler().run_once().await;
        self.resilience.persist_snapshot(&self.settings.circuit_breaker_snapshot_path()).await;
        Ok(())
    }

    /// Runs reconciliation, then the scheduler's discovery loop, the
    /// retention GC loop, and the metrics endpoint concurrently until a
    /// shutdown signal (SIGINT/SIGTERM, or the returned cancellation token)
    /// fires — the CLI `run-loop` subcommand.
    pub async fn run_loop(&self) -> anyhow::Result<()> {
        reconciliation::reconcile_at_startup(self.dashboard.as_ref(), &self.events, &self.artifact_store).await;

        let shutdown = self.ctx.cancellation.clone();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received, draining in-flight work");
            signal_token.cancel();
        });

        let gc_handle = tokio::spawn(gc::run_loop(
            self.dashboard.clone(),
            self.artifact_store.clone(),
            self.settings.retention_days,
            Duration::from_secs(self.settings.gc_interval_secs),
            shutdown.clone(),
        ));

        let metrics_addr: std::net::SocketAddr = ([0, 0, 0, 0], self.settings.metrics_port).into();
        let metrics_handle = tokio::spawn(metrics::serve(self.metrics.clone(), metrics_addr, shutdown.clone()));

        self.build_scheduler().run().await;

        self.resilience.persist_snapshot(&self.settings.circuit_breaker_snapshot_path()).await;
        gc_handle.abort();
        metrics_handle.abort();
        Ok(())
    }

    /// Health snapshot for the CLI `status` subcommand.
    pub async fn status(&self) -> Result<health::HealthSnapshot, clipforge_dashboard::DashboardError> {
        health::snapshot(self.dashboard.as_ref(), &self.resilience).await
    }

    /// Operator-triggered reset (§7): re-enters `item_id` at its last
    /// successful state, discarding the `retryable_error`/`failed` tail, so
    /// the next discovery tick resumes the pipeline from the stage right
    /// after that state rather than discarding already-completed stages. For
    /// an item in any other state, resetting is a no-op transition back to
    /// itself (clearing `error`, which should already be unset). Does not
    /// touch artifacts already on disk; a re-run stage overwrites them via
    /// the normal rename-into-place path.
    pub async fn reset_item(&self, item_id: &ItemId) -> anyhow::Result<()> {
        let item = self.dashboard.get_item(item_id).await?;
        let target_state = match &item.state {
            ItemState::Failed { stage } | ItemState::RetryableError { stage, .. } => {
                ItemState::predecessor_for_stage(*stage)
            }
            other => other.clone(),
        };

        let mut fields = std::collections::HashMap::new();
        fields.insert("state".to_string(), json!(target_state));
        fields.insert("error".to_string(), serde_json::Value::Null);
        self.dashboard.update_fields(item_id, fields, &item.state).await?;

        self.events.lock().expect("event store lock poisoned").append_kind(
            item_id.clone(),
            clipforge_core::event::ItemEventKind::Reset { to_state: format!("{target_state}") },
        );
        Ok(())
    }

    /// One-off retention sweep for the CLI `gc` subcommand.
    pub async fn gc_once(&self) -> usize {
        gc::sweep(self.dashboard.as_ref(), &self.artifact_store, self.settings.retention_days).await
    }

    pub async fn list_items(&self) -> Result<Vec<clipforge_domain::Item>, clipforge_dashboard::DashboardError> {
        self.dashboard.list_items(&ItemFilter::default()).await
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
