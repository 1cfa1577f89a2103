//! Health snapshot (§10 "Health"): a point-in-time summary of queue depths,
//! per-stage item counts by state, and circuit breaker states, used by the
//! CLI `status` subcommand and suitable for a future `/health` endpoint.

use std::collections::HashMap;

use clipforge_dashboard::{DashboardAdapter, ItemFilter};
use clipforge_domain::ItemState;
use clipforge_resilience::{CircuitBreakerSnapshot, ResilienceRegistry};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthSnapshot {
    pub item_counts_by_state: HashMap<String, usize>,
    pub circuit_breakers: Vec<CircuitBreakerSnapshot>,
}

pub async fn snapshot(
    dashboard: &dyn DashboardAdapter,
    resilience: &ResilienceRegistry,
) -> Result<HealthSnapshot, clipforge_dashboard::DashboardError> {
    let items = dashboard.list_items(&ItemFilter::default()).await?;
    let mut item_counts_by_state: HashMap<String, usize> = HashMap::new();
    for item in &items {
        *item_counts_by_state.entry(state_label(&item.state)).or_insert(0) += 1;
    }
    Ok(HealthSnapshot { item_counts_by_state, circuit_breakers: resilience.snapshot() })
}

fn state_label(state: &ItemState) -> String {
    match state {
        ItemState::RetryableError { stage, .. } => format!("retryable_error:{stage}"),
        ItemState::Failed { stage } => format!("failed:{stage}"),
        other => other.to_string(),
    }
}
