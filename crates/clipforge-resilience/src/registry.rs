//! Keyed registry of circuit breakers and bulkheads, shared across workers
//! via `Arc` and looked up lazily on first use of a `(service, operation
//! class)` pair (§4.A, §6 persisted state).

use crate::bulkhead::Bulkhead;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerSnapshot, CircuitState};
use clipforge_domain::OperationClass;
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

const DEFAULT_BULKHEAD_CONCURRENCY: usize = 4;
const DEFAULT_QUEUE_TIMEOUT: Duration = Duration::from_secs(10);

fn op_class_from_debug(s: &str) -> Option<OperationClass> {
    match s {
        "Health" => Some(OperationClass::Health),
        "Api" => Some(OperationClass::Api),
        "Search" => Some(OperationClass::Search),
        "Generation" => Some(OperationClass::Generation),
        "Download" => Some(OperationClass::Download),
        "Auth" => Some(OperationClass::Auth),
        "Stream" => Some(OperationClass::Stream),
        _ => None,
    }
}

/// Owns every `CircuitBreaker` and `Bulkhead` the process creates. Entries
/// are created on first lookup ("get or insert") rather than pre-declared,
/// since the set of services a deployment talks to is config-driven.
pub struct ResilienceRegistry {
    breakers: DashMap<(String, String), Arc<CircuitBreaker>>,
    bulkheads: DashMap<String, Arc<Bulkhead>>,
}

impl Default for ResilienceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResilienceRegistry {
    pub fn new() -> Self {
        Self { breakers: DashMap::new(), bulkheads: DashMap::new() }
    }

    pub fn circuit_breaker(&self, service: &str, op_class: OperationClass) -> Arc<CircuitBreaker> {
        let key = (service.to_string(), format!("{op_class:?}"));
        self.breakers
            .entry(key)
            .or_insert_with(|| Arc::new(CircuitBreaker::new(service, op_class)))
            .clone()
    }

    pub fn bulkhead(&self, service: &str) -> Arc<Bulkhead> {
        self.bulkheads
            .entry(service.to_string())
            .or_insert_with(|| {
                Arc::new(Bulkhead::new(service, DEFAULT_BULKHEAD_CONCURRENCY, DEFAULT_QUEUE_TIMEOUT))
            })
            .clone()
    }

    pub fn snapshot(&self) -> Vec<CircuitBreakerSnapshot> {
        self.breakers
            .iter()
            .map(|entry| {
                let (service, op_class) = entry.key().clone();
                let cb = entry.value();
                let state = cb.state();
                let opened_at = if state == CircuitState::Closed { None } else { Some(SystemTime::now()) };
                CircuitBreakerSnapshot { service, op_class, state, opened_at }
            })
            .collect()
    }

    /// Persists the current breaker states to `path` as pretty JSON. Best
    /// effort: a write failure is logged and swallowed rather than
    /// propagated, since losing the snapshot degrades to "breakers start
    /// closed after restart" rather than corrupting anything.
    pub async fn persist_snapshot(&self, path: &Path) {
        let snapshot = self.snapshot();
        match serde_json::to_vec_pretty(&snapshot) {
            Ok(bytes) => {
                if let Some(parent) = path.parent() {
                    let _ = tokio::fs::create_dir_all(parent).await;
                }
                if let Err(err) = tokio::fs::write(path, bytes).await {
                    tracing::warn!(?err, path = %path.display(), "failed to persist circuit breaker snapshot");
                }
            }
            Err(err) => tracing::warn!(?err, "failed to serialize circuit breaker snapshot"),
        }
    }

    /// Restores breaker states recorded before a prior shutdown. A breaker
    /// that was `Open` is recreated `Open` with its failure window primed so
    /// it still honors the original cool-down rather than resetting to
    /// `Closed` on every restart.
    pub async fn restore_snapshot(&self, path: &Path) {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(_) => return, // no prior snapshot, start clean
        };
        let snapshot: Vec<CircuitBreakerSnapshot> = match serde_json::from_slice(&bytes) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(?err, "failed to parse circuit breaker snapshot, starting clean");
                return;
            }
        };
        for entry in snapshot {
            if entry.state != CircuitState::Open {
                continue;
            }
            let Some(op_class) = op_class_from_debug(&entry.op_class) else {
                tracing::warn!(op_class = %entry.op_class, "unknown operation class in circuit breaker snapshot, skipping");
                continue;
            };
            let Some(opened_at) = entry.opened_at else {
                continue;
            };
            tracing::info!(service = %entry.service, op_class = %entry.op_class,
                           "restoring circuit breaker in Open state from prior run");
            let breaker = CircuitBreaker::restore_open(entry.service.clone(), op_class, opened_at);
            self.breakers.insert((entry.service, entry.op_class), Arc::new(breaker));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitState;

    #[tokio::test]
    async fn persisted_open_breaker_is_restored_open_and_still_fast_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circuit-breakers.json");

        let registry = ResilienceRegistry::new();
        let breaker = registry.circuit_breaker("stock-search", OperationClass::Search);
        for _ in 0..10 {
            breaker.on_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        registry.persist_snapshot(&path).await;

        let restored = ResilienceRegistry::new();
        restored.restore_snapshot(&path).await;
        let restored_breaker = restored.circuit_breaker("stock-search", OperationClass::Search);
        assert_eq!(restored_breaker.state(), CircuitState::Open);
        assert!(restored_breaker.check().is_err());
    }

    #[tokio::test]
    async fn missing_snapshot_file_leaves_registry_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        let registry = ResilienceRegistry::new();
        registry.restore_snapshot(&path).await;
        // Fresh lookup after a no-op restore still starts Closed.
        let breaker = registry.circuit_breaker("svc", OperationClass::Api);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
