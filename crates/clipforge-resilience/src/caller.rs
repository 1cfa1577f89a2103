//! The resilient call boundary (§4.A): every outbound collaborator call
//! (text generation, TTS, trend lookup, stock search, download, auth,
//! publish) is wrapped through here rather than called directly, so timeout,
//! retry/backoff, circuit breaking, and bulkheading are applied uniformly
//! regardless of which adapter is making the call.
//!
//! A generic `async fn call<F: Future<...>>(&self, op: F)` trait method is
//! not object-safe, so the boundary is expressed instead as a boxed
//! `Fn() -> Pin<Box<dyn Future<...>>>` thunk over neutral `serde_json::Value`
//! payloads. This keeps `ResilientCaller` usable as `Arc<dyn ResilientCaller>`
//! the same way the orchestration layer already prefers `Box<dyn Trait>`
//! over deep generics at composition boundaries.

use crate::backoff_policy::backoff_for_attempt;
use crate::error::{RawCallError, ResilientError};
use crate::registry::ResilienceRegistry;
use async_trait::async_trait;
use clipforge_domain::{ErrorKind, OperationClass, RetryPolicy};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub type CallFuture = Pin<Box<dyn Future<Output = Result<Value, RawCallError>> + Send>>;
pub type CallThunk = Box<dyn Fn() -> CallFuture + Send + Sync>;

/// Context describing one call for logging, idempotency, and retry-budget
/// purposes. `idempotency_key` is derived upstream from
/// `(item_id, stage, attempt_count)` per §4.A and threaded through so a
/// retried call can be recognized as a retry by a collaborator that supports
/// idempotency keys (most adapters pass it as a request header).
#[derive(Debug, Clone)]
pub struct CallContext {
    pub service: String,
    pub op_class: OperationClass,
    pub idempotency_key: String,
    pub max_attempts: u32,
}

#[async_trait]
pub trait ResilientCaller: Send + Sync {
    async fn call(&self, ctx: CallContext, op: CallThunk) -> Result<Value, ResilientError>;
}

pub struct DefaultResilientCaller {
    registry: Arc<ResilienceRegistry>,
}

impl DefaultResilientCaller {
    pub fn new(registry: Arc<ResilienceRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ResilientCaller for DefaultResilientCaller {
    async fn call(&self, ctx: CallContext, op: CallThunk) -> Result<Value, ResilientError> {
        let breaker = self.registry.circuit_breaker(&ctx.service, ctx.op_class);
        let bulkhead = self.registry.bulkhead(&ctx.service);
        let (_, overall_timeout_secs) = ctx.op_class.timeouts();
        let timeout = Duration::from_secs(overall_timeout_secs);

        let mut last_err: Option<ResilientError> = None;

        for attempt in 1..=ctx.max_attempts.max(1) {
            if breaker.check().is_err() {
                tracing::warn!(service = %ctx.service, op_class = ?ctx.op_class,
                               idempotency_key = %ctx.idempotency_key, "call rejected: circuit open");
                return Err(ResilientError::CircuitOpen { service: ctx.service.clone(), op_class: ctx.op_class });
            }

            let _permit = match bulkhead.acquire().await {
                Ok(permit) => permit,
                Err(()) => return Err(ResilientError::BulkheadRejected { service: ctx.service.clone() }),
            };

            let result = tokio::time::timeout(timeout, op()).await;

            match result {
                Ok(Ok(value)) => {
                    breaker.on_success();
                    return Ok(value);
                }
                Ok(Err(raw)) => {
                    breaker.on_failure();
                    let err = ResilientError::from(raw.clone());
                    tracing::warn!(service = %ctx.service, op_class = ?ctx.op_class, attempt,
                                   idempotency_key = %ctx.idempotency_key, kind = ?raw.kind,
                                   message = %raw.message, "call failed");
                    let policy = raw.kind.retry_policy();
                    last_err = Some(err);
                    if !should_retry(policy, attempt, ctx.max_attempts) {
                        break;
                    }
                }
                Err(_) => {
                    breaker.on_failure();
                    tracing::warn!(service = %ctx.service, op_class = ?ctx.op_class, attempt,
                                   idempotency_key = %ctx.idempotency_key, "call timed out");
                    last_err = Some(ResilientError::Timeout);
                    if !should_retry(ErrorKind::Timeout.retry_policy(), attempt, ctx.max_attempts) {
                        break;
                    }
                }
            }

            if attempt < ctx.max_attempts {
                tokio::time::sleep(backoff_for_attempt(attempt)).await;
            }
        }

        Err(last_err.unwrap_or(ResilientError::Timeout))
    }
}

fn should_retry(policy: RetryPolicy, attempt: u32, max_attempts: u32) -> bool {
    match policy {
        RetryPolicy::FailNow => false,
        RetryPolicy::Retry => attempt < max_attempts,
        RetryPolicy::RetryOnceThenFail => attempt < 2,
    }
}

/// Record/replay caller for tests: returns a scripted sequence of results per
/// service, one per call, ignoring timeout/circuit-breaker/bulkhead behavior
/// entirely so a test controls exactly which attempt fails and which
/// succeeds. Calling past the end of a service's script panics loudly rather
/// than silently looping, since an unscripted call usually means the test's
/// expected attempt count is wrong.
pub struct ScriptedResilientCaller {
    scripts: std::sync::Mutex<std::collections::HashMap<String, std::collections::VecDeque<Result<Value, RawCallError>>>>,
}

impl ScriptedResilientCaller {
    pub fn new() -> Self {
        Self { scripts: std::sync::Mutex::new(std::collections::HashMap::new()) }
    }

    pub fn push(&self, service: &str, result: Result<Value, RawCallError>) {
        self.scripts
            .lock()
            .expect("scripted caller lock poisoned")
            .entry(service.to_string())
            .or_default()
            .push_back(result);
    }
}

impl Default for ScriptedResilientCaller {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResilientCaller for ScriptedResilientCaller {
    async fn call(&self, ctx: CallContext, _op: CallThunk) -> Result<Value, ResilientError> {
        let next = self
            .scripts
            .lock()
            .expect("scripted caller lock poisoned")
            .get_mut(&ctx.service)
            .and_then(|q| q.pop_front());
        match next {
            Some(Ok(value)) => Ok(value),
            Some(Err(raw)) => Err(ResilientError::from(raw)),
            None => panic!("ScriptedResilientCaller: no scripted result left for service {}", ctx.service),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_domain::ErrorKind;

    fn ctx(service: &str, max_attempts: u32) -> CallContext {
        CallContext {
            service: service.to_string(),
            op_class: OperationClass::Api,
            idempotency_key: "item-1:scripting:0".to_string(),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry_on_first_success() {
        let caller = DefaultResilientCaller::new(Arc::new(ResilienceRegistry::new()));
        let op: CallThunk = Box::new(|| Box::pin(async { Ok(Value::Bool(true)) }));
        let result = caller.call(ctx("svc-a", 3), op).await.unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let caller = DefaultResilientCaller::new(Arc::new(ResilienceRegistry::new()));
        let attempts = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let op: CallThunk = Box::new(move || {
            let attempts = attempts_clone.clone();
            Box::pin(async move {
                let n = attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    Err(RawCallError::new(ErrorKind::Transient, "flaky"))
                } else {
                    Ok(Value::Bool(true))
                }
            })
        });
        let result = caller.call(ctx("svc-b", 3), op).await.unwrap();
        assert_eq!(result, Value::Bool(true));
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn validation_errors_fail_fast_without_retry() {
        let caller = DefaultResilientCaller::new(Arc::new(ResilienceRegistry::new()));
        let attempts = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let op: CallThunk = Box::new(move || {
            let attempts = attempts_clone.clone();
            Box::pin(async move {
                attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err(RawCallError::new(ErrorKind::Validation, "bad input"))
            })
        });
        let result = caller.call(ctx("svc-c", 5), op).await;
        assert!(result.is_err());
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
