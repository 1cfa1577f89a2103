//! The Resilient Call Layer (§4.A): timeout, jittered backoff, per-service
//! circuit breaking, bulkheading, and idempotency-key plumbing for every
//! outbound collaborator call made by an adapter.

pub mod backoff_policy;
pub mod bulkhead;
pub mod caller;
pub mod circuit_breaker;
pub mod error;
pub mod registry;

pub use backoff_policy::backoff_for_attempt;
pub use bulkhead::{Bulkhead, BulkheadPermit, SharedBulkhead};
pub use caller::{CallContext, CallFuture, CallThunk, DefaultResilientCaller, ResilientCaller, ScriptedResilientCaller};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerSnapshot, CircuitState};
pub use error::{RawCallError, ResilientError};
pub use registry::ResilienceRegistry;
