//! The closed error taxonomy (§7) and its local-policy behavior.

use crate::stage::StageName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kinds surfaced by the Resilient Call Layer and Validation (§4.A,
/// §4.J, §7). This is the taxonomy the rest of the system classifies against;
/// it is deliberately closed (no `Other(String)` catch-all beyond
/// `Unexpected`) so every call site must decide where an error belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ErrorKind {
    #[error("validation error")]
    Validation,
    #[error("authentication error")]
    Auth,
    #[error("client error")]
    Client,
    #[error("rate limited")]
    RateLimited,
    #[error("timeout")]
    Timeout,
    #[error("transient failure")]
    Transient,
    #[error("circuit open")]
    CircuitOpen,
    #[error("resource error")]
    Resource,
    #[error("unexpected error")]
    Unexpected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Transition to `retryable_error(stage, after_ts)`; never exceeds max
    /// attempts without moving to `failed`.
    Retry,
    /// Transition straight to `failed(stage)`; no automatic retry.
    FailNow,
    /// Retry once, then `FailNow` (used by `resource`, §7).
    RetryOnceThenFail,
}

impl ErrorKind {
    /// Local policy per §7's table.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            ErrorKind::Validation | ErrorKind::Auth | ErrorKind::Client => RetryPolicy::FailNow,
            ErrorKind::RateLimited
            | ErrorKind::Timeout
            | ErrorKind::Transient
            | ErrorKind::CircuitOpen
            | ErrorKind::Unexpected => RetryPolicy::Retry,
            ErrorKind::Resource => RetryPolicy::RetryOnceThenFail,
        }
    }

    /// Whether the dashboard `error` column is populated only after attempts
    /// are exhausted, vs. immediately (§7 "Surfaces to dashboard").
    pub fn surfaces_immediately(&self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::Auth | ErrorKind::Client)
    }
}

/// The last error recorded on an Item (§3 `error` field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// Human message, secrets already redacted (§4.I) before this is ever
    /// constructed.
    pub message: String,
    pub stage: StageName,
    pub timestamp: DateTime<Utc>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, stage: StageName) -> Self {
        Self { kind, message: message.into(), stage, timestamp: Utc::now() }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("item {0} not found")]
    ItemNotFound(String),
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("stage {0} attempts exceeded max_attempts")]
    AttemptsExceeded(StageName),
    #[error("validation failed: {0}")]
    Validation(String),
}
