use clipforge_domain::ErrorKind;
use thiserror::Error;

/// What a collaborator call reports about itself, before the resilience
/// layer decides what to do about it.
#[derive(Debug, Clone)]
pub struct RawCallError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RawCallError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

/// What the resilience layer hands back to the caller: either the raw error
/// classification from the operation, or one the layer itself produced
/// (timeout, circuit open, bulkhead full) without ever invoking the
/// operation.
#[derive(Debug, Error, Clone)]
pub enum ResilientError {
    #[error("operation timed out")]
    Timeout,
    #[error("circuit open for {service}/{op_class:?}")]
    CircuitOpen { service: String, op_class: clipforge_domain::OperationClass },
    #[error("bulkhead queue full or queue timeout exceeded for {service}")]
    BulkheadRejected { service: String },
    #[error("{0:?}: {1}")]
    Call(ErrorKind, String),
}

impl ResilientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResilientError::Timeout => ErrorKind::Timeout,
            ResilientError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            ResilientError::BulkheadRejected { .. } => ErrorKind::Resource,
            ResilientError::Call(k, _) => *k,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind().retry_policy(),
                 clipforge_domain::RetryPolicy::Retry | clipforge_domain::RetryPolicy::RetryOnceThenFail)
    }
}

impl From<RawCallError> for ResilientError {
    fn from(e: RawCallError) -> Self {
        ResilientError::Call(e.kind, e.message)
    }
}
