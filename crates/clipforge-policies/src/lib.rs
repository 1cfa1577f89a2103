//! clipforge-policies: deterministic, auditable error-classification and
//! retry/backoff policy (§4.D, §7).
//!
//! Stage failures funnel through an `ErrorClassificationPolicy` that decides
//! whether a failure becomes a scheduled retry (with a computed `after_ts`)
//! or a terminal `failed(stage)`, along with a `RetryRationale` record
//! suitable for logging/auditing the decision.

use chrono::{DateTime, Utc};
use clipforge_domain::{ClassifiedError, ErrorKind, RetryPolicy as DomainRetryPolicy, StageName};
use clipforge_resilience::backoff_for_attempt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryDecision {
    RetryAfter { stage: StageName, after_ts: DateTime<Utc> },
    Fail { stage: StageName },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryRationale {
    pub policy_id: &'static str,
    pub error_kind: ErrorKind,
    pub attempts: u32,
    pub max_attempts: u32,
    pub retried: bool,
}

pub trait ErrorClassificationPolicy {
    fn id(&self) -> &'static str;

    /// `attempts` is the count of attempts already made (0 on first
    /// failure), `max_attempts` the stage's declared ceiling (§4.E).
    fn decide(&self, error: &ClassifiedError, attempts: u32, max_attempts: u32) -> (RetryDecision, RetryRationale);
}

/// The §7 table, implemented once so every stage adapter applies it
/// identically rather than re-deriving it ad hoc.
pub struct DefaultRetryPolicy;

impl DefaultRetryPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DefaultRetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorClassificationPolicy for DefaultRetryPolicy {
    fn id(&self) -> &'static str {
        "default_retry"
    }

    fn decide(&self, error: &ClassifiedError, attempts: u32, max_attempts: u32) -> (RetryDecision, RetryRationale) {
        let under_ceiling = attempts < max_attempts;
        let retried = match error.kind.retry_policy() {
            DomainRetryPolicy::FailNow => false,
            DomainRetryPolicy::Retry => under_ceiling,
            DomainRetryPolicy::RetryOnceThenFail => attempts < 1,
        };
        let decision = if retried {
            let backoff = backoff_for_attempt((attempts + 1).max(1));
            let after_ts = Utc::now() + chrono::Duration::from_std(backoff).unwrap_or_default();
            RetryDecision::RetryAfter { stage: error.stage, after_ts }
        } else {
            RetryDecision::Fail { stage: error.stage }
        };
        let rationale =
            RetryRationale { policy_id: self.id(), error_kind: error.kind, attempts, max_attempts, retried };
        (decision, rationale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(kind: ErrorKind) -> ClassifiedError {
        ClassifiedError::new(kind, "boom", StageName::Narration)
    }

    #[test]
    fn client_error_never_retries() {
        let policy = DefaultRetryPolicy::new();
        let (decision, rationale) = policy.decide(&error(ErrorKind::Client), 0, 5);
        assert!(matches!(decision, RetryDecision::Fail { .. }));
        assert!(!rationale.retried);
    }

    #[test]
    fn transient_error_retries_until_ceiling() {
        let policy = DefaultRetryPolicy::new();
        let (decision, _) = policy.decide(&error(ErrorKind::Transient), 2, 5);
        assert!(matches!(decision, RetryDecision::RetryAfter { .. }));

        let (decision, _) = policy.decide(&error(ErrorKind::Transient), 5, 5);
        assert!(matches!(decision, RetryDecision::Fail { .. }));
    }

    #[test]
    fn resource_error_retries_exactly_once() {
        let policy = DefaultRetryPolicy::new();
        let (first, _) = policy.decide(&error(ErrorKind::Resource), 0, 5);
        assert!(matches!(first, RetryDecision::RetryAfter { .. }));

        let (second, _) = policy.decide(&error(ErrorKind::Resource), 1, 5);
        assert!(matches!(second, RetryDecision::Fail { .. }));
    }
}
