//! Errors specific to the stage-graph engine itself (distinct from
//! `clipforge_domain::DomainError`, which covers the Item aggregate, and
//! `clipforge_domain::ErrorKind`, which is the closed stage-execution
//! taxonomy of §7).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CoreEngineError {
    #[error("no eligible next stage for the item's current state")]
    NoEligibleStage,
    #[error("stage {0} is not registered")]
    UnknownStage(String),
    #[error("precondition failed for stage {0}")]
    PreconditionFailed(String),
    #[error("internal: {0}")]
    Internal(String),
}
