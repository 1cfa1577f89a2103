//! The nine pipeline stages (§4.E, §4.G) and their declared order.
//!
//! `StageName` is a closed enum rather than a free string: the Stage Registry
//! (`clipforge-core::registry`) is a static table keyed by this type, and the
//! DAG edges of §4.D are expressed as `StageName -> StageName` transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageName {
    Ideation,
    TrendIngest,
    ApprovalWatcher,
    Scripting,
    Narration,
    ClipSourcing,
    Assembly,
    Captioning,
    MetadataSynthesis,
    Publishing,
}

impl StageName {
    /// All stages in declared DAG order (§2, §4.E). `Ideation`/`TrendIngest` are
    /// the two discovery-side sources that create items; `ApprovalWatcher` gates
    /// entry into the rest of the sequential pipeline.
    pub const ALL: [StageName; 10] = [
        StageName::Ideation,
        StageName::TrendIngest,
        StageName::ApprovalWatcher,
        StageName::Scripting,
        StageName::Narration,
        StageName::ClipSourcing,
        StageName::Assembly,
        StageName::Captioning,
        StageName::MetadataSynthesis,
        StageName::Publishing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Ideation => "ideation",
            StageName::TrendIngest => "trend_ingest",
            StageName::ApprovalWatcher => "approval_watcher",
            StageName::Scripting => "scripting",
            StageName::Narration => "narrating",
            StageName::ClipSourcing => "sourcing_clips",
            StageName::Assembly => "assembling",
            StageName::Captioning => "captioning",
            StageName::MetadataSynthesis => "metadata_synthesis",
            StageName::Publishing => "publishing",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation class selecting timeouts/retry policy for a stage's external call
/// (§4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationClass {
    Health,
    Api,
    Search,
    Generation,
    Download,
    Auth,
    Stream,
}

impl OperationClass {
    /// (connect_timeout_secs, overall_timeout_secs) per §4.A.
    pub fn timeouts(&self) -> (u64, u64) {
        match self {
            OperationClass::Health => (5, 10),
            OperationClass::Api => (10, 30),
            OperationClass::Search => (10, 45),
            OperationClass::Generation => (15, 120),
            OperationClass::Download => (30, 300),
            OperationClass::Auth => (15, 30),
            OperationClass::Stream => (30, 600),
        }
    }
}

/// Rough duration bucket used by the scheduler to size worker pools (§4.E/§4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationBucket {
    Short,
    Medium,
    Long,
}
