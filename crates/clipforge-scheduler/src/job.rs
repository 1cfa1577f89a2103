//! A unit of dispatchable work: one stage execution for one item.

use clipforge_domain::{ItemId, StageName};

#[derive(Debug, Clone)]
pub struct StageJob {
    pub item_id: ItemId,
    pub stage: StageName,
}

/// Key the in-flight dedupe set is keyed by (§4.E "never dispatch the same
/// (item, stage) pair to two workers at once").
pub type InFlightKey = (ItemId, StageName);
