//! The Stage Registry (§4.E): a static declarative table describing the
//! nine pipeline stages, plus resolution of the unique next-eligible stage
//! given an item's current state.

use clipforge_domain::{DurationBucket, ItemState, OperationClass, StageName};
use std::collections::HashMap;
use std::sync::Arc;

use crate::stage_adapter::StageAdapter;

#[derive(Clone)]
pub struct StageDefinition {
    pub name: StageName,
    pub max_attempts: u32,
    pub operation_class: OperationClass,
    pub estimated_duration: DurationBucket,
    pub worker_pool_size: usize,
}

/// Built once at startup from a fixed array of `StageDefinition`s plus each
/// stage's adapter, then looked up by name or resolved from an item's
/// current state (§4.E "single source of truth for the allowed workflow
/// graph").
pub struct StageRegistry {
    definitions: HashMap<StageName, StageDefinition>,
    adapters: HashMap<StageName, Arc<dyn StageAdapter>>,
}

impl StageRegistry {
    /// Worker pool sizing defaults per §4.F.
    pub fn build(adapters: HashMap<StageName, Arc<dyn StageAdapter>>) -> Self {
        let defs = [
            StageDefinition {
                name: StageName::Ideation,
                max_attempts: 3,
                operation_class: OperationClass::Generation,
                estimated_duration: DurationBucket::Short,
                worker_pool_size: 2,
            },
            StageDefinition {
                name: StageName::TrendIngest,
                max_attempts: 3,
                operation_class: OperationClass::Api,
                estimated_duration: DurationBucket::Short,
                worker_pool_size: 1,
            },
            StageDefinition {
                name: StageName::ApprovalWatcher,
                max_attempts: 1,
                operation_class: OperationClass::Health,
                estimated_duration: DurationBucket::Short,
                worker_pool_size: 1,
            },
            StageDefinition {
                name: StageName::Scripting,
                max_attempts: 5,
                operation_class: OperationClass::Generation,
                estimated_duration: DurationBucket::Medium,
                worker_pool_size: 4,
            },
            StageDefinition {
                name: StageName::Narration,
                max_attempts: 5,
                operation_class: OperationClass::Generation,
                estimated_duration: DurationBucket::Medium,
                worker_pool_size: 2,
            },
            StageDefinition {
                name: StageName::ClipSourcing,
                max_attempts: 5,
                operation_class: OperationClass::Search,
                estimated_duration: DurationBucket::Medium,
                worker_pool_size: 2,
            },
            StageDefinition {
                name: StageName::Assembly,
                max_attempts: 3,
                operation_class: OperationClass::Download,
                estimated_duration: DurationBucket::Long,
                worker_pool_size: 1,
            },
            StageDefinition {
                name: StageName::Captioning,
                max_attempts: 3,
                operation_class: OperationClass::Generation,
                estimated_duration: DurationBucket::Long,
                worker_pool_size: 1,
            },
            StageDefinition {
                name: StageName::MetadataSynthesis,
                max_attempts: 5,
                operation_class: OperationClass::Generation,
                estimated_duration: DurationBucket::Short,
                worker_pool_size: 4,
            },
            StageDefinition {
                name: StageName::Publishing,
                max_attempts: 3,
                operation_class: OperationClass::Auth,
                estimated_duration: DurationBucket::Long,
                worker_pool_size: 1,
            },
        ];
        let definitions = defs.into_iter().map(|d| (d.name, d)).collect();
        Self { definitions, adapters }
    }

    pub fn definition(&self, stage: StageName) -> Option<&StageDefinition> {
        self.definitions.get(&stage)
    }

    pub fn adapter(&self, stage: StageName) -> Option<Arc<dyn StageAdapter>> {
        self.adapters.get(&stage).cloned()
    }

    /// Resolves the unique next-eligible stage for an item's current state,
    /// or `None` if the item is terminal, waiting on an operator action, or
    /// its `retryable_error.after_ts` has not yet elapsed.
    pub fn resolve_next(&self, state: &ItemState, now: chrono::DateTime<chrono::Utc>) -> Option<&StageDefinition> {
        match state {
            ItemState::RetryableError { stage, after_ts } => {
                if *after_ts > now {
                    None
                } else {
                    self.definitions.get(stage)
                }
            }
            _ => state.next_stage().and_then(|s| self.definitions.get(&s)),
        }
    }

    pub fn all_stage_names(&self) -> impl Iterator<Item = &StageName> {
        self.definitions.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn resolve_next_returns_scripting_for_approved() {
        let registry = StageRegistry::build(HashMap::new());
        let def = registry.resolve_next(&ItemState::Approved, Utc::now()).unwrap();
        assert_eq!(def.name, StageName::Scripting);
    }

    #[test]
    fn resolve_next_withholds_retryable_error_before_after_ts() {
        let registry = StageRegistry::build(HashMap::new());
        let future = Utc::now() + chrono::Duration::seconds(60);
        let state = ItemState::RetryableError { stage: StageName::Narration, after_ts: future };
        assert!(registry.resolve_next(&state, Utc::now()).is_none());
    }

    #[test]
    fn resolve_next_releases_retryable_error_after_after_ts() {
        let registry = StageRegistry::build(HashMap::new());
        let past = Utc::now() - chrono::Duration::seconds(1);
        let state = ItemState::RetryableError { stage: StageName::Narration, after_ts: past };
        let def = registry.resolve_next(&state, Utc::now()).unwrap();
        assert_eq!(def.name, StageName::Narration);
    }

    #[test]
    fn resolve_next_is_none_for_terminal_states() {
        let registry = StageRegistry::build(HashMap::new());
        assert!(registry.resolve_next(&ItemState::Published, Utc::now()).is_none());
        assert!(registry
            .resolve_next(&ItemState::Failed { stage: StageName::Scripting }, Utc::now())
            .is_none());
    }
}
