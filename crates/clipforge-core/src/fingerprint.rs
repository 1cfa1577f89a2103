//! Stage fingerprinting (§3, §4.A, §4.D, §4.G): a deterministic hash of
//! `(item_id, stage, attempt, engine version)` used both as the
//! provider-side idempotency key and to detect a would-be duplicate re-run.

use crate::constants::ENGINE_VERSION;
use crate::hashing::hash_value;
use clipforge_domain::{ItemId, StageName};
use serde_json::json;

pub fn stage_fingerprint(item_id: &ItemId, stage: StageName, attempt: u32) -> String {
    hash_value(&json!({
        "engine_version": ENGINE_VERSION,
        "item_id": item_id.as_str(),
        "stage": stage.as_str(),
        "attempt": attempt,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_for_same_inputs() {
        let id = ItemId::new("I1");
        assert_eq!(
            stage_fingerprint(&id, StageName::Scripting, 0),
            stage_fingerprint(&id, StageName::Scripting, 0)
        );
    }

    #[test]
    fn fingerprint_changes_with_attempt() {
        let id = ItemId::new("I1");
        assert_ne!(
            stage_fingerprint(&id, StageName::Scripting, 0),
            stage_fingerprint(&id, StageName::Scripting, 1)
        );
    }
}
