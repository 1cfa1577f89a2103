//! The `DashboardAdapter` trait (§4.C): the sole component permitted to talk
//! to the external row store. Field writes are validated before being
//! applied to a row; optimistic concurrency is enforced against the row's
//! current `state`.

use async_trait::async_trait;
use clipforge_domain::{ArtifactKind, ArtifactRef, ClassifiedError, Item, ItemId, ItemState, Source, StageName};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::DashboardError;

/// Constraint applied by `list_items`; `None` on either axis means "no
/// constraint on this axis".
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub states: Option<Vec<ItemState>>,
    pub updated_after: Option<chrono::DateTime<chrono::Utc>>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(states) = &self.states {
            if !states.contains(&item.state) {
                return false;
            }
        }
        if let Some(after) = self.updated_after {
            if item.updated_at <= after {
                return false;
            }
        }
        true
    }
}

/// A not-yet-persisted item; the adapter assigns the `item_id`.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub source: Source,
    pub concept_text: String,
}

#[async_trait]
pub trait DashboardAdapter: Send + Sync {
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, DashboardError>;
    async fn append_item(&self, draft: NewItem) -> Result<Item, DashboardError>;
    async fn get_item(&self, item_id: &ItemId) -> Result<Item, DashboardError>;

    /// Optimistic-concurrency field write: fails with `DashboardError::Stale`
    /// if the row's current `state` is not `expected_state`.
    async fn update_fields(
        &self,
        item_id: &ItemId,
        fields: HashMap<String, Value>,
        expected_state: &ItemState,
    ) -> Result<Item, DashboardError>;
}

/// Applies a validated field-write map onto an in-memory `Item`, shared by
/// both adapter implementations so the merge semantics can't drift between
/// them. Unknown keys are rejected rather than silently ignored (§4.J).
pub(crate) fn apply_fields(item: &mut Item, fields: HashMap<String, Value>) -> Result<(), DashboardError> {
    for (key, value) in fields {
        match key.as_str() {
            "concept_text" => {
                item.concept_text = value
                    .as_str()
                    .ok_or_else(|| DashboardError::InvalidField("concept_text must be a string".into()))?
                    .to_string();
            }
            "publication_url" => {
                item.publication_url = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    _ => return Err(DashboardError::InvalidField("publication_url must be a string or null".into())),
                };
            }
            "error" => {
                item.error = match value {
                    Value::Null => None,
                    other => Some(
                        serde_json::from_value::<ClassifiedError>(other)
                            .map_err(|e| DashboardError::InvalidField(format!("error: {e}")))?,
                    ),
                };
            }
            "state" => {
                item.state = serde_json::from_value::<ItemState>(value)
                    .map_err(|e| DashboardError::InvalidField(format!("state: {e}")))?;
            }
            "stage_attempts" => {
                let attempts: HashMap<StageName, u32> = serde_json::from_value(value)
                    .map_err(|e| DashboardError::InvalidField(format!("stage_attempts: {e}")))?;
                item.stage_attempts.extend(attempts);
            }
            "artifacts" => {
                let artifacts: HashMap<ArtifactKind, ArtifactRef> = serde_json::from_value(value)
                    .map_err(|e| DashboardError::InvalidField(format!("artifacts: {e}")))?;
                item.artifacts.extend(artifacts);
            }
            other => return Err(DashboardError::InvalidField(format!("unknown field: {other}"))),
        }
    }
    item.updated_at = chrono::Utc::now();
    Ok(())
}
