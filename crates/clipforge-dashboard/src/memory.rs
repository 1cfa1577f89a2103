//! `InMemoryDashboard` (§4.C): used for tests and as the template the
//! sqlite-backed cache mirrors.

use async_trait::async_trait;
use clipforge_domain::{Item, ItemId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::adapter::{apply_fields, DashboardAdapter, ItemFilter, NewItem};
use crate::error::DashboardError;

pub struct InMemoryDashboard {
    items: Arc<RwLock<HashMap<ItemId, Item>>>,
    next_id: AtomicU64,
}

impl InMemoryDashboard {
    pub fn new() -> Self {
        Self { items: Arc::new(RwLock::new(HashMap::new())), next_id: AtomicU64::new(1) }
    }
}

impl Default for InMemoryDashboard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DashboardAdapter for InMemoryDashboard {
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, DashboardError> {
        let items = self.items.read().expect("dashboard lock poisoned");
        Ok(items.values().filter(|item| filter.matches(item)).cloned().collect())
    }

    async fn append_item(&self, draft: NewItem) -> Result<Item, DashboardError> {
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst);
        let item_id = ItemId::new(format!("item-{seq:06}"));
        let item = Item::new(item_id.clone(), draft.source, draft.concept_text);
        self.items.write().expect("dashboard lock poisoned").insert(item_id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, item_id: &ItemId) -> Result<Item, DashboardError> {
        self.items
            .read()
            .expect("dashboard lock poisoned")
            .get(item_id)
            .cloned()
            .ok_or_else(|| DashboardError::NotFound(item_id.to_string()))
    }

    async fn update_fields(
        &self,
        item_id: &ItemId,
        fields: HashMap<String, Value>,
        expected_state: &clipforge_domain::ItemState,
    ) -> Result<Item, DashboardError> {
        let mut items = self.items.write().expect("dashboard lock poisoned");
        let item = items.get_mut(item_id).ok_or_else(|| DashboardError::NotFound(item_id.to_string()))?;
        if &item.state != expected_state {
            return Err(DashboardError::Stale { item_id: item_id.to_string(), expected: format!("{expected_state:?}") });
        }
        apply_fields(item, fields)?;
        Ok(item.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_domain::{ItemState, Source};

    #[tokio::test]
    async fn append_then_get_round_trips() {
        let dashboard = InMemoryDashboard::new();
        let item = dashboard
            .append_item(NewItem { source: Source::AiIdeation, concept_text: "a cat video".into() })
            .await
            .unwrap();
        let fetched = dashboard.get_item(&item.item_id).await.unwrap();
        assert_eq!(fetched.item_id, item.item_id);
    }

    #[tokio::test]
    async fn update_fields_rejects_stale_expected_state() {
        let dashboard = InMemoryDashboard::new();
        let item = dashboard
            .append_item(NewItem { source: Source::AiIdeation, concept_text: "a cat video".into() })
            .await
            .unwrap();
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), serde_json::to_value(ItemState::Approved).unwrap());
        let err = dashboard.update_fields(&item.item_id, fields, &ItemState::Approved).await.unwrap_err();
        assert!(matches!(err, DashboardError::Stale { .. }));
    }

    #[tokio::test]
    async fn update_fields_applies_on_matching_expected_state() {
        let dashboard = InMemoryDashboard::new();
        let item = dashboard
            .append_item(NewItem { source: Source::AiIdeation, concept_text: "a cat video".into() })
            .await
            .unwrap();
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), serde_json::to_value(ItemState::Approved).unwrap());
        let updated = dashboard.update_fields(&item.item_id, fields, &ItemState::PendingApproval).await.unwrap();
        assert_eq!(updated.state, ItemState::Approved);
    }
}
