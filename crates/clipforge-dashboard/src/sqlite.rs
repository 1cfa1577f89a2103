//! `SqliteDashboard` (§4.C): the default durable row store realized as a
//! single embedded sqlite file (`state/items.db`, §6) rather than a
//! vendor-specific spreadsheet API. Reads are served from an in-memory
//! mirror populated at startup and kept current on every write, a
//! cache-plus-pool shape so reads never block on disk I/O while writes stay
//! durable.

use async_trait::async_trait;
use clipforge_domain::{Item, ItemId, ItemState};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::adapter::{apply_fields, DashboardAdapter, ItemFilter, NewItem};
use crate::error::DashboardError;

pub struct SqliteDashboard {
    pool: SqlitePool,
    cache: Arc<RwLock<HashMap<ItemId, Item>>>,
}

impl SqliteDashboard {
    pub async fn connect(path: &Path) -> Result<Self, DashboardError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DashboardError::Storage(e.to_string()))?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(|e| DashboardError::Storage(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(8).connect_with(opts).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS items (
                item_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                payload TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        let dashboard = Self { pool, cache: Arc::new(RwLock::new(HashMap::new())) };
        dashboard.warm_cache().await?;
        Ok(dashboard)
    }

    async fn warm_cache(&self) -> Result<(), DashboardError> {
        let rows = sqlx::query("SELECT payload FROM items").fetch_all(&self.pool).await?;
        let mut cache = self.cache.write().expect("dashboard cache lock poisoned");
        for row in rows {
            let payload: String = row.try_get("payload")?;
            let item: Item = serde_json::from_str(&payload).map_err(|e| DashboardError::Storage(e.to_string()))?;
            cache.insert(item.item_id.clone(), item);
        }
        Ok(())
    }

    /// Inserts a brand-new row. Used only by `append_item`, where `item_id` is
    /// freshly minted and cannot already exist.
    async fn persist_new(&self, item: &Item) -> Result<(), DashboardError> {
        let payload = serde_json::to_string(item).map_err(|e| DashboardError::Storage(e.to_string()))?;
        let state_label = format!("{:?}", item.state);
        sqlx::query(
            "INSERT INTO items (item_id, state, updated_at, payload) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(item_id) DO UPDATE SET state = ?2, updated_at = ?3, payload = ?4",
        )
        .bind(item.item_id.as_str())
        .bind(state_label)
        .bind(item.updated_at.to_rfc3339())
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persists `item` only if the row's current `state` column still matches
    /// `expected_state_label` (§4.C's atomic `UPDATE ... WHERE item_id = ? AND
    /// state = ?`). Returns `true` if the row was updated, `false` if no row
    /// matched (concurrent writer already moved it, or it vanished) — the
    /// caller treats `false` as `DashboardError::Stale`, never as
    /// "nothing to do".
    async fn persist_if_state(&self, item: &Item, expected_state_label: &str) -> Result<bool, DashboardError> {
        let payload = serde_json::to_string(item).map_err(|e| DashboardError::Storage(e.to_string()))?;
        let state_label = format!("{:?}", item.state);
        let result = sqlx::query(
            "UPDATE items SET state = ?1, updated_at = ?2, payload = ?3
             WHERE item_id = ?4 AND state = ?5",
        )
        .bind(state_label)
        .bind(item.updated_at.to_rfc3339())
        .bind(payload)
        .bind(item.item_id.as_str())
        .bind(expected_state_label)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DashboardAdapter for SqliteDashboard {
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, DashboardError> {
        let cache = self.cache.read().expect("dashboard cache lock poisoned");
        Ok(cache.values().filter(|item| filter.matches(item)).cloned().collect())
    }

    async fn append_item(&self, draft: NewItem) -> Result<Item, DashboardError> {
        let seq = {
            let cache = self.cache.read().expect("dashboard cache lock poisoned");
            cache.len() as u64 + 1
        };
        let item_id = ItemId::new(format!("item-{seq:06}"));
        let item = Item::new(item_id.clone(), draft.source, draft.concept_text);
        self.persist_new(&item).await?;
        self.cache.write().expect("dashboard cache lock poisoned").insert(item_id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, item_id: &ItemId) -> Result<Item, DashboardError> {
        self.cache
            .read()
            .expect("dashboard cache lock poisoned")
            .get(item_id)
            .cloned()
            .ok_or_else(|| DashboardError::NotFound(item_id.to_string()))
    }

    /// Optimistic-concurrency update (§4.C): the persisted `UPDATE ... WHERE
    /// item_id = ? AND state = ?` in `persist_if_state` is the actual
    /// atomicity boundary, not the in-memory check below it — that check is
    /// only a fast local pre-filter so an obviously-stale caller doesn't pay
    /// for a round trip to the pool. Two callers racing on the same item with
    /// the same `expected_state` both pass the pre-filter, but only the one
    /// whose `UPDATE` actually executes first against the still-matching row
    /// affects any rows; the other's `WHERE` clause no longer matches and
    /// `persist_if_state` reports `false`, which this function turns into
    /// `DashboardError::Stale` without ever touching the cache for the loser.
    async fn update_fields(
        &self,
        item_id: &ItemId,
        fields: HashMap<String, Value>,
        expected_state: &ItemState,
    ) -> Result<Item, DashboardError> {
        let mut item = {
            let cache = self.cache.read().expect("dashboard cache lock poisoned");
            cache.get(item_id).cloned().ok_or_else(|| DashboardError::NotFound(item_id.to_string()))?
        };
        if &item.state != expected_state {
            return Err(DashboardError::Stale { item_id: item_id.to_string(), expected: format!("{expected_state:?}") });
        }
        let expected_state_label = format!("{expected_state:?}");
        apply_fields(&mut item, fields)?;
        if !self.persist_if_state(&item, &expected_state_label).await? {
            return Err(DashboardError::Stale { item_id: item_id.to_string(), expected: expected_state_label });
        }
        self.cache.write().expect("dashboard cache lock poisoned").insert(item_id.clone(), item.clone());
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_domain::Source;

    #[tokio::test]
    async fn append_persists_and_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("items.db");
        let dashboard = SqliteDashboard::connect(&db_path).await.unwrap();
        let item = dashboard
            .append_item(NewItem { source: Source::AiIdeation, concept_text: "a cat video".into() })
            .await
            .unwrap();
        drop(dashboard);

        let reopened = SqliteDashboard::connect(&db_path).await.unwrap();
        let fetched = reopened.get_item(&item.item_id).await.unwrap();
        assert_eq!(fetched.concept_text, "a cat video");
    }

    #[tokio::test]
    async fn update_fields_rejects_stale_expected_state() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = SqliteDashboard::connect(&dir.path().join("items.db")).await.unwrap();
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
    async fn persist_if_state_rejects_a_write_whose_row_already_moved() {
        // Simulates two racing writers that both read the row as `Approved`
        // before either persists: the first's `UPDATE ... WHERE state = ?`
        // succeeds and moves the row to `Scripting`; the second's identical
        // guard no longer matches, so it must be rejected rather than
        // silently clobbering the first writer's row.
        let dir = tempfile::tempdir().unwrap();
        let dashboard = SqliteDashboard::connect(&dir.path().join("items.db")).await.unwrap();
        let item = dashboard
            .append_item(NewItem { source: Source::AiIdeation, concept_text: "a cat video".into() })
            .await
            .unwrap();
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), serde_json::to_value(ItemState::Approved).unwrap());
        let approved = dashboard.update_fields(&item.item_id, fields, &ItemState::PendingApproval).await.unwrap();

        let mut first = approved.clone();
        first.state = ItemState::Scripting;
        let first_ok = dashboard.persist_if_state(&first, "Approved").await.unwrap();
        assert!(first_ok);

        let mut second = approved.clone();
        second.state = ItemState::Scripting;
        let second_ok = dashboard.persist_if_state(&second, "Approved").await.unwrap();
        assert!(!second_ok);
    }
}
