//! Errors surfaced by the Dashboard Adapter (§4.C).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("stale write: item {item_id} expected state {expected:?} but row has moved on")]
    Stale { item_id: String, expected: String },
    #[error("invalid field value: {0}")]
    InvalidField(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for DashboardError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DashboardError::NotFound("row not found".into()),
            other => DashboardError::Storage(other.to_string()),
        }
    }
}
