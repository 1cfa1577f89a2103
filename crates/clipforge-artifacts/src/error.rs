use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    #[error("io error writing artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to acquire lock for item {0}")]
    LockFailed(String),
    #[error("artifact hash mismatch after rename for {path}: expected {expected}, found {found}")]
    HashMismatch { path: String, expected: String, found: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
