//! The Atomic Artifact Store (§4.B): rename-into-place writes, per-item
//! advisory locks (both in-process and real filesystem locks), locked
//! directory scans, and an atomic existence-and-action primitive so callers
//! never need a naked `exists()`-then-act pattern.

pub mod error;
pub mod lock;
pub mod store;

pub use error::ArtifactStoreError;
pub use lock::{ItemLockGuard, ItemLocks};
pub use store::{ArtifactStore, ArtifactWriteGuard};
