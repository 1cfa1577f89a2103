//! The Atomic Artifact Store (§4.B): a rooted tree of content-addressed
//! artifact files, written with the rename-into-place discipline so that no
//! partially-written file ever appears under its final name.
//!
//! Layout: `<root>/<kind>/<item_id>/<timestamp>-<hash-prefix>.<ext>`.

use crate::error::ArtifactStoreError;
use crate::lock::{ItemLockGuard, ItemLocks};
use chrono::Utc;
use clipforge_domain::{ArtifactKind, ArtifactRef, ItemId, StageName};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub struct ArtifactStore {
    root: PathBuf,
    locks: ItemLocks,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let locks = ItemLocks::new(root.join("state").join("locks"));
        Self { root, locks }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Acquires the per-item advisory lock covering the whole commit
    /// sequence (§3 invariant 5, §4.B). Every stage execution, GC pass, and
    /// directory scan must hold this for its duration.
    pub async fn lock_item(&self, item_id: &ItemId) -> Result<ItemLockGuard, ArtifactStoreError> {
        self.locks.acquire(item_id.as_str()).await
    }

    fn dir_for(&self, kind: ArtifactKind, item_id: &ItemId) -> PathBuf {
        self.root.join(kind.as_str()).join(item_id.as_str())
    }

    /// Begins a scoped write: creates the destination directory and returns a
    /// guard exposing a temp-file path in the same directory. The caller
    /// writes to `guard.temp_path()` and must call `guard.finalize(...)` to
    /// commit, or simply drop the guard to discard the partial write.
    pub async fn begin_write(
        &self,
        kind: ArtifactKind,
        item_id: &ItemId,
    ) -> Result<ArtifactWriteGuard, ArtifactStoreError> {
        let dir = self.dir_for(kind, item_id);
        tokio::fs::create_dir_all(&dir).await?;
        let nonce = uuid::Uuid::new_v4();
        let temp_path = dir.join(format!(".tmp-{nonce}"));
        Ok(ArtifactWriteGuard { dir, temp_path, finalized: false, kind, producing_stage: None })
    }

    /// Convenience wrapper around `begin_write` for adapters that already
    /// hold the full byte buffer in memory (the common case for scripts,
    /// metadata JSON, and small downloads already buffered by the caller).
    pub async fn write_bytes(
        &self,
        kind: ArtifactKind,
        item_id: &ItemId,
        stage: StageName,
        bytes: &[u8],
    ) -> Result<ArtifactRef, ArtifactStoreError> {
        let mut guard = self.begin_write(kind, item_id).await?;
        {
            let mut f = tokio::fs::File::create(guard.temp_path()).await?;
            f.write_all(bytes).await?;
            f.sync_all().await?;
        }
        guard.finalize(stage).await
    }

    /// Locked directory scan (§4.B "locked directory scans"): enumerates
    /// finalized artifact files for `item_id` under `kind` while holding the
    /// per-item lock, so it cannot race a concurrent finalize.
    pub async fn list_finalized(
        &self,
        kind: ArtifactKind,
        item_id: &ItemId,
        _guard: &ItemLockGuard,
    ) -> Result<Vec<PathBuf>, ArtifactStoreError> {
        let dir = self.dir_for(kind, item_id);
        let mut out = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(".tmp-") {
                out.push(entry.path());
            }
        }
        out.sort();
        Ok(out)
    }

    /// Atomic existence-and-action check (§4.B, §9): verifies that an
    /// artifact reference is still backed by a real file with the recorded
    /// size and hash, while holding the per-item lock. Callers must never do
    /// a naked `Path::exists()` followed by a separate operation.
    pub async fn verify_reference(
        &self,
        item_id: &ItemId,
        artifact_ref: &ArtifactRef,
        _guard: &ItemLockGuard,
    ) -> Result<bool, ArtifactStoreError> {
        let _ = item_id;
        let path = Path::new(&artifact_ref.path);
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if metadata.len() != artifact_ref.size {
            return Ok(false);
        }
        let bytes = tokio::fs::read(path).await?;
        let hash = hex_sha256(&bytes);
        Ok(hash == artifact_ref.sha256)
    }

    /// Garbage collection (§4.B): removes the artifact directory tree for
    /// `item_id` under every kind. Callers must hold the per-item lock for
    /// the duration, guarding against a concurrent `reset`.
    pub async fn remove_item_artifacts(
        &self,
        item_id: &ItemId,
        _guard: &ItemLockGuard,
    ) -> Result<(), ArtifactStoreError> {
        for kind in [
            ArtifactKind::Script,
            ArtifactKind::Narration,
            ArtifactKind::StockClip,
            ArtifactKind::AssembledVideo,
            ArtifactKind::CaptionedVideo,
            ArtifactKind::MetadataJson,
        ] {
            let dir = self.dir_for(kind, item_id);
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Scoped acquisition of a single artifact write (§4.B). `Drop` without a
/// prior `finalize()` removes the temp file: a panicking stage, an early
/// return, or a cancelled future can never leave a stray temp file under a
/// final-looking name, since the final name is only ever produced by
/// `finalize`'s rename.
pub struct ArtifactWriteGuard {
    dir: PathBuf,
    temp_path: PathBuf,
    finalized: bool,
    kind: ArtifactKind,
    producing_stage: Option<StageName>,
}

impl ArtifactWriteGuard {
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Writes `content` to the temp path, fsyncs, computes its hash, and
    /// atomically renames into place (§4.B steps 1-3). On a rename collision
    /// (another writer finished first, e.g. a duplicate stage re-run) the
    /// loser deletes its own temp file and re-reads the winner; the hashes
    /// must agree or this is a bug in the idempotency contract upstream.
    pub async fn finalize(mut self, producing_stage: StageName) -> Result<ArtifactRef, ArtifactStoreError> {
        self.producing_stage = Some(producing_stage);
        let bytes = tokio::fs::read(&self.temp_path).await?;
        let hash = hex_sha256(&bytes);
        let size = bytes.len() as u64;
        let ts = Utc::now().format("%Y%m%dT%H%M%S%.fZ");
        let hash_prefix = &hash[..16.min(hash.len())];
        let final_path = self.dir.join(format!("{ts}-{hash_prefix}.{}", self.kind.extension()));

        match tokio::fs::rename(&self.temp_path, &final_path).await {
            Ok(()) => {}
            Err(_) if tokio::fs::try_exists(&final_path).await.unwrap_or(false) => {
                // Someone else won the race to this exact name (same content
                // hash, same timestamp bucket): verify instead of trusting.
                let existing = tokio::fs::read(&final_path).await?;
                let existing_hash = hex_sha256(&existing);
                let _ = tokio::fs::remove_file(&self.temp_path).await;
                if existing_hash != hash {
                    return Err(ArtifactStoreError::HashMismatch {
                        path: final_path.display().to_string(),
                        expected: hash,
                        found: existing_hash,
                    });
                }
            }
            Err(e) => return Err(e.into()),
        }

        self.finalized = true;
        Ok(ArtifactRef {
            path: final_path.display().to_string(),
            size,
            sha256: hash,
            producing_stage,
            created_at: Utc::now(),
        })
    }
}

impl Drop for ArtifactWriteGuard {
    fn drop(&mut self) {
        if !self.finalized {
            let path = self.temp_path.clone();
            // Best-effort synchronous cleanup; Drop cannot be async. A stray
            // temp file left by a hard process kill is swept by the next GC
            // pass's directory listing (it is filtered out by the
            // `.tmp-` prefix check in `list_finalized`, so it never corrupts
            // a scan even if this cleanup races with something).
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_id() -> ItemId {
        ItemId::new("item-1")
    }

    #[tokio::test]
    async fn write_bytes_finalizes_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let item_id = item_id();
        let artifact = store
            .write_bytes(ArtifactKind::Script, &item_id, StageName::Scripting, b"hello script")
            .await
            .unwrap();
        assert!(Path::new(&artifact.path).exists());
        let guard = store.lock_item(&item_id).await.unwrap();
        assert!(store.verify_reference(&item_id, &artifact, &guard).await.unwrap());
    }

    #[tokio::test]
    async fn dropped_guard_without_finalize_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let item_id = item_id();
        {
            let guard = store.begin_write(ArtifactKind::Script, &item_id).await.unwrap();
            tokio::fs::write(guard.temp_path(), b"partial").await.unwrap();
            // guard dropped here without finalize()
        }
        let guard = store.lock_item(&item_id).await.unwrap();
        let files = store.list_finalized(ArtifactKind::Script, &item_id, &guard).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn verify_reference_detects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let item_id = item_id();
        let artifact = store
            .write_bytes(ArtifactKind::MetadataJson, &item_id, StageName::MetadataSynthesis, b"{}")
            .await
            .unwrap();
        tokio::fs::remove_file(&artifact.path).await.unwrap();
        let guard = store.lock_item(&item_id).await.unwrap();
        assert!(!store.verify_reference(&item_id, &artifact, &guard).await.unwrap());
    }

    #[tokio::test]
    async fn remove_item_artifacts_clears_all_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let item_id = item_id();
        store
            .write_bytes(ArtifactKind::Script, &item_id, StageName::Scripting, b"script")
            .await
            .unwrap();
        let guard = store.lock_item(&item_id).await.unwrap();
        store.remove_item_artifacts(&item_id, &guard).await.unwrap();
        let files = store.list_finalized(ArtifactKind::Script, &item_id, &guard).await.unwrap();
        assert!(files.is_empty());
    }
}
