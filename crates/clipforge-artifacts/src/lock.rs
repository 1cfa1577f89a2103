//! Per-item scoped acquisition (§4.B): a worker must hold both an in-process
//! lock (cheap, guards against two tasks in the same process racing on the
//! same item) and a real filesystem advisory lock (guards against a second
//! process, e.g. a crashed-and-restarted supervisor, racing the first). Both
//! are released together by `Drop` so a panicking holder can never leave the
//! item permanently locked.

use crate::error::ArtifactStoreError;
use dashmap::DashMap;
use fd_lock::RwLock as FdRwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex, OwnedMutexGuard};

pub struct ItemLocks {
    locks_dir: PathBuf,
    in_process: DashMap<String, Arc<Mutex<()>>>,
}

impl ItemLocks {
    pub fn new(locks_dir: PathBuf) -> Self {
        Self { locks_dir, in_process: DashMap::new() }
    }

    fn in_process_mutex(&self, item_id: &str) -> Arc<Mutex<()>> {
        self.in_process.entry(item_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Blocks (async) until both locks are held. `fd-lock`'s write guard
    /// borrows from the `FdRwLock` it came from, so it cannot be returned
    /// from the blocking thread that creates it without either borrowing
    /// past the thread's stack frame or fabricating a lifetime. Instead the
    /// blocking thread keeps the lock and its guard on its own stack for as
    /// long as the item is held: it reports back over `acquired_tx` once the
    /// write lock is taken, then parks on `release_rx` until
    /// `ItemLockGuard::drop` signals release, at which point the guard (and
    /// the underlying file lock) drop in that thread before it exits.
    pub async fn acquire(&self, item_id: &str) -> Result<ItemLockGuard, ArtifactStoreError> {
        let in_process = self.in_process_mutex(item_id).lock_owned().await;

        std::fs::create_dir_all(&self.locks_dir)?;
        let lock_path = self.locks_dir.join(format!("{item_id}.lock"));
        let item_id_owned = item_id.to_string();

        let (acquired_tx, acquired_rx) = oneshot::channel::<Result<(), ArtifactStoreError>>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        std::thread::Builder::new()
            .name(format!("item-lock-{item_id_owned}"))
            .spawn(move || {
                let file = match std::fs::OpenOptions::new().create(true).write(true).truncate(false).open(&lock_path)
                {
                    Ok(file) => file,
                    Err(err) => {
                        let _ = acquired_tx.send(Err(ArtifactStoreError::Io(err)));
                        return;
                    }
                };
                let mut fs_lock = FdRwLock::new(file);
                let guard = match fs_lock.write() {
                    Ok(guard) => guard,
                    Err(_) => {
                        let _ = acquired_tx.send(Err(ArtifactStoreError::LockFailed(item_id_owned)));
                        return;
                    }
                };
                if acquired_tx.send(Ok(())).is_err() {
                    // The caller gave up (e.g. the future was dropped) before
                    // we could report success; fall through and drop the
                    // guard immediately instead of waiting for a release
                    // signal that will never come.
                    return;
                }
                let _ = release_rx.blocking_recv();
                drop(guard);
            })
            .map_err(|_| ArtifactStoreError::LockFailed(item_id.to_string()))?;

        acquired_rx.await.map_err(|_| ArtifactStoreError::LockFailed(item_id.to_string()))??;

        Ok(ItemLockGuard { _in_process: in_process, release: Some(release_tx) })
    }
}

/// Held for the duration of a stage's commit sequence. Dropping it signals
/// the dedicated OS thread parked in `ItemLocks::acquire` to drop the
/// `fd-lock` write guard, releasing the filesystem lock.
pub struct ItemLockGuard {
    _in_process: OwnedMutexGuard<()>,
    release: Option<oneshot::Sender<()>>,
}

impl Drop for ItemLockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
        }
    }
}

pub fn item_dir(root: &Path, item_id: &str) -> PathBuf {
    root.join(item_id)
}
