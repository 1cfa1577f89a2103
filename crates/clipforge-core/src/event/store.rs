//! Append-only event storage keyed by `ItemId` (§4.D implementation
//! contract). `append_kind` assigns `seq`/`ts` and returns the persisted
//! event; `list` replays a single item's history in ascending `seq` order.
//! This is the source of truth reconciliation reads at startup; the local
//! state file and dashboard row are projections derived from it.

use chrono::Utc;
use clipforge_domain::ItemId;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{ItemEvent, ItemEventKind};

pub trait EventStore: Send + Sync {
    fn append_kind(&mut self, item_id: ItemId, kind: ItemEventKind) -> ItemEvent;
    fn list(&self, item_id: &ItemId) -> Vec<ItemEvent>;
}

/// In-memory implementation: volatile, used for tests and as the engine's
/// default when no durable backend is wired in.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: HashMap<ItemId, Vec<ItemEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self { inner: HashMap::new() }
    }

    pub fn len_for(&self, item_id: &ItemId) -> usize {
        self.inner.get(item_id).map(|v| v.len()).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, item_id: ItemId, kind: ItemEventKind) -> ItemEvent {
        let vec = self.inner.entry(item_id.clone()).or_default();
        let seq = vec.len() as u64;
        let ev = ItemEvent { seq, item_id, kind, ts: Utc::now() };
        vec.push(ev.clone());
        ev
    }

    fn list(&self, item_id: &ItemId) -> Vec<ItemEvent> {
        self.inner.get(item_id).cloned().unwrap_or_default()
    }
}

/// Durable `EventStore` backed by one append-only JSON-lines file per item
/// under `<root>/events/<item_id>.jsonl` (§4.D, §6 persisted state layout).
/// The whole log for an item is small (one line per stage transition), so
/// `list` just re-reads and re-parses the file rather than maintaining a
/// separate index; every item the process has ever touched is lazily loaded
/// into an in-memory mirror on first append/list so repeated calls within a
/// run don't re-read from disk.
pub struct FileEventStore {
    root: PathBuf,
    mirror: HashMap<ItemId, Vec<ItemEvent>>,
}

impl FileEventStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), mirror: HashMap::new() }
    }

    fn path_for(&self, item_id: &ItemId) -> PathBuf {
        self.root.join(format!("{}.jsonl", item_id.as_str()))
    }

    fn load(&self, item_id: &ItemId) -> Vec<ItemEvent> {
        let path = self.path_for(item_id);
        let Ok(contents) = std::fs::read_to_string(&path) else { return Vec::new() };
        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<ItemEvent>(line).ok())
            .collect()
    }

    fn ensure_loaded(&mut self, item_id: &ItemId) {
        if !self.mirror.contains_key(item_id) {
            let events = self.load(item_id);
            self.mirror.insert(item_id.clone(), events);
        }
    }

    /// Every item id with an on-disk event log, for startup reconciliation
    /// sweeps that need to walk every item the process has ever created.
    pub fn known_item_ids(&self) -> std::io::Result<Vec<ItemId>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(ItemId::new(stem));
                }
            }
        }
        Ok(ids)
    }
}

fn append_line(path: &Path, event: &ItemEvent) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(event).expect("ItemEvent always serializes");
    writeln!(file, "{line}")
}

impl EventStore for FileEventStore {
    fn append_kind(&mut self, item_id: ItemId, kind: ItemEventKind) -> ItemEvent {
        self.ensure_loaded(&item_id);
        let seq = self.mirror.get(&item_id).map(|v| v.len() as u64).unwrap_or(0);
        let ev = ItemEvent { seq, item_id: item_id.clone(), kind, ts: Utc::now() };
        let path = self.path_for(&item_id);
        if let Err(err) = append_line(&path, &ev) {
            tracing::error!(?err, item_id = %item_id, "failed to persist event to disk");
        }
        self.mirror.entry(item_id).or_default().push(ev.clone());
        ev
    }

    fn list(&self, item_id: &ItemId) -> Vec<ItemEvent> {
        match self.mirror.get(item_id) {
            Some(events) => events.clone(),
            None => self.load(item_id),
        }
    }
}
