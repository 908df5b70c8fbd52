//! Persisted session snapshots
//!
//! The capture session is written to a key/value store after every mutation
//! so a reload of the page (or a restart of the host) picks up where the user
//! left off, as long as the snapshot is fresh.

use crate::error::{HunterError, Result};
use crate::hunter::CapturedElement;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use url::{Origin, Url};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub is_active: bool,
    pub elements: Vec<CapturedElement>,
    pub element_counter: u32,
    pub capture_and_click: bool,
    /// Page origin, scheme and host only
    pub url: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl PersistedSnapshot {
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Whether the snapshot is younger than `ttl` at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.timestamp_millis() - self.timestamp < ttl.num_milliseconds()
    }
}

/// `scheme://host[:port]` part of a URL
///
/// Credentials, path, query and fragment are dropped. URLs without a tuple
/// origin (`about:blank`, `data:`) are returned unchanged.
pub fn origin_of(page_url: &str) -> String {
    match Url::parse(page_url) {
        Ok(parsed) => match parsed.origin() {
            origin @ Origin::Tuple(..) => origin.ascii_serialization(),
            Origin::Opaque(_) => page_url.to_string(),
        },
        Err(_) => page_url.to_string(),
    }
}

/// Key/value store for session snapshots
pub trait SnapshotStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<PersistedSnapshot>>;

    fn save(&self, key: &str, snapshot: &PersistedSnapshot) -> Result<()>;
}

/// In-process store; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| HunterError::Storage("memory store lock poisoned".to_string()))
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<PersistedSnapshot>> {
        match self.lock()?.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, snapshot: &PersistedSnapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.lock()?.insert(key.to_string(), raw);
        Ok(())
    }
}

/// Store backed by one JSON object on disk, one entry per key
///
/// Inside a tokio runtime `save` hands the write to the blocking pool and
/// returns at once; `flush` waits for writes still in flight. Outside a runtime
/// it writes synchronously. When writes race, the most recent `save` wins.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    writer: FileWriter,
    next_seq: Arc<AtomicU64>,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

#[derive(Debug, Clone)]
struct FileWriter {
    path: PathBuf,
    /// Sequence number of the last write per key
    written: Arc<Mutex<HashMap<String, u64>>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: FileWriter {
                path: path.into(),
                written: Arc::new(Mutex::new(HashMap::new())),
            },
            next_seq: Arc::new(AtomicU64::new(1)),
            in_flight: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// `<data dir>/element-hunter/snapshot.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("element-hunter").join("snapshot.json"))
    }

    pub fn path(&self) -> &Path {
        &self.writer.path
    }

    /// Wait until every write started so far has reached the disk
    pub async fn flush(&self) {
        let tasks: Vec<JoinHandle<()>> = match self.in_flight.lock() {
            Ok(mut in_flight) => in_flight.drain(..).collect(),
            Err(_) => return,
        };
        for task in tasks {
            if let Err(e) = task.await {
                log::warn!("⚠️  Snapshot write task failed: {}", e);
            }
        }
    }
}

fn read_map(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(serde_json::Map::new());
    }
    match serde_json::from_str(&raw)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(HunterError::Storage(format!(
            "{} does not contain a JSON object",
            path.display()
        ))),
    }
}

impl FileWriter {
    fn write_entry(&self, key: &str, value: serde_json::Value, seq: u64) -> Result<()> {
        let mut written = self
            .written
            .lock()
            .map_err(|_| HunterError::Storage("file store lock poisoned".to_string()))?;
        if written.get(key).is_some_and(|last| *last > seq) {
            log::debug!("Skipping superseded snapshot write for '{}'", key);
            return Ok(());
        }

        let mut all = match read_map(&self.path) {
            Ok(all) => all,
            Err(e) => {
                log::warn!(
                    "⚠️  Discarding unreadable snapshot file {}: {}",
                    self.path.display(),
                    e
                );
                serde_json::Map::new()
            }
        };
        all.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&all)?)?;
        std::fs::rename(&tmp, &self.path)?;
        written.insert(key.to_string(), seq);
        log::debug!("💾 Saved snapshot '{}' to {}", key, self.path.display());
        Ok(())
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<PersistedSnapshot>> {
        match read_map(&self.writer.path)?.remove(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, snapshot: &PersistedSnapshot) -> Result<()> {
        let value = serde_json::to_value(snapshot)?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return self.writer.write_entry(key, value, seq);
        };
        let writer = self.writer.clone();
        let key = key.to_string();
        let task = runtime.spawn_blocking(move || {
            if let Err(e) = writer.write_entry(&key, value, seq) {
                log::warn!("⚠️  Failed to write snapshot '{}': {}", key, e);
            }
        });

        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| HunterError::Storage("file store lock poisoned".to_string()))?;
        in_flight.retain(|t| !t.is_finished());
        in_flight.push(task);
        Ok(())
    }
}
