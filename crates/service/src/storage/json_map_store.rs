use std::{
    collections::HashMap,
    hash::Hash,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs,
    sync::{watch, Mutex},
};
use tracing::{debug, error, info, warn};

use crate::errors::ServiceError;

/// Full copy of the map taken at a given mutation version.
struct Snapshot<K, V> {
    version: u64,
    map: Arc<HashMap<K, V>>,
}

impl<K, V> Clone for Snapshot<K, V> {
    fn clone(&self) -> Self {
        Self { version: self.version, map: Arc::clone(&self.map) }
    }
}

struct Inner<K, V> {
    map: HashMap<K, V>,
    version: u64,
}

/// JSON file-backed key-value map store with asynchronous write-back.
///
/// The in-memory map is authoritative and guarded by one exclusive lock. Every
/// mutation bumps a version and captures a snapshot while still holding that
/// lock, then hands it to a single background writer. The writer only ever
/// persists the newest snapshot it has been given, so the last write to land
/// always reflects the last completed mutation. Callers never wait for disk.
pub struct JsonMapStore<K, V> {
    inner: Mutex<Inner<K, V>>,
    file_path: PathBuf,
    pending: watch::Sender<Snapshot<K, V>>,
    persisted: watch::Receiver<u64>,
}

impl<K, V> JsonMapStore<K, V>
where
    K: Eq + Hash + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open the store at `path` and start its writer task.
    ///
    /// A missing, unreadable or unparsable file yields an empty store; a corrupt
    /// file is copied aside to `<name>.corrupt` before it can be overwritten.
    /// Must be called from within a tokio runtime.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Arc<Self> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent).await {
                warn!(dir = %parent.display(), error = %e, "cannot create data directory");
            }
        }

        let map: HashMap<K, V> = load(&file_path).await;
        info!(path = %file_path.display(), entries = map.len(), "json map store opened");

        let (pending, snapshots) = watch::channel(Snapshot { version: 0, map: Arc::new(HashMap::new()) });
        let (done, persisted) = watch::channel(0u64);
        tokio::spawn(write_back_loop(file_path.clone(), snapshots, done));

        Arc::new(Self { inner: Mutex::new(Inner { map, version: 0 }), file_path, pending, persisted })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Get value by key.
    pub async fn get(&self, key: &K) -> Option<V> {
        let inner = self.inner.lock().await;
        inner.map.get(key).cloned()
    }

    /// All values, in no particular order.
    pub async fn values(&self) -> Vec<V> {
        let inner = self.inner.lock().await;
        inner.map.values().cloned().collect()
    }

    /// Copy of the whole map.
    pub async fn snapshot(&self) -> HashMap<K, V> {
        self.inner.lock().await.map.clone()
    }

    /// Insert or replace a value and schedule a write-back.
    pub async fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.lock().await;
        inner.map.insert(key, value);
        self.schedule_write(&mut inner);
    }

    /// Remove a key; returns whether it existed. Nothing is written when it did not.
    pub async fn remove(&self, key: &K) -> bool {
        let mut inner = self.inner.lock().await;
        let existed = inner.map.remove(key).is_some();
        if existed {
            self.schedule_write(&mut inner);
        }
        existed
    }

    /// Mutate the value under `key` in place and schedule a write-back.
    /// Returns the updated value, or `None` without writing if the key is absent.
    pub async fn update<F>(&self, key: &K, f: F) -> Option<V>
    where
        F: FnOnce(&mut V),
    {
        let mut inner = self.inner.lock().await;
        let updated = {
            let value = inner.map.get_mut(key)?;
            f(value);
            value.clone()
        };
        self.schedule_write(&mut inner);
        Some(updated)
    }

    /// Wait until every mutation made so far has been through a write-back attempt.
    pub async fn flush(&self) {
        let target = self.inner.lock().await.version;
        let mut persisted = self.persisted.clone();
        let settled = persisted.wait_for(|v| *v >= target).await.is_ok();
        if !settled {
            warn!(path = %self.file_path.display(), target, "write-back task stopped before flush completed");
        }
    }

    // Caller holds the map lock, so the snapshot cannot be torn or reordered.
    fn schedule_write(&self, inner: &mut Inner<K, V>) {
        inner.version += 1;
        self.pending.send_replace(Snapshot { version: inner.version, map: Arc::new(inner.map.clone()) });
    }
}

async fn load<K, V>(path: &Path) -> HashMap<K, V>
where
    K: Eq + Hash + DeserializeOwned,
    V: DeserializeOwned,
{
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no data file yet; starting empty");
            return HashMap::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read data file; starting empty");
            return HashMap::new();
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return HashMap::new();
    }

    match serde_json::from_slice(&bytes) {
        Ok(map) => map,
        Err(e) => {
            let backup = corrupt_backup_path(path);
            warn!(path = %path.display(), backup = %backup.display(), error = %e, "data file is not valid; starting empty");
            if let Err(e) = fs::copy(path, &backup).await {
                warn!(backup = %backup.display(), error = %e, "cannot keep a copy of the corrupt data file");
            }
            HashMap::new()
        }
    }
}

/// `requests.json` -> `requests.json.corrupt`
fn corrupt_backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".corrupt");
    path.with_file_name(name)
}

async fn write_back_loop<K, V>(
    path: PathBuf,
    mut snapshots: watch::Receiver<Snapshot<K, V>>,
    done: watch::Sender<u64>,
) where
    K: Eq + Hash + Serialize,
    V: Serialize,
{
    // Intermediate snapshots are skipped when mutations outpace the disk.
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        match persist(&path, &snapshot.map).await {
            Ok(bytes) => debug!(path = %path.display(), version = snapshot.version, bytes, "snapshot persisted"),
            Err(e) => error!(path = %path.display(), version = snapshot.version, error = %e, "write-back failed; in-memory state kept"),
        }
        done.send_replace(snapshot.version);
    }
    debug!(path = %path.display(), "write-back task finished");
}

async fn persist<K, V>(path: &Path, map: &HashMap<K, V>) -> Result<usize, ServiceError>
where
    K: Eq + Hash + Serialize,
    V: Serialize,
{
    let bytes = serde_json::to_vec_pretty(map).map_err(|e| ServiceError::Persistence(e.to_string()))?;
    save_bytes_atomic(path, &bytes)
        .await
        .map_err(|e| ServiceError::Persistence(format!("{}: {e}", path.display())))?;
    Ok(bytes.len())
}

async fn save_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    // the previous file stays in place until the rename succeeds
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
