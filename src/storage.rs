//! Key-value persistence backends.
//!
//! The template store keeps its whole data set under a single key. Two
//! backends are provided: [`JsonFileStore`] writes one `<key>.json` file per
//! key, and [`MemoryStore`] keeps values in memory (with write-failure
//! injection for tests).

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{Result, StoreError};

/// Asynchronous key-value persistence.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` when absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>>> + Send;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<()>> + Send;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Keys become file names, so only a conservative character set is allowed.
fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::Storage(format!("invalid storage key: {key:?}")))
    }
}

// ---------------------------------------------------------------------------
// JSON file backend
// ---------------------------------------------------------------------------

/// Stores each key as pretty-printed JSON in `<dir>/<key>.json`.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        check_key(key)?;
        let path = self.path_for(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Storage(format!("Corrupt data in {}: {e}", path.display())))
    }

    /// Atomic write: temp file + rename, so a crash leaves either the old or
    /// the new file, never a partial one.
    async fn set(&self, key: &str, value: Value) -> Result<()> {
        check_key(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to create data directory: {e}")))?;

        let json = serde_json::to_string_pretty(&value)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize data: {e}")))?;

        let target = self.path_for(key);
        let temp = self.dir.join(format!("{key}.json.tmp.{}", std::process::id()));

        tokio::fs::write(&temp, &json)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write temp file: {e}")))?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&temp, perms)
                .await
                .map_err(|e| StoreError::Storage(format!("Failed to set permissions: {e}")))?;
        }

        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StoreError::Storage(format!("Failed to commit {}: {e}", target.display())));
        }

        tracing::debug!(path = %target.display(), bytes = json.len(), "persisted");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(format!("Failed to remove {key}: {e}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// In-memory backend. Counts writes and can be told to fail them.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`remove` fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Seed a value without counting it as a write.
    pub fn insert_raw(&self, key: &str, value: Value) {
        self.values.lock().insert(key.to_string(), value);
    }

    pub fn snapshot(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Storage("QUOTA_BYTES quota exceeded".to_string()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.check_writable()?;
        self.values.lock().insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.values.lock().remove(key);
        Ok(())
    }
}
