//! Key/value storage backends.
//!
//! The backend is the raw string map behind every storage context. Writes
//! are persisted immediately.

use super::StorageError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Raw key/value storage.
///
/// Calls are synchronous: the navigation gate reads session presence
/// in-line, without awaiting.
pub trait StorageBackend: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key` and returns whether it was present.
    ///
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-memory backend. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.lock().remove(key).is_some())
    }
}

/// File-backed storage.
///
/// The whole map is one JSON object:
///
/// ```text
/// ~/.trust/storage.json
/// {
///   "read-notification-ids": "[\"incident-4\"]",
///   "trust.currentUser": "{\"email\":\"ana@example.com\"}"
/// }
/// ```
///
/// # Features
///
/// - Missing file means empty storage
/// - Atomic writes (write to temp, then rename)
/// - Automatic directory creation
/// - Writes by other processes are picked up on the next access
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    state: Mutex<FileState>,
}

#[derive(Debug)]
struct FileState {
    entries: BTreeMap<String, String>,
    /// Modification time of the file the entries were read from.
    modified: Option<SystemTime>,
}

impl FileBackend {
    /// Opens the storage file at `path`, expanding a leading `~/`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Io`] if the file exists but cannot be read
    /// - [`StorageError::Corrupt`] if it is not a JSON object of strings
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = expand_tilde(path.as_ref());
        let modified = modified_time(&path);
        let entries = read_entries(&path)?;

        tracing::debug!(path = %path.display(), keys = entries.len(), "opened storage file");

        Ok(Self {
            path,
            state: Mutex::new(FileState { entries, modified }),
        })
    }

    /// Returns the storage file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a temporary file path for atomic writes.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("storage.json");
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    /// Reloads the entries if another writer replaced the file.
    ///
    /// A file that became unreadable keeps the cached entries.
    fn refresh(&self, state: &mut FileState) {
        let modified = modified_time(&self.path);
        if modified == state.modified {
            return;
        }
        match read_entries(&self.path) {
            Ok(entries) => {
                tracing::debug!(path = %self.path.display(), "storage file changed on disk");
                state.entries = entries;
                state.modified = modified;
            }
            Err(e) => tracing::debug!(error = %e, "keeping cached storage entries"),
        }
    }

    /// Writes the entries to disk. Called with the lock held so writes are ordered.
    fn persist(&self, state: &mut FileState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::directory_creation(parent, e))?;
            }
        }

        let json = serde_json::to_string_pretty(&state.entries)?;
        let temp_path = self.temp_path();

        std::fs::write(&temp_path, json).map_err(|e| StorageError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| StorageError::io(&self.path, e))?;

        state.modified = modified_time(&self.path);
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut state = self.state.lock();
        self.refresh(&mut state);
        Ok(state.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        self.refresh(&mut state);
        let previous = state.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&mut state) {
            match previous {
                Some(old) => state.entries.insert(key.to_string(), old),
                None => state.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut state = self.state.lock();
        self.refresh(&mut state);
        let Some(previous) = state.entries.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&mut state) {
            state.entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Reads the storage map. A missing or empty file is an empty map.
fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&content).map_err(|e| StorageError::corrupt(path, e))
}

/// Expands `~` to the user's home directory.
pub(crate) fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(rest) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    path.to_path_buf()
}

/// Returns the default storage file path.
#[must_use]
pub fn default_storage_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".trust")
        .join("storage.json")
}
