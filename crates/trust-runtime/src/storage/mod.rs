//! Persistent client storage shared by several browsing contexts.
//!
//! # Architecture
//!
//! ```text
//!                   SharedStorage (one installation)
//!                   ┌──────────────────────────────┐
//!                   │ Box<dyn StorageBackend>      │
//!                   │ broadcast<StorageChange>     │───────────┐
//!                   └──────────────────────────────┘           │
//!                      ▲                     ▲                 │
//!           set/remove │                     │ set/remove      │ all changes
//!                      │                     │                 ▼
//!          ┌───────────┴──────┐   ┌──────────┴───────┐   filtered by origin
//!          │ StorageContext A │   │ StorageContext B │
//!          │ event bus (own)  │   │ event bus (own)  │
//!          └──────────────────┘   └──────────────────┘
//! ```
//!
//! # Notification Rules
//!
//! | Source of change | Seen by same context | Seen by other contexts |
//! |------------------|---------------------|------------------------|
//! | `set_item` / `remove_item` | no | [`ContextSignal::Storage`] |
//! | `dispatch(name)` | [`ContextSignal::Event`] | no |
//!
//! A subscriber that falls behind receives [`ContextSignal::Resync`] and must
//! re-read whatever it derives from storage.

mod backend;
mod error;

pub use backend::{default_storage_path, FileBackend, MemoryBackend, StorageBackend};
pub(crate) use backend::expand_tilde;
pub use error::StorageError;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Buffered notifications per subscriber before it is considered lagged.
const CHANNEL_CAPACITY: usize = 64;

/// Identifies one browsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A storage mutation, broadcast to every context of the installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    /// The context that made the change.
    pub origin: ContextId,
}

/// Notification delivered to a [`ContextSubscription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSignal {
    /// Another context changed `key`.
    Storage { key: String },
    /// A same-context event was dispatched.
    Event(String),
    /// Notifications were dropped; re-read storage.
    Resync,
}

struct Installation {
    backend: Box<dyn StorageBackend>,
    changes: broadcast::Sender<StorageChange>,
}

/// One storage installation, shared by all its contexts.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<Installation>,
}

impl SharedStorage {
    /// Wraps a backend.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Installation {
                backend: Box::new(backend),
                changes,
            }),
        }
    }

    /// In-memory installation.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// File-backed installation.
    ///
    /// # Errors
    ///
    /// See [`FileBackend::open`].
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Self::new(FileBackend::open(path)?))
    }

    /// Opens a new browsing context.
    #[must_use]
    pub fn context(&self) -> StorageContext {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        let context = StorageContext {
            id: ContextId::new(),
            installation: Arc::clone(&self.inner),
            events,
        };
        tracing::debug!(context = %context.id, "opened storage context");
        context
    }
}

impl fmt::Debug for SharedStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStorage")
            .field("subscribers", &self.inner.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

/// One browsing context over a [`SharedStorage`].
///
/// Clones refer to the same context (same id, same event bus).
#[derive(Clone)]
pub struct StorageContext {
    id: ContextId,
    installation: Arc<Installation>,
    events: broadcast::Sender<String>,
}

impl StorageContext {
    /// Returns this context's id.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Returns the raw value under `key`.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.installation.backend.get(key)
    }

    /// Stores `value` under `key` and notifies other contexts.
    ///
    /// # Errors
    ///
    /// Propagates backend errors; nothing is broadcast on failure.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.installation.backend.set(key, value)?;
        self.broadcast_change(key);
        Ok(())
    }

    /// Removes `key` and notifies other contexts if it was present.
    ///
    /// # Errors
    ///
    /// Propagates backend errors; nothing is broadcast on failure.
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if self.installation.backend.remove(key)? {
            self.broadcast_change(key);
        }
        Ok(())
    }

    /// Emits a same-context event.
    pub fn dispatch(&self, name: &str) {
        // No receivers is fine: nobody in this context is listening.
        let _ = self.events.send(name.to_string());
    }

    /// Subscribes to storage changes from other contexts and to this
    /// context's events.
    #[must_use]
    pub fn subscribe(&self) -> ContextSubscription {
        ContextSubscription {
            id: self.id,
            changes: self.installation.changes.subscribe(),
            events: self.events.subscribe(),
        }
    }

    fn broadcast_change(&self, key: &str) {
        let change = StorageChange {
            key: key.to_string(),
            origin: self.id,
        };
        let _ = self.installation.changes.send(change);
    }
}

impl fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Receiver side of [`StorageContext::subscribe`].
pub struct ContextSubscription {
    id: ContextId,
    changes: broadcast::Receiver<StorageChange>,
    events: broadcast::Receiver<String>,
}

impl ContextSubscription {
    /// Waits for the next signal.
    ///
    /// Returns `None` once the context or the installation is gone.
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<ContextSignal> {
        loop {
            tokio::select! {
                change = self.changes.recv() => match change {
                    Ok(change) if change.origin == self.id => continue,
                    Ok(change) => return Some(ContextSignal::Storage { key: change.key }),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(context = %self.id, skipped = n, "storage changes lagged");
                        return Some(ContextSignal::Resync);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
                event = self.events.recv() => match event {
                    Ok(name) => return Some(ContextSignal::Event(name)),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(context = %self.id, skipped = n, "context events lagged");
                        return Some(ContextSignal::Resync);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }
}

impl fmt::Debug for ContextSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextSubscription")
            .field("context", &self.id)
            .finish_non_exhaustive()
    }
}
