//! Session store: who is logged in on this installation.
//!
//! The identity lives under one storage key as a JSON object with at least
//! an `email`. Every read and write of that key goes through
//! [`SessionStore`].
//!
//! # Change Notification
//!
//! | Writer | How readers learn about it |
//! |--------|---------------------------|
//! | Same context | [`SESSION_EVENT`] dispatched after the write |
//! | Other context | Storage change on [`SESSION_KEY`] |
//!
//! [`SessionWatcher`] folds both into a single `changed().await`.

use crate::storage::{ContextSignal, ContextSubscription, StorageContext, StorageError};
use serde_json::Value;
use thiserror::Error;
use trust_types::SessionIdentity;

/// Storage key holding the session identity.
pub const SESSION_KEY: &str = "trust.currentUser";

/// Same-context event dispatched after every session mutation.
pub const SESSION_EVENT: &str = "trust:session-user-updated";

/// Session store errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend refused the write.
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The identity could not be serialized.
    #[error("failed to serialize session identity: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An identity without an email cannot be stored.
    #[error("session identity has no email")]
    MissingEmail,
}

/// Reads and writes the session identity of one context.
#[derive(Debug, Clone)]
pub struct SessionStore {
    context: StorageContext,
}

impl SessionStore {
    #[must_use]
    pub fn new(context: StorageContext) -> Self {
        Self { context }
    }

    /// Returns the underlying storage context.
    #[must_use]
    pub fn context(&self) -> &StorageContext {
        &self.context
    }

    /// Returns the stored identity, or `None` if absent or malformed.
    #[must_use]
    pub fn identity(&self) -> Option<SessionIdentity> {
        let raw = match self.context.get_item(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(error = %e, "session read failed");
                return None;
            }
        };
        let parsed = parse_identity(&raw);
        if parsed.is_none() {
            tracing::debug!(key = SESSION_KEY, "malformed session record ignored");
        }
        parsed
    }

    /// Returns the trimmed session email, or `""`.
    ///
    /// Never fails: an absent, unparsable or email-less record reads as no
    /// session.
    #[must_use]
    pub fn session_email(&self) -> String {
        self.identity()
            .map(|identity| identity.email.trim().to_string())
            .unwrap_or_default()
    }

    /// Returns `true` if a session email is stored.
    #[must_use]
    pub fn has_session(&self) -> bool {
        !self.session_email().is_empty()
    }

    /// Stores `identity` and notifies listeners.
    ///
    /// # Errors
    ///
    /// - [`SessionError::MissingEmail`] for a blank email
    /// - [`SessionError::Storage`] if the backend write fails
    pub fn set_session(&self, identity: &SessionIdentity) -> Result<(), SessionError> {
        if identity.email.trim().is_empty() {
            return Err(SessionError::MissingEmail);
        }
        let json = serde_json::to_string(identity)?;
        self.context.set_item(SESSION_KEY, &json)?;
        self.context.dispatch(SESSION_EVENT);
        tracing::info!(email = %identity.email.trim(), "session stored");
        Ok(())
    }

    /// Removes the session and notifies listeners.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the backend write fails.
    pub fn clear_session(&self) -> Result<(), SessionError> {
        self.context.remove_item(SESSION_KEY)?;
        self.context.dispatch(SESSION_EVENT);
        tracing::info!("session cleared");
        Ok(())
    }

    /// Removes the session record if it is present but unparsable.
    ///
    /// Returns `true` if a record was discarded. No event is dispatched:
    /// the session already read as empty.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the backend fails.
    pub fn discard_malformed(&self) -> Result<bool, SessionError> {
        let Some(raw) = self.context.get_item(SESSION_KEY)? else {
            return Ok(false);
        };
        if parse_identity(&raw).is_some() {
            return Ok(false);
        }
        self.context.remove_item(SESSION_KEY)?;
        tracing::debug!(key = SESSION_KEY, "discarded malformed session record");
        Ok(true)
    }

    /// Returns a watcher for session changes.
    #[must_use]
    pub fn watch(&self) -> SessionWatcher {
        SessionWatcher {
            subscription: self.context.subscribe(),
        }
    }
}

fn parse_identity(raw: &str) -> Option<SessionIdentity> {
    let value: Value = serde_json::from_str(raw).ok()?;
    SessionIdentity::from_value(&value)
}

/// Waits for session changes in one context.
#[derive(Debug)]
pub struct SessionWatcher {
    subscription: ContextSubscription,
}

impl SessionWatcher {
    /// Completes on the next session change.
    ///
    /// Returns `false` once the context is gone. Unrelated keys and
    /// events are skipped. Cancel safe.
    pub async fn changed(&mut self) -> bool {
        while let Some(signal) = self.subscription.recv().await {
            match signal {
                ContextSignal::Storage { key } if key == SESSION_KEY => return true,
                ContextSignal::Event(name) if name == SESSION_EVENT => return true,
                ContextSignal::Resync => return true,
                ContextSignal::Storage { .. } | ContextSignal::Event(_) => {}
            }
        }
        false
    }
}
