//! Current-user resolution.
//!
//! Maps the stored session email to a directory user and republishes the
//! answer whenever the session changes.
//!
//! # Lifecycle
//!
//! ```text
//!            spawn
//!              │
//!              ▼
//!         ┌─────────┐  directory ok    ┌──────────────────────┐
//!         │ Loading │ ───────────────► │ Resolved(Option<..>) │
//!         └─────────┘                  └──────────────────────┘
//!              │ ▲  directory error    ┌──────────────────────┐
//!              │ └──────────────────── │ Failed               │
//!              ▼                       └──────────────────────┘
//!      session changed while fetching: fetch dropped, restart
//! ```
//!
//! Dropping the [`ResolverHandle`] aborts the task; nothing is published
//! after that.

use crate::directory::{DirectoryError, UserDirectory};
use crate::session::SessionStore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use trust_auth::IdentityState;
use trust_types::CurrentUser;

/// What to do when no session email is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityFallback {
    /// Resolve to no user.
    #[default]
    Disabled,
    /// Pick the first active directory entry, else the first entry.
    FirstActive,
}

/// Picks the directory user for `session_email`.
///
/// A non-empty email only ever matches itself: a stored email with no
/// directory match resolves to `None`, never to a fallback user.
#[must_use]
pub fn select_user(
    users: &[CurrentUser],
    session_email: &str,
    fallback: IdentityFallback,
) -> Option<CurrentUser> {
    if !session_email.trim().is_empty() {
        return users
            .iter()
            .find(|user| user.email_matches(session_email))
            .cloned();
    }
    match fallback {
        IdentityFallback::Disabled => None,
        IdentityFallback::FirstActive => users
            .iter()
            .find(|user| user.is_active)
            .or_else(|| users.first())
            .cloned(),
    }
}

/// Published resolver state.
#[derive(Debug, Clone)]
pub enum Resolution {
    Loading,
    Resolved(Option<CurrentUser>),
    Failed(Arc<DirectoryError>),
}

impl Resolution {
    /// Maps to the gate's view of the identity.
    #[must_use]
    pub fn identity_state(&self) -> IdentityState {
        match self {
            Self::Loading => IdentityState::Pending,
            Self::Resolved(user) => {
                IdentityState::Resolved(user.as_ref().map(|user| user.role.clone()))
            }
            Self::Failed(_) => IdentityState::Unavailable,
        }
    }

    /// Returns the resolved user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Self::Resolved(user) => user.as_ref(),
            Self::Loading | Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Resolves once, without watching the session.
///
/// # Errors
///
/// Returns the directory error if the fetch fails.
pub async fn resolve_once<D: UserDirectory>(
    store: &SessionStore,
    directory: &D,
    fallback: IdentityFallback,
) -> Result<Option<CurrentUser>, DirectoryError> {
    if let Err(e) = store.discard_malformed() {
        tracing::debug!(error = %e, "could not discard malformed session");
    }
    let email = store.session_email();
    if email.is_empty() && fallback == IdentityFallback::Disabled {
        return Ok(None);
    }
    let users = directory.list_users(&email).await?;
    Ok(select_user(&users, &email, fallback))
}

/// Spawns resolver tasks.
#[derive(Debug)]
pub struct CurrentUserResolver;

impl CurrentUserResolver {
    /// Starts resolving for `store` on the current tokio runtime.
    ///
    /// The first state is [`Resolution::Loading`].
    pub fn spawn<D>(
        store: SessionStore,
        directory: Arc<D>,
        fallback: IdentityFallback,
    ) -> ResolverHandle
    where
        D: UserDirectory + 'static,
    {
        let (tx, rx) = watch::channel(Resolution::Loading);
        let settled = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run(store, directory, fallback, tx, Arc::clone(&settled)));
        ResolverHandle { rx, settled, task }
    }
}

async fn run<D: UserDirectory>(
    store: SessionStore,
    directory: Arc<D>,
    fallback: IdentityFallback,
    tx: watch::Sender<Resolution>,
    settled: Arc<AtomicBool>,
) {
    // Subscribe before the first read so no change slips between the two.
    let mut watcher = store.watch();
    let mut last_email: Option<String> = None;

    loop {
        if let Err(e) = store.discard_malformed() {
            tracing::debug!(error = %e, "could not discard malformed session");
        }
        let email = store.session_email();

        if last_email.as_deref() != Some(email.as_str()) {
            // A different identity: the previous answer no longer applies.
            tx.send_if_modified(|current| {
                if current.is_loading() {
                    return false;
                }
                *current = Resolution::Loading;
                true
            });
        }

        let outcome = if email.is_empty() && fallback == IdentityFallback::Disabled {
            Some(Ok(None))
        } else {
            tokio::select! {
                listed = directory.list_users(&email) => {
                    Some(listed.map(|users| select_user(&users, &email, fallback)))
                }
                alive = watcher.changed() => {
                    if !alive {
                        return;
                    }
                    tracing::debug!("session changed during fetch: restarting");
                    None
                }
            }
        };

        let Some(outcome) = outcome else {
            last_email = None;
            continue;
        };

        let resolution = match outcome {
            Ok(user) => {
                tracing::debug!(
                    email = %email,
                    user = user.as_ref().map(|u| u.id),
                    "current user resolved"
                );
                Resolution::Resolved(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "user directory unavailable");
                Resolution::Failed(Arc::new(e))
            }
        };
        settled.store(true, Ordering::Release);
        tx.send_replace(resolution);
        last_email = Some(email);

        if !watcher.changed().await {
            return;
        }
    }
}

/// Owner of a running resolver.
///
/// Dropping it stops the resolver.
#[derive(Debug)]
pub struct ResolverHandle {
    rx: watch::Receiver<Resolution>,
    settled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ResolverHandle {
    /// Returns the current resolution.
    #[must_use]
    pub fn current(&self) -> Resolution {
        self.rx.borrow().clone()
    }

    /// Returns the resolved user, if any.
    #[must_use]
    pub fn user(&self) -> Option<CurrentUser> {
        self.rx.borrow().user().cloned()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.rx.borrow().is_loading()
    }

    /// Returns `true` once the resolver has left `Loading` at least once.
    #[must_use]
    pub fn has_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Waits for the next published change.
    ///
    /// Returns `false` if the resolver has stopped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Waits until the resolution is not `Loading` and returns it.
    pub async fn settled(&mut self) -> Resolution {
        let waited = self
            .rx
            .wait_for(|resolution| !resolution.is_loading())
            .await
            .map(|resolution| resolution.clone());
        match waited {
            Ok(resolution) => resolution,
            // Sender gone: the last published value is final.
            Err(_) => self.rx.borrow().clone(),
        }
    }

    /// Returns an extra receiver. It stops receiving when the handle drops.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Resolution> {
        self.rx.clone()
    }
}

impl Drop for ResolverHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
