//! Navigation guard: applies the gate to a live router.
//!
//! ```text
//!  router pathname ─┐
//!  resolver state  ─┼─► NavigationGate::decide ─► Redirect? ─► Navigator::replace
//!  session change  ─┘
//! ```
//!
//! Every trigger recomputes the decision from scratch; nothing is cached
//! between navigations.

use crate::resolver::ResolverHandle;
use crate::session::{SessionStore, SessionWatcher};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use trust_auth::{GateDecision, GateInput, NavigationGate};

/// Something that can change the current route without adding history.
pub trait Navigator: Send + Sync {
    /// Replaces the current route with `path`.
    fn replace(&self, path: &str);
}

struct RouterState {
    pathname: watch::Sender<String>,
    history: Mutex<Vec<String>>,
}

/// In-memory router with a history stack.
///
/// Clones share the same router.
#[derive(Clone)]
pub struct MemoryRouter {
    state: Arc<RouterState>,
}

impl MemoryRouter {
    /// Creates a router positioned at `initial`.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        let (pathname, _) = watch::channel(initial.clone());
        Self {
            state: Arc::new(RouterState {
                pathname,
                history: Mutex::new(vec![initial]),
            }),
        }
    }

    /// Returns the current pathname.
    #[must_use]
    pub fn pathname(&self) -> String {
        self.state.pathname.borrow().clone()
    }

    /// Navigates to `path`, adding a history entry.
    pub fn push(&self, path: &str) {
        self.state.history.lock().push(path.to_string());
        self.state.pathname.send_replace(path.to_string());
    }

    /// Returns the history stack, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.history.lock().clone()
    }

    /// Subscribes to pathname changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.state.pathname.subscribe()
    }
}

impl Navigator for MemoryRouter {
    fn replace(&self, path: &str) {
        {
            let mut history = self.state.history.lock();
            match history.last_mut() {
                Some(top) => *top = path.to_string(),
                None => history.push(path.to_string()),
            }
        }
        self.state.pathname.send_replace(path.to_string());
    }
}

impl std::fmt::Debug for MemoryRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRouter")
            .field("pathname", &self.pathname())
            .finish_non_exhaustive()
    }
}

/// Gate wired to a session store, a resolver and a navigator.
pub struct NavigationGuard<N> {
    gate: NavigationGate,
    store: SessionStore,
    resolver: ResolverHandle,
    navigator: N,
    session: SessionWatcher,
}

impl<N: Navigator> NavigationGuard<N> {
    pub fn new(
        gate: NavigationGate,
        store: SessionStore,
        resolver: ResolverHandle,
        navigator: N,
    ) -> Self {
        let session = store.watch();
        Self {
            gate,
            store,
            resolver,
            navigator,
            session,
        }
    }

    /// Returns the gate.
    #[must_use]
    pub fn gate(&self) -> &NavigationGate {
        &self.gate
    }

    /// Returns the resolver handle.
    #[must_use]
    pub fn resolver(&self) -> &ResolverHandle {
        &self.resolver
    }

    /// Decides for `path` and performs the redirect, if any.
    pub fn evaluate(&self, path: &str) -> GateDecision {
        let identity = self.resolver.current().identity_state();
        let decision = self.gate.decide(&GateInput {
            path,
            session_present: self.store.has_session(),
            identity: &identity,
        });

        if let Some(target) = decision.redirect_target() {
            if target == path {
                tracing::warn!(path, "redirect target is denied too: staying");
            } else {
                self.navigator.replace(target);
            }
        }
        decision
    }

    /// Re-evaluates on every pathname, resolution and session change.
    ///
    /// Returns when the path source, the resolver or the session context
    /// goes away.
    pub async fn run(&mut self, mut paths: watch::Receiver<String>) {
        loop {
            let path = paths.borrow_and_update().clone();
            let decision = self.evaluate(&path);
            tracing::debug!(path = %path, decision = %decision, "navigation evaluated");

            tokio::select! {
                changed = paths.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                alive = self.resolver.changed() => {
                    if !alive {
                        return;
                    }
                }
                alive = self.session.changed() => {
                    if !alive {
                        return;
                    }
                }
            }
        }
    }
}

impl<N> std::fmt::Debug for NavigationGuard<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationGuard")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
