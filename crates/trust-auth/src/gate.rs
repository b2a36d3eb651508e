//! Navigation gate decision.
//!
//! [`NavigationGate::decide`] is evaluated on every pathname change. It takes
//! a snapshot of what is known about the visitor and returns one of:
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | [`GateDecision::Allow`] | Render the route |
//! | [`GateDecision::Pending`] | Identity still resolving: render nothing, redirect nothing |
//! | [`GateDecision::Redirect`] | Replace-navigate to `target` |
//!
//! # Order of Checks
//!
//! ```text
//! public path?               ── yes ──► Allow
//!     │ no
//! session stored?            ── no ───► Redirect(login)        (fast path, never waits)
//!     │ yes
//! identity pending?          ── yes ──► Pending
//!     │ no
//! restricted role, denied?   ── yes ──► Redirect(default page)
//!     │ no
//! no resolved user?          ── yes ──► RolelessPolicy (Allow | Redirect(login))
//!     │ no
//! Allow
//! ```
//!
//! # Audit Logging
//!
//! - Allowed: debug level
//! - Redirects: info level
//! - Role denials: warn level

use crate::error::AccessDenied;
use crate::policy::RolePolicyTable;
use crate::public::{normalize, PublicPaths};
use serde::{Deserialize, Serialize};
use std::fmt;
use trust_types::Role;

/// Login route; unauthenticated visitors are sent here.
pub const LOGIN_PATH: &str = "/";

/// Landing page for authenticated visitors who hit a denied route.
pub const DEFAULT_AUTHENTICATED_PATH: &str = "/dashboard";

/// What the resolver knows about the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityState {
    /// The directory lookup has not settled yet.
    Pending,
    /// Settled. `None` means a session is stored but no directory user matches it.
    Resolved(Option<Role>),
    /// The directory lookup failed.
    Unavailable,
}

impl IdentityState {
    /// Returns the resolved role, if any.
    #[must_use]
    pub fn role(&self) -> Option<&Role> {
        match self {
            Self::Resolved(role) => role.as_ref(),
            Self::Pending | Self::Unavailable => None,
        }
    }
}

/// How to treat a stored session that resolves to no directory user.
///
/// Covers both "no email match" and "directory fetch failed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RolelessPolicy {
    /// Treat as unrestricted.
    #[default]
    Allow,
    /// Send back to the login page.
    Login,
}

/// Snapshot handed to the gate for one navigation.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub path: &'a str,
    /// Whether a session identity is stored. Read synchronously from storage.
    pub session_present: bool,
    pub identity: &'a IdentityState,
}

/// Why a redirect was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectReason {
    /// No session stored.
    Unauthenticated,
    /// The role may not reach the path.
    RoleRestricted { role: Role },
    /// Session stored, but no directory user behind it.
    UnresolvedIdentity,
}

impl fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("unauthenticated"),
            Self::RoleRestricted { role } => write!(f, "restricted for {role}"),
            Self::UnresolvedIdentity => f.write_str("unresolved identity"),
        }
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Pending,
    Redirect {
        target: String,
        reason: RedirectReason,
    },
}

impl GateDecision {
    /// Returns `true` for [`GateDecision::Allow`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns `true` for [`GateDecision::Pending`].
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns the redirect target, if this is a redirect.
    #[must_use]
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Redirect { target, .. } => Some(target),
            Self::Allow | Self::Pending => None,
        }
    }

    /// Converts a redirect into an [`AccessDenied`] for `path`.
    ///
    /// # Errors
    ///
    /// Returns the denial for redirects; `Allow` and `Pending` are `Ok`.
    pub fn into_result(self, path: &str) -> Result<(), AccessDenied> {
        let path = path.to_string();
        match self {
            Self::Allow | Self::Pending => Ok(()),
            Self::Redirect { reason, .. } => Err(match reason {
                RedirectReason::Unauthenticated => AccessDenied::Unauthenticated { path },
                RedirectReason::RoleRestricted { role } => {
                    AccessDenied::RoleRestricted { role, path }
                }
                RedirectReason::UnresolvedIdentity => AccessDenied::UnresolvedIdentity { path },
            }),
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Pending => f.write_str("pending"),
            Self::Redirect { target, reason } => write!(f, "redirect {target} ({reason})"),
        }
    }
}

/// The pure navigation gate.
///
/// Holds no mutable state; [`decide`](Self::decide) is deterministic.
#[derive(Debug, Clone)]
pub struct NavigationGate {
    policies: RolePolicyTable,
    public: PublicPaths,
    login_path: String,
    default_path: String,
    roleless: RolelessPolicy,
}

impl NavigationGate {
    /// Creates a gate with the given policy table and public paths.
    #[must_use]
    pub fn new(policies: RolePolicyTable, public: PublicPaths) -> Self {
        Self {
            policies,
            public,
            login_path: LOGIN_PATH.to_string(),
            default_path: DEFAULT_AUTHENTICATED_PATH.to_string(),
            roleless: RolelessPolicy::default(),
        }
    }

    /// Overrides the login path.
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Overrides the default authenticated path.
    #[must_use]
    pub fn with_default_path(mut self, path: impl Into<String>) -> Self {
        self.default_path = path.into();
        self
    }

    /// Sets the roleless-session policy.
    #[must_use]
    pub fn with_roleless_policy(mut self, policy: RolelessPolicy) -> Self {
        self.roleless = policy;
        self
    }

    /// Returns the policy table.
    #[must_use]
    pub fn policies(&self) -> &RolePolicyTable {
        &self.policies
    }

    /// Returns the public allowlist.
    #[must_use]
    pub fn public_paths(&self) -> &PublicPaths {
        &self.public
    }

    /// Returns the login path.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Returns the default authenticated path.
    #[must_use]
    pub fn default_path(&self) -> &str {
        &self.default_path
    }

    /// Decides what to do with one navigation.
    ///
    /// Query string, fragment and a trailing `/` are ignored by every check.
    #[must_use]
    pub fn decide(&self, input: &GateInput<'_>) -> GateDecision {
        let path = normalize(input.path);

        if self.public.is_public(path) {
            tracing::debug!(path, "public path allowed");
            return GateDecision::Allow;
        }

        if !input.session_present {
            tracing::info!(path, target = %self.login_path, "no session: redirecting to login");
            return self.redirect(&self.login_path, RedirectReason::Unauthenticated);
        }

        let role = match input.identity {
            IdentityState::Pending => {
                tracing::debug!(path, "identity pending: holding navigation");
                return GateDecision::Pending;
            }
            IdentityState::Resolved(Some(role)) => role,
            IdentityState::Resolved(None) | IdentityState::Unavailable => {
                return self.roleless_decision(path, input.identity);
            }
        };

        if self.policies.restricts(role) && !self.policies.is_path_allowed(Some(role), path) {
            tracing::warn!(
                path,
                role = %role,
                target = %self.default_path,
                "navigation denied for role"
            );
            return self.redirect(
                &self.default_path,
                RedirectReason::RoleRestricted { role: role.clone() },
            );
        }

        tracing::debug!(path, role = %role, "navigation allowed");
        GateDecision::Allow
    }

    fn roleless_decision(&self, path: &str, identity: &IdentityState) -> GateDecision {
        match self.roleless {
            RolelessPolicy::Allow => {
                tracing::debug!(path, identity = ?identity, "roleless session allowed");
                GateDecision::Allow
            }
            RolelessPolicy::Login => {
                tracing::warn!(
                    path,
                    identity = ?identity,
                    target = %self.login_path,
                    "roleless session: redirecting to login"
                );
                self.redirect(&self.login_path, RedirectReason::UnresolvedIdentity)
            }
        }
    }

    fn redirect(&self, target: &str, reason: RedirectReason) -> GateDecision {
        GateDecision::Redirect {
            target: target.to_string(),
            reason,
        }
    }
}

impl Default for NavigationGate {
    fn default() -> Self {
        Self::new(RolePolicyTable::builtin(), PublicPaths::builtin())
    }
}
