//! Policy errors.

use thiserror::Error;
use trust_types::Role;

/// Error building a policy from configuration.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A prefix that cannot be matched meaningfully.
    #[error("invalid path prefix '{prefix}': {reason}")]
    InvalidPrefix { prefix: String, reason: &'static str },

    /// A policy entry for a role the gate never restricts.
    #[error("role '{0}' is not a restricted role")]
    UnrestrictedRole(Role),

    /// A public path pattern that is not a valid route template.
    #[error("invalid public path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl PolicyError {
    /// Creates an invalid prefix error.
    pub fn invalid_prefix(prefix: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPrefix {
            prefix: prefix.into(),
            reason,
        }
    }

    /// Creates an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// Why a navigation was refused.
///
/// The gate itself returns [`GateDecision`](crate::GateDecision); this error
/// form is for callers that need a `Result` (for example, the CLI's
/// `check --strict`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    /// No session is stored.
    #[error("'{path}' requires a session")]
    Unauthenticated { path: String },

    /// The role may not reach the path.
    #[error("role '{role}' may not access '{path}'")]
    RoleRestricted { role: Role, path: String },

    /// A session exists but no directory user backs it.
    #[error("'{path}' requires a resolved user")]
    UnresolvedIdentity { path: String },
}

impl AccessDenied {
    /// Returns the layer that refused access.
    #[must_use]
    pub fn layer(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "session",
            Self::RoleRestricted { .. } => "role",
            Self::UnresolvedIdentity { .. } => "identity",
        }
    }
}
