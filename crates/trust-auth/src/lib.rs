//! Access-control primitives for the Trust dashboard.
//!
//! Everything here is pure: no storage, no network, no clock. The runtime
//! crate feeds these types with the session store and the resolved user.
//!
//! # Decision Model
//!
//! ```text
//! GateDecision = PublicPaths(WHERE, no session needed)
//!              ∨ Session(WHO) ∧ RolePolicyTable(role → blocked / allowed prefixes)
//! ```
//!
//! | Layer | Type | Controls |
//! |-------|------|----------|
//! | [`PublicPaths`] | Literals + patterns | Routes reachable without a session |
//! | [`PathPolicy`] | Blocked / allowed prefixes | Routes one restricted role may reach |
//! | [`RolePolicyTable`] | Role → [`PathPolicy`] | Which roles are restricted at all |
//! | [`NavigationGate`] | Pure function | Allow, wait, or redirect |
//!
//! # Design Principles
//!
//! - **Blocked wins**: a blocked prefix beats any allowed prefix
//! - **Unrestricted by default**: roles without a table entry reach every path
//! - **No hidden state**: the same input always yields the same decision
//!
//! # Example
//!
//! ```
//! use trust_auth::{GateDecision, GateInput, IdentityState, NavigationGate};
//! use trust_types::Role;
//!
//! let gate = NavigationGate::default();
//!
//! let decision = gate.decide(&GateInput {
//!     path: "/clientes/sucursales",
//!     session_present: true,
//!     identity: &IdentityState::Resolved(Some(Role::BranchAdmin)),
//! });
//! assert_eq!(decision.redirect_target(), Some("/dashboard"));
//!
//! let decision = gate.decide(&GateInput {
//!     path: "/politica-privacidad",
//!     session_present: false,
//!     identity: &IdentityState::Pending,
//! });
//! assert_eq!(decision, GateDecision::Allow);
//! ```

pub mod error;
pub mod gate;
pub mod navigation;
pub mod policy;
pub mod prefix;
pub mod public;

pub use error::{AccessDenied, PolicyError};
pub use gate::{
    GateDecision, GateInput, IdentityState, NavigationGate, RedirectReason, RolelessPolicy,
    DEFAULT_AUTHENTICATED_PATH, LOGIN_PATH,
};
pub use navigation::{
    mobile_items, resolve_active_path, shows_shell, sidebar_items, NavItem, MOBILE_ITEMS,
    SIDEBAR_ITEMS,
};
pub use policy::{
    is_account_admin_allowed_path, is_branch_admin_allowed_path, is_inspector_allowed_path,
    PathPolicy, RolePolicyTable,
};
pub use prefix::{matches_any, matches_prefix};
pub use public::PublicPaths;

pub use trust_types::Role;
