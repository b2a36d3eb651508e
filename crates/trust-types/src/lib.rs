//! Core identity types for the Trust dashboard.
//!
//! This crate holds the plain data shared by every other layer. It has no
//! policy logic and no I/O.
//!
//! # Crate Architecture
//!
//! ```text
//! trust-types    : Role, CurrentUser, SessionIdentity  ◄── HERE
//!     ↑
//! trust-auth     : path policy, public paths, navigation gate
//!     ↑
//! trust-runtime  : storage, session store, resolver, guard, config
//!     ↑
//! trust-cli      : `trust` binary
//! ```
//!
//! # Example
//!
//! ```
//! use trust_types::{CurrentUser, Role, SessionIdentity};
//!
//! let identity = SessionIdentity::from_email("ana@example.com");
//! assert_eq!(identity.email, "ana@example.com");
//!
//! let role = Role::parse("branch_admin");
//! assert!(role.is_restricted());
//! assert_eq!(Role::parse("superuser"), Role::Unknown("superuser".into()));
//! ```

pub mod role;
pub mod user;

pub use role::Role;
pub use user::{CurrentUser, SessionIdentity, UserDirectoryPage};
