//! Runtime layer of the Trust dashboard access control.
//!
//! Wires the pure gate from `trust-auth` to live state: persistent
//! storage, the session store, the remote user directory and a router.
//!
//! # Modules
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`storage`] | Key/value installation shared by browsing contexts |
//! | [`session`] | The `trust.currentUser` record and its change events |
//! | [`directory`] | Remote user listing |
//! | [`resolver`] | Session email → current user, republished on change |
//! | [`guard`] | Gate decisions applied to a router |
//! | [`login`] | Credential login, logout |
//! | [`notifications`] | Read-state of incident and visit notifications |
//! | [`config`] | Layered TOML / env configuration |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trust_auth::NavigationGate;
//! use trust_runtime::directory::StaticDirectory;
//! use trust_runtime::guard::{MemoryRouter, NavigationGuard};
//! use trust_runtime::resolver::{CurrentUserResolver, IdentityFallback};
//! use trust_runtime::session::SessionStore;
//! use trust_runtime::storage::SharedStorage;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let storage = SharedStorage::in_memory();
//! let store = SessionStore::new(storage.context());
//! let resolver = CurrentUserResolver::spawn(
//!     store.clone(),
//!     Arc::new(StaticDirectory::default()),
//!     IdentityFallback::Disabled,
//! );
//! let router = MemoryRouter::new("/clientes/visitas");
//! let guard = NavigationGuard::new(NavigationGate::default(), store, resolver, router.clone());
//!
//! // No session: sent to login without waiting for the directory.
//! guard.evaluate("/clientes/visitas");
//! assert_eq!(router.pathname(), "/");
//! # }
//! ```

pub mod config;
pub mod directory;
pub mod guard;
pub mod login;
pub mod notifications;
pub mod resolver;
pub mod session;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, ConfigLoader, ConfigResolver, TrustConfig};
pub use directory::{DirectoryError, HttpUserDirectory, StaticDirectory, UserDirectory};
pub use guard::{MemoryRouter, NavigationGuard, Navigator};
pub use login::{logout, LoginClient, LoginError};
pub use resolver::{
    resolve_once, select_user, CurrentUserResolver, IdentityFallback, Resolution, ResolverHandle,
};
pub use session::{SessionError, SessionStore, SessionWatcher, SESSION_EVENT, SESSION_KEY};
pub use storage::{SharedStorage, StorageContext, StorageError};
