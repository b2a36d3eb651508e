//! Configuration management with hierarchical layering.
//!
//! # Architecture
//!
//! Configuration is loaded from multiple sources with priority-based merging:
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌──────────────────────────────────────────┐
//! │  1. CLI flags (ConfigResolver)           │  Per invocation
//! ├──────────────────────────────────────────┤
//! │  2. Environment Variables (TRUST_*)      │  Runtime override
//! ├──────────────────────────────────────────┤
//! │  3. Project Config (.trust/config.toml)  │  Project-specific
//! ├──────────────────────────────────────────┤
//! │  4. Global Config (~/.trust/config.toml) │  User defaults
//! ├──────────────────────────────────────────┤
//! │  5. Default Values (compile-time)        │  Fallback
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `TRUST_DEBUG` | `debug` | bool |
//! | `TRUST_BACKEND_URL` | `backend.base_url` | String |
//! | `BACKEND_BASE_URL` | `backend.base_url` (if the above is unset) | String |
//! | `TRUST_BACKEND_TIMEOUT_MS` | `backend.timeout_ms` | u64 |
//! | `TRUST_STORAGE_PATH` | `paths.storage_file` | PathBuf |
//! | `TRUST_IDENTITY_FALLBACK` | `session.identity_fallback` | `disabled` \| `first-active` |
//! | `TRUST_ROLELESS` | `session.roleless` | `allow` \| `login` |
//!
//! # Example Configuration
//!
//! ```toml
//! # ~/.trust/config.toml
//! debug = false
//!
//! [backend]
//! base_url = "http://localhost:8000"
//! timeout_ms = 10000
//!
//! [paths]
//! storage_file = "~/.trust/storage.json"
//!
//! [session]
//! identity_fallback = "disabled"
//! roleless = "allow"
//!
//! [gate]
//! login_path = "/"
//! default_path = "/dashboard"
//! extra_public_paths = []
//!
//! [policy.inspector]
//! blocked = ["/clientes/calendario/nueva", "/clientes/incidencias/nueva"]
//! allowed = ["/dashboard", "/clientes/calendario", "/clientes/visitas", "/clientes/incidencias"]
//!
//! [login]
//! endpoints = ["{base_url}/api/login/"]
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{
    BackendConfig, GateConfig, LoginConfig, PathsConfig, SessionConfig, TrustConfig,
    BASE_URL_PLACEHOLDER, DEFAULT_BACKEND_URL,
};

/// Default global config directory.
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".trust")
}

/// Default global config file path.
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Project config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".trust";

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "config.toml";

/// Produces the final configuration.
///
/// Implementations usually load through [`ConfigLoader`] and then apply
/// explicitly given CLI flags as the highest-priority layer.
pub trait ConfigResolver {
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any layer fails to load.
    fn resolve(&self) -> Result<TrustConfig, ConfigError>;
}
