//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use super::ConfigError;
use crate::resolver::IdentityFallback;
use crate::storage::{default_storage_path, expand_tilde};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use trust_auth::{
    NavigationGate, PathPolicy, PolicyError, PublicPaths, RolePolicyTable, RolelessPolicy,
    DEFAULT_AUTHENTICATED_PATH, LOGIN_PATH,
};
use trust_types::Role;

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Placeholder in `login.endpoints` replaced by the backend base URL.
pub const BASE_URL_PLACEHOLDER: &str = "{base_url}";

/// Main configuration structure.
///
/// This is the unified configuration after merging all layers.
///
/// # Example
///
/// ```
/// use trust_runtime::config::TrustConfig;
///
/// let config = TrustConfig::default();
/// assert!(!config.debug);
/// assert_eq!(config.base_url(), "http://localhost:8000");
/// assert_eq!(config.login_endpoints(), vec!["http://localhost:8000/api/login/"]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrustConfig {
    /// Enable debug mode (verbose logging).
    pub debug: bool,

    /// Backend connection.
    pub backend: BackendConfig,

    /// Path configuration.
    pub paths: PathsConfig,

    /// Identity resolution.
    pub session: SessionConfig,

    /// Gate routes.
    pub gate: GateConfig,

    /// Per-role overrides of the built-in policy table, keyed by role tag.
    pub policy: BTreeMap<String, PathPolicy>,

    /// Login endpoints.
    pub login: LoginConfig,
}

impl TrustConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Merges another config into this one.
    ///
    /// Values from `other` override values in `self` only if they
    /// differ from the default. Policy entries are merged per role.
    pub fn merge(&mut self, other: &Self) {
        if other.debug {
            self.debug = true;
        }
        self.backend.merge(&other.backend);
        self.paths.merge(&other.paths);
        self.session.merge(&other.session);
        self.gate.merge(&other.gate);
        for (role, policy) in &other.policy {
            self.policy.insert(role.clone(), policy.clone());
        }
        self.login.merge(&other.login);
    }

    /// Backend base URL without a trailing `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.backend.base_url.trim_end_matches('/')
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.backend.timeout_ms)
    }

    /// Resolved storage file path.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.paths
            .storage_file
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(default_storage_path)
    }

    /// Login endpoints with `{base_url}` substituted.
    #[must_use]
    pub fn login_endpoints(&self) -> Vec<String> {
        if self.login.endpoints.is_empty() {
            return vec![format!("{}/api/login/", self.base_url())];
        }
        self.login
            .endpoints
            .iter()
            .map(|endpoint| endpoint.replace(BASE_URL_PLACEHOLDER, self.base_url()))
            .collect()
    }

    /// Builds the role policy table: built-ins overlaid with `[policy]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Policy`] for an unrestricted role or an
    /// invalid prefix.
    pub fn build_policy(&self) -> Result<RolePolicyTable, ConfigError> {
        let mut table = RolePolicyTable::builtin();
        for (tag, policy) in &self.policy {
            let role = Role::parse(tag);
            let policy = PathPolicy::new(policy.blocked.clone(), policy.allowed.clone())?;
            table = table.with_policy(role, policy)?;
        }
        Ok(table)
    }

    /// Builds the public allowlist: built-ins plus `gate.extra_public_paths`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Policy`] for a malformed entry.
    pub fn build_public_paths(&self) -> Result<PublicPaths, ConfigError> {
        Ok(PublicPaths::builtin().with_entries(self.gate.extra_public_paths.iter().cloned())?)
    }

    /// Builds the navigation gate.
    ///
    /// # Errors
    ///
    /// See [`build_policy`](Self::build_policy) and
    /// [`build_public_paths`](Self::build_public_paths). Gate paths must
    /// start with `/`.
    pub fn build_gate(&self) -> Result<NavigationGate, ConfigError> {
        for path in [&self.gate.login_path, &self.gate.default_path] {
            if !path.starts_with('/') {
                return Err(PolicyError::invalid_prefix(path.clone(), "must start with '/'").into());
            }
        }
        Ok(
            NavigationGate::new(self.build_policy()?, self.build_public_paths()?)
                .with_login_path(self.gate.login_path.clone())
                .with_default_path(self.gate.default_path.clone())
                .with_roleless_policy(self.session.roleless),
        )
    }
}

/// Backend connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the Trust API.
    pub base_url: String,

    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.into(),
            timeout_ms: 10_000,
        }
    }
}

impl BackendConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.base_url != default.base_url {
            self.base_url = other.base_url.clone();
        }
        if other.timeout_ms != default.timeout_ms {
            self.timeout_ms = other.timeout_ms;
        }
    }
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Storage file (default: `~/.trust/storage.json`).
    pub storage_file: Option<PathBuf>,
}

impl PathsConfig {
    fn merge(&mut self, other: &Self) {
        if other.storage_file.is_some() {
            self.storage_file = other.storage_file.clone();
        }
    }
}

/// Identity resolution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Behavior when no session email is stored.
    pub identity_fallback: IdentityFallback,

    /// Behavior for sessions without a resolved directory user.
    pub roleless: RolelessPolicy,
}

impl SessionConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.identity_fallback != default.identity_fallback {
            self.identity_fallback = other.identity_fallback;
        }
        if other.roleless != default.roleless {
            self.roleless = other.roleless;
        }
    }
}

/// Gate routes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    /// Where unauthenticated visitors are sent.
    pub login_path: String,

    /// Where denied authenticated visitors are sent.
    pub default_path: String,

    /// Additional public literals or `{param}` templates.
    pub extra_public_paths: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            login_path: LOGIN_PATH.into(),
            default_path: DEFAULT_AUTHENTICATED_PATH.into(),
            extra_public_paths: Vec::new(),
        }
    }
}

impl GateConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.login_path != default.login_path {
            self.login_path = other.login_path.clone();
        }
        if other.default_path != default.default_path {
            self.default_path = other.default_path.clone();
        }
        for path in &other.extra_public_paths {
            if !self.extra_public_paths.contains(path) {
                self.extra_public_paths.push(path.clone());
            }
        }
    }
}

/// Login endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoginConfig {
    /// Tried in order. Empty means `{base_url}/api/login/`.
    pub endpoints: Vec<String>,
}

impl LoginConfig {
    fn merge(&mut self, other: &Self) {
        if !other.endpoints.is_empty() {
            self.endpoints = other.endpoints.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = TrustConfig::from_toml(
            r#"
debug = true

[backend]
base_url = "https://api.trust.example/"
timeout_ms = 2500

[paths]
storage_file = "/var/lib/trust/storage.json"

[session]
identity_fallback = "first-active"
roleless = "login"

[gate]
extra_public_paths = ["/ayuda", "/share/{token}"]

[policy.inspector]
blocked = ["/clientes/incidencias/nueva"]
allowed = ["/dashboard", "/clientes/incidencias"]

[login]
endpoints = ["{base_url}/api/login/", "{base_url}/api/auth/login/"]
"#,
        )
        .unwrap();

        assert!(config.debug);
        assert_eq!(config.base_url(), "https://api.trust.example");
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(
            config.storage_path(),
            PathBuf::from("/var/lib/trust/storage.json")
        );
        assert_eq!(config.session.identity_fallback, IdentityFallback::FirstActive);
        assert_eq!(config.session.roleless, RolelessPolicy::Login);
        assert_eq!(
            config.login_endpoints(),
            vec![
                "https://api.trust.example/api/login/",
                "https://api.trust.example/api/auth/login/"
            ]
        );

        let table = config.build_policy().unwrap();
        assert!(!table.is_path_allowed(Some(&Role::Inspector), "/clientes/calendario"));
        assert!(table.is_path_allowed(Some(&Role::Inspector), "/clientes/incidencias/3"));

        let gate = config.build_gate().unwrap();
        assert!(gate.public_paths().is_public("/share/abc"));
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(TrustConfig::from_toml("").unwrap(), TrustConfig::default());
    }

    #[test]
    fn policy_for_unrestricted_role_is_rejected() {
        let mut config = TrustConfig::default();
        config
            .policy
            .insert("general_admin".into(), PathPolicy::default());
        assert!(matches!(
            config.build_policy(),
            Err(ConfigError::Policy(PolicyError::UnrestrictedRole(_)))
        ));
    }

    #[test]
    fn invalid_gate_path_is_rejected() {
        let mut config = TrustConfig::default();
        config.gate.default_path = "dashboard".into();
        assert!(config.build_gate().is_err());
    }

    #[test]
    fn merge_overrides_only_non_defaults() {
        let mut base = TrustConfig::default();
        base.backend.base_url = "http://global".into();
        base.session.roleless = RolelessPolicy::Login;

        let mut overlay = TrustConfig::default();
        overlay.backend.timeout_ms = 500;
        overlay.gate.extra_public_paths = vec!["/ayuda".into()];

        base.merge(&overlay);
        assert_eq!(base.backend.base_url, "http://global");
        assert_eq!(base.backend.timeout_ms, 500);
        assert_eq!(base.session.roleless, RolelessPolicy::Login);
        assert_eq!(base.gate.extra_public_paths, vec!["/ayuda".to_string()]);
    }

    #[test]
    fn toml_round_trip_of_defaults() {
        let config = TrustConfig::default();
        let toml = config.to_toml().unwrap();
        assert_eq!(TrustConfig::from_toml(&toml).unwrap(), config);
    }
}
