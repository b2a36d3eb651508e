//! Configuration loader with hierarchical merging.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Global config (`~/.trust/config.toml`)
//! 3. Project config (`.trust/config.toml`)
//! 4. Environment variables (`TRUST_*`, plus `BACKEND_BASE_URL`)
//!
//! Each layer overrides the previous. CLI flags are applied on top by a
//! [`ConfigResolver`](super::ConfigResolver).

use super::{default_config_path, ConfigError, TrustConfig, PROJECT_CONFIG_DIR, PROJECT_CONFIG_FILE};
use crate::resolver::IdentityFallback;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use trust_auth::RolelessPolicy;

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```no_run
/// use trust_runtime::config::ConfigLoader;
///
/// # fn main() -> Result<(), trust_runtime::config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_project_root("/path/to/project")
///     .load()?;
/// println!("backend: {}", config.base_url());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Global config file path (defaults to ~/.trust/config.toml).
    global_config_path: Option<PathBuf>,

    /// Project root directory.
    project_root: Option<PathBuf>,

    /// Replaces the process environment when set.
    env: Option<HashMap<String, String>>,

    /// Skip environment variable loading.
    skip_env: bool,

    /// Skip global config loading.
    skip_global: bool,

    /// Skip project config loading.
    skip_project: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom global config path.
    #[must_use]
    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Sets the project root directory.
    ///
    /// Project config will be loaded from `<project_root>/.trust/config.toml`.
    #[must_use]
    pub fn with_project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Reads environment overrides from `vars` instead of the process
    /// environment.
    #[must_use]
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Skips environment variable loading.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Skips global config loading.
    #[must_use]
    pub fn skip_global_config(mut self) -> Self {
        self.skip_global = true;
        self
    }

    /// Skips project config loading.
    #[must_use]
    pub fn skip_project_config(mut self) -> Self {
        self.skip_project = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any config file exists but cannot be parsed,
    /// or an environment variable holds an invalid value.
    /// Missing config files are silently ignored.
    pub fn load(&self) -> Result<TrustConfig, ConfigError> {
        let mut config = TrustConfig::default();

        // Layer 1: Global config
        if !self.skip_global {
            let global_path = self
                .global_config_path
                .clone()
                .unwrap_or_else(default_config_path);

            if let Some(global_config) = self.load_file(&global_path)? {
                debug!(path = %global_path.display(), "Loaded global config");
                config.merge(&global_config);
            }
        }

        // Layer 2: Project config
        if !self.skip_project {
            if let Some(ref project_root) = self.project_root {
                let project_config_path = project_root
                    .join(PROJECT_CONFIG_DIR)
                    .join(PROJECT_CONFIG_FILE);

                if let Some(project_config) = self.load_file(&project_config_path)? {
                    debug!(
                        path = %project_config_path.display(),
                        project = %project_root.display(),
                        "Loaded project config"
                    );
                    config.merge(&project_config);
                }
            }
        }

        // Layer 3: Environment variables
        if !self.skip_env {
            self.apply_env_vars(&mut config)?;
        }

        Ok(config)
    }

    /// Loads a config file, returning None if it doesn't exist.
    fn load_file(&self, path: &Path) -> Result<Option<TrustConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

        let config =
            TrustConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))?;

        Ok(Some(config))
    }

    fn var(&self, name: &str) -> Option<String> {
        match &self.env {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }

    /// Applies environment variable overrides.
    fn apply_env_vars(&self, config: &mut TrustConfig) -> Result<(), ConfigError> {
        if let Some(val) = self.var("TRUST_DEBUG") {
            config.debug = parse_bool(&val)
                .ok_or_else(|| ConfigError::invalid_env_var("TRUST_DEBUG", "expected bool"))?;
        }

        if let Some(val) = self
            .var("TRUST_BACKEND_URL")
            .or_else(|| self.var("BACKEND_BASE_URL"))
        {
            config.backend.base_url = val;
        }

        if let Some(val) = self.var("TRUST_BACKEND_TIMEOUT_MS") {
            config.backend.timeout_ms = val.trim().parse().map_err(|_| {
                ConfigError::invalid_env_var("TRUST_BACKEND_TIMEOUT_MS", "expected milliseconds")
            })?;
        }

        if let Some(val) = self.var("TRUST_STORAGE_PATH") {
            config.paths.storage_file = Some(PathBuf::from(val));
        }

        if let Some(val) = self.var("TRUST_IDENTITY_FALLBACK") {
            config.session.identity_fallback = parse_fallback(&val).ok_or_else(|| {
                ConfigError::invalid_env_var(
                    "TRUST_IDENTITY_FALLBACK",
                    "expected 'disabled' or 'first-active'",
                )
            })?;
        }

        if let Some(val) = self.var("TRUST_ROLELESS") {
            config.session.roleless = parse_roleless(&val).ok_or_else(|| {
                ConfigError::invalid_env_var("TRUST_ROLELESS", "expected 'allow' or 'login'")
            })?;
        }

        Ok(())
    }
}

/// Parses a boolean from string.
///
/// Accepts: "true", "false", "1", "0", "yes", "no", "on", "off" (case-insensitive).
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_fallback(s: &str) -> Option<IdentityFallback> {
    match s.trim().to_lowercase().as_str() {
        "disabled" | "off" | "none" => Some(IdentityFallback::Disabled),
        "first-active" | "first_active" => Some(IdentityFallback::FirstActive),
        _ => None,
    }
}

fn parse_roleless(s: &str) -> Option<RolelessPolicy> {
    match s.trim().to_lowercase().as_str() {
        "allow" => Some(RolelessPolicy::Allow),
        "login" => Some(RolelessPolicy::Login),
        _ => None,
    }
}
