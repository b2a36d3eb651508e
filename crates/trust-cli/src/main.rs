//! Trust CLI - navigation gate and session tooling for the Trust dashboard
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`TRUST_*`)
//! 3. Project config (`.trust/config.toml` in the project root)
//! 4. Global config (`~/.trust/config.toml`)
//! 5. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `TRUST_DEBUG`: Enable debug mode (`true`/`false`)
//! - `TRUST_BACKEND_URL`: Backend base URL (`BACKEND_BASE_URL` is also read)
//! - `TRUST_BACKEND_TIMEOUT_MS`: Request timeout
//! - `TRUST_STORAGE_PATH`: Session storage file
//! - `TRUST_IDENTITY_FALLBACK`: `disabled` or `first-active`
//! - `TRUST_ROLELESS`: `allow` or `login`
//! - `TRUST_PASSWORD`: Password for `trust login`

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use trust_runtime::{ConfigError, ConfigLoader, ConfigResolver, TrustConfig};

/// Trust CLI - navigation gate and session tooling
#[derive(Parser, Debug)]
#[command(name = "trust")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    project: Option<PathBuf>,

    /// Session storage file (also: TRUST_STORAGE_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    storage: Option<PathBuf>,

    /// Backend base URL (also: TRUST_BACKEND_URL)
    #[arg(long, global = true, value_name = "URL")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "TRUST_PASSWORD", hide_env_values = true, default_value = "")]
        password: String,
    },

    /// Clear the stored session
    Logout,

    /// Show the user behind the stored session
    Whoami {
        /// Read directory users from a JSON file instead of the backend
        #[arg(long, value_name = "FILE")]
        offline_users: Option<PathBuf>,

        /// Print the user as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decide whether a path may be visited
    Check {
        /// Requested path, e.g. `/clientes/visitas`
        path: String,

        /// Use this role instead of resolving the session
        #[arg(long, conflicts_with = "no_user")]
        role: Option<String>,

        /// Treat the session as having no directory user
        #[arg(long)]
        no_user: bool,

        /// Treat a session as present even if none is stored
        #[arg(long)]
        assume_session: bool,

        /// Exit with an error when the decision is a redirect
        #[arg(long)]
        strict: bool,

        #[arg(long, value_name = "FILE")]
        offline_users: Option<PathBuf>,
    },

    /// Show the navigation entries visible to a role
    Nav {
        /// Use this role instead of resolving the session
        #[arg(long)]
        role: Option<String>,

        /// Current path, used to mark the active entry
        #[arg(long, default_value = trust_auth::DEFAULT_AUTHENTICATED_PATH)]
        path: String,

        #[arg(long, value_name = "FILE")]
        offline_users: Option<PathBuf>,

        /// Print the entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count unread incident and visit notifications
    Notifications {
        /// Mark every fetched notification as read
        #[arg(long)]
        mark_read: bool,
    },

    /// Follow the session and report gate decisions until Ctrl-C
    Watch {
        /// Path the simulated router starts at
        #[arg(long, default_value = trust_auth::DEFAULT_AUTHENTICATED_PATH)]
        path: String,

        #[arg(long, value_name = "FILE")]
        offline_users: Option<PathBuf>,

        /// Stop after this many milliseconds
        #[arg(long, value_name = "MS")]
        exit_after: Option<u64>,
    },
}

/// CLI-based configuration resolver.
///
/// Merges file/env config via [`ConfigLoader`] and applies CLI argument
/// overrides as the highest-priority layer.
struct CliConfigResolver {
    project_root: PathBuf,
    debug: bool,
    storage: Option<PathBuf>,
    backend: Option<String>,
}

impl CliConfigResolver {
    fn from_args(args: &Args) -> Self {
        let project_root = args.project.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to get current directory, using '.'");
                PathBuf::from(".")
            })
        });

        Self {
            project_root,
            debug: args.debug,
            storage: args.storage.clone(),
            backend: args.backend.clone(),
        }
    }
}

impl ConfigResolver for CliConfigResolver {
    fn resolve(&self) -> Result<TrustConfig, ConfigError> {
        let mut config = ConfigLoader::new()
            .with_project_root(&self.project_root)
            .load()?;

        // CLI args override (highest priority)
        if self.debug {
            config.debug = true;
        }
        if let Some(ref p) = self.storage {
            config.paths.storage_file = Some(p.clone());
        }
        if let Some(ref url) = self.backend {
            config.backend.base_url.clone_from(url);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let resolver = CliConfigResolver::from_args(&args);

    let config = resolver
        .resolve()
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))?;

    // Terminal filter: --debug > --verbose > RUST_LOG env > default "warn".
    // Logs go to stderr; stdout carries command output only.
    let terminal_filter = if args.debug || config.debug {
        EnvFilter::new("debug,hyper=warn,h2=warn,reqwest=warn,rustls=warn,tokio=warn")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(terminal_filter),
        )
        .init();

    info!(path = %resolver.project_root.display(), "Project root");
    info!(path = %config.storage_path().display(), "Session storage");

    commands::run(args.command, &config).await
}
