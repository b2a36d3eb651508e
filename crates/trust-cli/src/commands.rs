//! Subcommand implementations.

use crate::Command;
use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch::Receiver;
use trust_auth::{
    mobile_items, resolve_active_path, shows_shell, sidebar_items, GateInput, IdentityState,
    NavItem, NavigationGate,
};
use trust_runtime::notifications::{mark_as_read, unread_count, NotificationFeed};
use trust_runtime::{
    logout, resolve_once, CurrentUserResolver, DirectoryError, HttpUserDirectory, LoginClient,
    MemoryRouter, NavigationGuard, Resolution, SessionStore, SharedStorage, StaticDirectory,
    TrustConfig, UserDirectory, SESSION_EVENT,
};
use trust_types::{CurrentUser, Role};

/// How often `watch` checks the storage file for writes by other processes.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub(crate) async fn run(command: Command, config: &TrustConfig) -> Result<()> {
    let storage_path = config.storage_path();
    let storage = SharedStorage::open_file(&storage_path)
        .with_context(|| format!("cannot open session storage {}", storage_path.display()))?;
    let store = SessionStore::new(storage.context());

    match command {
        Command::Login { email, password } => login(config, &store, &email, &password).await,
        Command::Logout => {
            logout(&store).context("cannot clear the session")?;
            println!("signed out");
            Ok(())
        }
        Command::Whoami {
            offline_users,
            json,
        } => whoami(config, &store, offline_users.as_deref(), json).await,
        Command::Check {
            path,
            role,
            no_user,
            assume_session,
            strict,
            offline_users,
        } => {
            let session_present = assume_session || store.has_session();
            let identity = match (role, no_user) {
                (Some(tag), _) => IdentityState::Resolved(Some(Role::parse(&tag))),
                (None, true) => IdentityState::Resolved(None),
                // Without a session the gate never looks at the identity.
                (None, false) if !session_present => IdentityState::Pending,
                (None, false) => resolve_identity(config, &store, offline_users.as_deref()).await?,
            };
            check(config, &path, session_present, &identity, strict)
        }
        Command::Nav {
            role,
            path,
            offline_users,
            json,
        } => {
            let role = match role {
                Some(tag) => Some(Role::parse(&tag)),
                None if store.has_session() => {
                    let identity =
                        resolve_identity(config, &store, offline_users.as_deref()).await?;
                    identity.role().cloned()
                }
                None => None,
            };
            nav(config, role.as_ref(), &path, json)
        }
        Command::Notifications { mark_read } => notifications(config, &store, mark_read).await,
        Command::Watch {
            path,
            offline_users,
            exit_after,
        } => {
            let directory = Arc::new(directory(config, offline_users.as_deref())?);
            let exit_after = exit_after.map(Duration::from_millis);
            watch(config, store, directory, path, exit_after).await
        }
    }
}

/// Directory source chosen on the command line.
enum Directory {
    Http(HttpUserDirectory),
    Offline(StaticDirectory),
}

impl UserDirectory for Directory {
    async fn list_users(&self, session_email: &str) -> Result<Vec<CurrentUser>, DirectoryError> {
        match self {
            Self::Http(directory) => directory.list_users(session_email).await,
            Self::Offline(directory) => directory.list_users(session_email).await,
        }
    }
}

fn directory(config: &TrustConfig, offline_users: Option<&Path>) -> Result<Directory> {
    match offline_users {
        Some(path) => Ok(Directory::Offline(StaticDirectory::from_json_file(path)?)),
        None => Ok(Directory::Http(HttpUserDirectory::new(
            config.base_url(),
            config.timeout(),
        )?)),
    }
}

/// Resolves the stored session to a gate identity.
///
/// A failed fetch is [`IdentityState::Unavailable`], not an error.
async fn resolve_identity(
    config: &TrustConfig,
    store: &SessionStore,
    offline_users: Option<&Path>,
) -> Result<IdentityState> {
    let directory = directory(config, offline_users)?;
    match resolve_once(store, &directory, config.session.identity_fallback).await {
        Ok(user) => Ok(IdentityState::Resolved(user.map(|user| user.role))),
        Err(e) => {
            tracing::warn!(error = %e, "user directory unavailable");
            Ok(IdentityState::Unavailable)
        }
    }
}

async fn login(
    config: &TrustConfig,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<()> {
    let client = LoginClient::new(config.login_endpoints(), config.timeout())?;
    match client.login(store, email, password).await? {
        Some(identity) => println!("signed in as {}", identity.email.trim()),
        None => println!("signed in (no session stored)"),
    }
    Ok(())
}

async fn whoami(
    config: &TrustConfig,
    store: &SessionStore,
    offline_users: Option<&Path>,
    as_json: bool,
) -> Result<()> {
    let email = store.session_email();
    let directory = directory(config, offline_users)?;
    let user = resolve_once(store, &directory, config.session.identity_fallback)
        .await
        .context("could not resolve the current user")?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    match user {
        Some(user) => {
            let email = user.email.as_deref().unwrap_or("-");
            println!("{} <{}> ({})", user.full_name, email, user.display_role());
        }
        None if email.is_empty() => println!("not signed in"),
        None => println!("{email} (no directory user)"),
    }
    Ok(())
}

fn check(
    config: &TrustConfig,
    path: &str,
    session_present: bool,
    identity: &IdentityState,
    strict: bool,
) -> Result<()> {
    let gate: NavigationGate = config.build_gate()?;
    let decision = gate.decide(&GateInput {
        path,
        session_present,
        identity,
    });
    println!("{decision}");

    if strict {
        decision.into_result(path)?;
    }
    Ok(())
}

fn nav(config: &TrustConfig, role: Option<&Role>, path: &str, as_json: bool) -> Result<()> {
    let table = config.build_policy()?;
    let sidebar = sidebar_items(&table, role);
    let mobile = mobile_items(&table, role);
    let active = resolve_active_path(path);

    if as_json {
        let out = json!({
            "role": role.map(Role::as_str),
            "active": active,
            "shell": shows_shell(path),
            "sidebar": sidebar,
            "mobile": mobile,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if !shows_shell(path) {
        println!("(no navigation shell on {path})");
        return Ok(());
    }
    print_items("sidebar", &sidebar, active);
    if !mobile.is_empty() {
        print_items("mobile", &mobile, active);
    }
    Ok(())
}

fn print_items(title: &str, items: &[NavItem], active: &str) {
    println!("{title}:");
    for item in items {
        let marker = if item.href == active { '*' } else { ' ' };
        println!("{marker} {:<28} {}", item.label, item.href);
    }
}

async fn notifications(config: &TrustConfig, store: &SessionStore, mark_read: bool) -> Result<()> {
    let feed = NotificationFeed::new(config.base_url(), config.timeout())?;
    let ids = feed
        .fetch_ids()
        .await
        .context("could not fetch notifications")?;

    if mark_read {
        mark_as_read(store.context(), ids.iter().cloned())?;
    }
    println!(
        "{} unread of {}",
        unread_count(store.context(), &ids),
        ids.len()
    );
    Ok(())
}

async fn watch(
    config: &TrustConfig,
    store: SessionStore,
    directory: Arc<Directory>,
    path: String,
    exit_after: Option<Duration>,
) -> Result<()> {
    let gate = config.build_gate()?;
    let resolver = CurrentUserResolver::spawn(
        store.clone(),
        directory,
        config.session.identity_fallback,
    );
    let mut resolutions = resolver.subscribe();
    let router = MemoryRouter::new(path);
    let mut route = router.subscribe();

    let mut guard = NavigationGuard::new(gate.clone(), store.clone(), resolver, router.clone());
    let paths = router.subscribe();
    let mut guard_task = tokio::spawn(async move { guard.run(paths).await });

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut last_email = store.session_email();
    let mut last_line = String::new();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let deadline = async {
        match exit_after {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut report = |resolutions: &Receiver<Resolution>| {
        let path = router.pathname();
        let resolution = resolutions.borrow().clone();
        let identity = resolution.identity_state();
        let decision = gate.decide(&GateInput {
            path: &path,
            session_present: store.has_session(),
            identity: &identity,
        });
        let line = format!("{path}: {decision} [{}]", describe(&resolution));
        if line != last_line {
            println!("{line}");
            last_line = line;
        }
    };

    report(&resolutions);
    loop {
        tokio::select! {
            changed = route.changed() => {
                if changed.is_err() {
                    break;
                }
                report(&resolutions);
            }
            changed = resolutions.changed() => {
                if changed.is_err() {
                    break;
                }
                report(&resolutions);
            }
            _ = ticker.tick() => {
                // Another process may have rewritten the storage file.
                let email = store.session_email();
                if email != last_email {
                    tracing::info!(email = %email, "session changed on disk");
                    last_email = email;
                    store.context().dispatch(SESSION_EVENT);
                    report(&resolutions);
                }
            }
            _ = &mut guard_task => break,
            _ = &mut deadline => break,
            _ = &mut shutdown => break,
        }
    }
    guard_task.abort();
    Ok(())
}

fn describe(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Loading => "loading".to_string(),
        Resolution::Resolved(Some(user)) => format!("{} ({})", user.full_name, user.role),
        Resolution::Resolved(None) => "no directory user".to_string(),
        Resolution::Failed(e) => format!("unavailable: {e}"),
    }
}
