//! Credential login against the backend.
//!
//! Endpoints are tried in order. A 404 means "not served here" and moves on
//! to the next one; any other failure status ends the attempt.

use crate::directory::{build_client, DirectoryError};
use crate::session::{SessionError, SessionStore};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use trust_types::SessionIdentity;

/// Message used when the backend gives no usable `error` string.
pub const DEFAULT_LOGIN_ERROR: &str = "could not sign in";

/// Login errors.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The backend refused the credentials, or no endpoint served login.
    #[error("{message}")]
    Rejected { message: String },

    /// An endpoint could not be reached.
    #[error("login request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The identity could not be stored.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// No endpoint is configured.
    #[error("no login endpoint configured")]
    NoEndpoints,

    /// Building the HTTP client failed.
    #[error(transparent)]
    Client(#[from] DirectoryError),
}

impl LoginError {
    /// Creates a Rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Posts credentials to the configured login endpoints.
#[derive(Debug, Clone)]
pub struct LoginClient {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

impl LoginClient {
    /// Creates a client for `endpoints`, tried in order.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::Client`] if the HTTP client cannot be built.
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Result<Self, LoginError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoints,
        })
    }

    /// Returns the endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Authenticates and returns the success payload (`{}` if not JSON).
    ///
    /// # Errors
    ///
    /// - [`LoginError::Rejected`] on a non-404 failure status, or when every
    ///   endpoint answered 404
    /// - [`LoginError::Transport`] if an endpoint is unreachable
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Value, LoginError> {
        if self.endpoints.is_empty() {
            return Err(LoginError::NoEndpoints);
        }

        let body = json!({ "email": email, "password": password });
        let mut message = DEFAULT_LOGIN_ERROR.to_string();

        for url in &self.endpoints {
            let response = self
                .client
                .post(url)
                .json(&body)
                .send()
                .await
                .map_err(|source| LoginError::Transport {
                    url: url.clone(),
                    source,
                })?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let payload = serde_json::from_str::<Value>(&text).ok();

            if status.is_success() {
                tracing::debug!(url = %url, "login accepted");
                return Ok(payload.unwrap_or_else(|| json!({})));
            }

            if status.as_u16() == 404 {
                tracing::debug!(url = %url, "login endpoint not found, trying next");
                continue;
            }

            if let Some(error) = payload
                .as_ref()
                .and_then(|p| p.get("error"))
                .and_then(Value::as_str)
                .filter(|e| !e.trim().is_empty())
            {
                message = error.to_string();
            }
            tracing::info!(url = %url, status = status.as_u16(), "login rejected");
            break;
        }

        Err(LoginError::rejected(message))
    }

    /// Authenticates and stores the session identity.
    ///
    /// Stores `payload.user` when it is an object with an email, else
    /// `{ email }` for a non-blank typed email. Returns what was stored.
    ///
    /// # Errors
    ///
    /// See [`authenticate`](Self::authenticate); storage failures are
    /// [`LoginError::Session`].
    pub async fn login(
        &self,
        store: &SessionStore,
        email: &str,
        password: &str,
    ) -> Result<Option<SessionIdentity>, LoginError> {
        let email = email.trim();
        let payload = self.authenticate(email, password).await?;

        let identity = payload
            .get("user")
            .and_then(SessionIdentity::from_value)
            .filter(|identity| !identity.email.trim().is_empty())
            .or_else(|| (!email.is_empty()).then(|| SessionIdentity::from_email(email)));

        if let Some(identity) = &identity {
            store.set_session(identity)?;
        }
        Ok(identity)
    }
}

/// Clears the stored session.
///
/// # Errors
///
/// Returns [`SessionError::Storage`] if the backend fails.
pub fn logout(store: &SessionStore) -> Result<(), SessionError> {
    store.clear_session()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SharedStorage;
    use crate::test_support::{MockBackend, MockResponse};

    fn store() -> SessionStore {
        SessionStore::new(SharedStorage::in_memory().context())
    }

    fn client(backend: &MockBackend, paths: &[&str]) -> LoginClient {
        let endpoints = paths
            .iter()
            .map(|p| format!("{}{p}", backend.base_url()))
            .collect();
        LoginClient::new(endpoints, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn falls_through_404_to_next_endpoint() {
        let backend = MockBackend::start(vec![(
            "/api/auth/login/",
            MockResponse::json(200, r#"{"user":{"email":"ana@example.com","id":5}}"#),
        )])
        .await;
        let client = client(&backend, &["/api/login/", "/api/auth/login/"]);
        let store = store();

        let identity = client
            .login(&store, " ana@example.com ", "secret")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.extra["id"], 5);
        assert_eq!(store.session_email(), "ana@example.com");

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, "POST");
        let sent: Value = serde_json::from_str(&requests[1].body).unwrap();
        assert_eq!(sent["email"], "ana@example.com");
        assert_eq!(sent["password"], "secret");
    }

    #[tokio::test]
    async fn non_404_failure_stops_with_backend_message() {
        let backend = MockBackend::start(vec![
            (
                "/api/login/",
                MockResponse::json(401, r#"{"error":"Credenciales inválidas"}"#),
            ),
            ("/api/auth/login/", MockResponse::json(200, "{}")),
        ])
        .await;
        let client = client(&backend, &["/api/login/", "/api/auth/login/"]);
        let store = store();

        let err = client.login(&store, "a@b.c", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Credenciales inválidas");
        assert_eq!(backend.requests().len(), 1);
        assert!(!store.has_session());
    }

    #[tokio::test]
    async fn blank_backend_error_uses_default_message() {
        let backend =
            MockBackend::start(vec![("/api/login/", MockResponse::json(500, r#"{"error":"  "}"#))])
                .await;
        let err = client(&backend, &["/api/login/"])
            .authenticate("a@b.c", "x")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), DEFAULT_LOGIN_ERROR);
    }

    #[tokio::test]
    async fn all_404_is_rejected() {
        let backend = MockBackend::start(vec![]).await;
        let err = client(&backend, &["/a/", "/b/"])
            .authenticate("a@b.c", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::Rejected { .. }));
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn payload_without_user_stores_typed_email() {
        let backend =
            MockBackend::start(vec![("/api/login/", MockResponse::json(200, r#"{"ok":true}"#))])
                .await;
        let store = store();
        let identity = client(&backend, &["/api/login/"])
            .login(&store, "ana@example.com", "x")
            .await
            .unwrap();
        assert_eq!(identity, Some(SessionIdentity::from_email("ana@example.com")));

        logout(&store).unwrap();
        assert!(!store.has_session());
    }

    #[tokio::test]
    async fn no_email_anywhere_stores_nothing() {
        let backend =
            MockBackend::start(vec![("/api/login/", MockResponse::json(200, "not json"))]).await;
        let store = store();
        let identity = client(&backend, &["/api/login/"])
            .login(&store, "", "x")
            .await
            .unwrap();
        assert!(identity.is_none());
        assert!(!store.has_session());
    }

    #[test]
    fn empty_endpoint_list() {
        let client = LoginClient::new(vec![], Duration::from_secs(1)).unwrap();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = rt.block_on(client.authenticate("a", "b")).unwrap_err();
        assert!(matches!(err, LoginError::NoEndpoints));
    }
}
