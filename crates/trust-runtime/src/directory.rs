//! Remote user directory.
//!
//! The backend lists users at `GET {base}/api/users/`, scoped by the
//! `X-Current-User-Email` header. The response is a page:
//!
//! ```json
//! { "results": [ { "id": 1, "full_name": "Ana", "email": "ana@example.com",
//!                  "role": "inspector", "role_label": "Inspector", "is_active": true } ] }
//! ```

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use trust_types::{CurrentUser, UserDirectoryPage};

/// Header carrying the session email on directory requests.
pub const CURRENT_USER_HEADER: &str = "X-Current-User-Email";

/// Directory listing path, relative to the backend base URL.
pub const USERS_PATH: &str = "/api/users/";

/// Errors from a remote directory or listing endpoint.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The backend answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the expected JSON.
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Building the HTTP client failed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl DirectoryError {
    /// Creates a Status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Creates a Transport error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Creates a Decode error.
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for timeouts and connection failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            Self::Decode { .. } | Self::Client(_) => false,
        }
    }
}

/// Source of directory users.
pub trait UserDirectory: Send + Sync {
    /// Lists the users visible to `session_email` (`""` when logged out).
    fn list_users(
        &self,
        session_email: &str,
    ) -> impl Future<Output = Result<Vec<CurrentUser>, DirectoryError>> + Send;
}

/// Builds the shared reqwest client with a request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, DirectoryError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(DirectoryError::Client)
}

/// Sends a GET and decodes a JSON body, mapping every failure to
/// [`DirectoryError`].
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<T, DirectoryError> {
    let response = request
        .send()
        .await
        .map_err(|e| DirectoryError::transport(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DirectoryError::status(url, status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| DirectoryError::transport(url, e))?;
    serde_json::from_slice(&body).map_err(|e| DirectoryError::decode(url, e.to_string()))
}

/// Directory backed by the Trust HTTP API.
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    /// Creates a directory client for `base_url` (no trailing `/`).
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DirectoryError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the listing URL.
    #[must_use]
    pub fn users_url(&self) -> String {
        format!("{}{USERS_PATH}", self.base_url)
    }
}

impl UserDirectory for HttpUserDirectory {
    async fn list_users(&self, session_email: &str) -> Result<Vec<CurrentUser>, DirectoryError> {
        let url = self.users_url();
        let request = self
            .client
            .get(&url)
            .header(CURRENT_USER_HEADER, session_email);

        tracing::debug!(url = %url, "fetching user directory");
        let page: UserDirectoryPage = get_json(request, &url).await?;
        tracing::debug!(count = page.results.len(), "user directory fetched");
        Ok(page.results)
    }
}

/// Fixed in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: Vec<CurrentUser>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(users: Vec<CurrentUser>) -> Self {
        Self { users }
    }

    /// Loads users from a JSON file holding either a page or a bare array.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Decode`] if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DirectoryError::decode(&label, e.to_string()))?;
        Self::from_json(&content).map_err(|e| DirectoryError::decode(&label, e.to_string()))
    }

    /// Parses a page (`{ "results": [...] }`) or a bare array.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if neither shape matches.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<UserDirectoryPage>(content) {
            Ok(page) => Ok(Self::new(page.results)),
            Err(_) => serde_json::from_str::<Vec<CurrentUser>>(content).map(Self::new),
        }
    }

    /// Returns the users.
    #[must_use]
    pub fn users(&self) -> &[CurrentUser] {
        &self.users
    }
}

impl UserDirectory for StaticDirectory {
    async fn list_users(&self, _session_email: &str) -> Result<Vec<CurrentUser>, DirectoryError> {
        Ok(self.users.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockBackend, MockResponse};

    const PAGE: &str = r#"{"results":[
        {"id":1,"full_name":"Ana Ruiz","email":"ana@example.com","role":"inspector","is_active":true},
        {"id":2,"full_name":"Beto","email":"beto@example.com","role":"general_admin","is_active":false}
    ]}"#;

    #[tokio::test]
    async fn http_directory_sends_session_header() {
        let backend = MockBackend::start(vec![("/api/users/", MockResponse::json(200, PAGE))]).await;
        let directory =
            HttpUserDirectory::new(backend.base_url(), Duration::from_secs(5)).unwrap();

        let users = directory.list_users("ana@example.com").await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].full_name, "Ana Ruiz");

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].header("x-current-user-email").as_deref(),
            Some("ana@example.com")
        );
    }

    #[tokio::test]
    async fn http_directory_maps_status() {
        let backend =
            MockBackend::start(vec![("/api/users/", MockResponse::json(503, "{}"))]).await;
        let directory =
            HttpUserDirectory::new(backend.base_url(), Duration::from_secs(5)).unwrap();

        let err = directory.list_users("").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Status { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn http_directory_maps_bad_body() {
        let backend =
            MockBackend::start(vec![("/api/users/", MockResponse::json(200, "<html>"))]).await;
        let directory =
            HttpUserDirectory::new(backend.base_url(), Duration::from_secs(5)).unwrap();

        let err = directory.list_users("").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Decode { .. }));
    }

    #[tokio::test]
    async fn http_directory_maps_transport() {
        // Nothing listens on the discard port.
        let directory =
            HttpUserDirectory::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = directory.list_users("").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Transport { .. }));
    }

    #[test]
    fn static_directory_accepts_page_or_array() {
        let from_page = StaticDirectory::from_json(PAGE).unwrap();
        assert_eq!(from_page.users().len(), 2);

        let array = r#"[{"id":3,"full_name":"C","role":"branch_admin"}]"#;
        let from_array = StaticDirectory::from_json(array).unwrap();
        assert_eq!(from_array.users()[0].id, 3);

        assert!(StaticDirectory::from_json("42").is_err());
    }

    #[test]
    fn users_url_strips_trailing_slash() {
        let directory =
            HttpUserDirectory::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(directory.users_url(), "http://localhost:8000/api/users/");
    }
}
