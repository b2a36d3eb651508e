//! Directory users and session identities.

use crate::Role;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The locally persisted "who is logged in" record.
///
/// Only `email` is required. Anything else the login endpoint returned is
/// kept verbatim in `extra` so it round-trips through storage unchanged.
///
/// # Example
///
/// ```
/// use trust_types::SessionIdentity;
///
/// let identity: SessionIdentity =
///     serde_json::from_str(r#"{"email":"ana@example.com","id":7}"#).unwrap();
/// assert_eq!(identity.email, "ana@example.com");
/// assert_eq!(identity.extra["id"], 7);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionIdentity {
    /// Creates the minimal `{ email }` identity.
    #[must_use]
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            extra: Map::new(),
        }
    }

    /// Builds an identity from an arbitrary JSON value.
    ///
    /// Returns `None` unless the value is an object with a string `email`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let email = object.get("email")?.as_str()?.to_string();
        let extra = object
            .iter()
            .filter(|(key, _)| key.as_str() != "email")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Some(Self { email, extra })
    }

    /// Email, trimmed and lowercased for comparisons.
    #[must_use]
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

/// A user as returned by the remote directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: u64,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub role_label: String,
    #[serde(default)]
    pub is_active: bool,
}

impl CurrentUser {
    /// Returns `true` if this user's email matches `email` after trimming,
    /// ignoring case. An empty `email` never matches.
    #[must_use]
    pub fn email_matches(&self, email: &str) -> bool {
        let wanted = normalize_email(email);
        if wanted.is_empty() {
            return false;
        }
        self.email
            .as_deref()
            .is_some_and(|own| normalize_email(own) == wanted)
    }

    /// Up to two uppercase initials of `full_name`, or `"?"`.
    #[must_use]
    pub fn initials(&self) -> String {
        let initials: String = self
            .full_name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase();
        if initials.is_empty() {
            "?".to_string()
        } else {
            initials
        }
    }

    /// Role label to display; falls back to the role's own label.
    #[must_use]
    pub fn display_role(&self) -> &str {
        if self.role_label.trim().is_empty() {
            self.role.label()
        } else {
            &self.role_label
        }
    }
}

/// `{ "results": [...] }` page returned by the directory endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDirectoryPage {
    #[serde(default)]
    pub results: Vec<CurrentUser>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
