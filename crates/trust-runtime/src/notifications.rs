//! Notification read-state and feed.
//!
//! Notification ids are `incident-{id}` and `visit-{id}`. The set of ids the
//! viewer has already read lives in storage as a JSON array of strings.

use crate::directory::{build_client, get_json, DirectoryError};
use crate::storage::{StorageContext, StorageError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

/// Storage key of the read-id set.
pub const READ_NOTIFICATIONS_KEY: &str = "read-notification-ids";

/// Same-context event dispatched after the read set changes.
pub const NOTIFICATIONS_EVENT: &str = "notifications-updated";

/// Returns the ids already read. Malformed storage reads as empty.
#[must_use]
pub fn read_ids(context: &StorageContext) -> BTreeSet<String> {
    let Ok(Some(raw)) = context.get_item(READ_NOTIFICATIONS_KEY) else {
        return BTreeSet::new();
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(id),
                _ => None,
            })
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Adds `ids` to the read set and notifies the context.
///
/// # Errors
///
/// Returns the [`StorageError`] if the write fails.
pub fn mark_as_read<I, S>(context: &StorageContext, ids: I) -> Result<(), StorageError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut current = read_ids(context);
    current.extend(ids.into_iter().map(Into::into));
    let json = serde_json::to_string(&current)?;
    context.set_item(READ_NOTIFICATIONS_KEY, &json)?;
    context.dispatch(NOTIFICATIONS_EVENT);
    Ok(())
}

/// Counts the ids in `ids` not yet read.
#[must_use]
pub fn unread_count<S: AsRef<str>>(context: &StorageContext, ids: &[S]) -> usize {
    let read = read_ids(context);
    ids.iter()
        .filter(|id| {
            let id: &str = (*id).as_ref();
            !read.contains(id)
        })
        .count()
}

#[derive(Debug, Deserialize)]
struct IdPage {
    #[serde(default)]
    results: Vec<IdOnly>,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: u64,
}

/// Fetches notification ids from the incidents and visits listings.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    client: reqwest::Client,
    base_url: String,
}

impl NotificationFeed {
    /// # Errors
    ///
    /// Returns [`DirectoryError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DirectoryError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns incident ids followed by visit ids.
    ///
    /// Both listings are fetched concurrently; either failing fails the call.
    pub async fn fetch_ids(&self) -> Result<Vec<String>, DirectoryError> {
        let incidents_url = format!("{}/api/incidents/", self.base_url);
        let visits_url = format!("{}/api/visits/", self.base_url);

        let (incidents, visits) = tokio::try_join!(
            get_json::<IdPage>(self.client.get(&incidents_url), &incidents_url),
            get_json::<IdPage>(self.client.get(&visits_url), &visits_url),
        )?;

        let ids = incidents
            .results
            .iter()
            .map(|item| format!("incident-{}", item.id))
            .chain(visits.results.iter().map(|item| format!("visit-{}", item.id)))
            .collect();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ContextSignal, SharedStorage};
    use crate::test_support::{MockBackend, MockResponse};

    #[test]
    fn malformed_read_set_is_empty() {
        let context = SharedStorage::in_memory().context();
        for raw in ["nope", "{}", "3"] {
            context.set_item(READ_NOTIFICATIONS_KEY, raw).unwrap();
            assert!(read_ids(&context).is_empty(), "{raw}");
        }

        context
            .set_item(READ_NOTIFICATIONS_KEY, r#"["visit-1", 2, null, "incident-3"]"#)
            .unwrap();
        let ids = read_ids(&context);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("incident-3"));
    }

    #[tokio::test]
    async fn mark_as_read_unions_and_notifies() {
        let context = SharedStorage::in_memory().context();
        let mut sub = context.subscribe();

        mark_as_read(&context, ["incident-1"]).unwrap();
        mark_as_read(&context, ["incident-1", "visit-2"]).unwrap();

        assert_eq!(sub.recv().await, Some(ContextSignal::Event(NOTIFICATIONS_EVENT.into())));
        assert_eq!(read_ids(&context).len(), 2);
        assert_eq!(
            unread_count(&context, &["incident-1", "visit-2", "visit-3"]),
            1
        );
    }

    #[tokio::test]
    async fn feed_prefixes_ids() {
        let backend = MockBackend::start(vec![
            ("/api/incidents/", MockResponse::json(200, r#"{"results":[{"id":4},{"id":9}]}"#)),
            ("/api/visits/", MockResponse::json(200, r#"{"results":[{"id":1}]}"#)),
        ])
        .await;
        let feed = NotificationFeed::new(backend.base_url(), Duration::from_secs(5)).unwrap();

        let ids = feed.fetch_ids().await.unwrap();
        assert_eq!(ids, vec!["incident-4", "incident-9", "visit-1"]);
    }

    #[tokio::test]
    async fn feed_fails_if_any_listing_fails() {
        let backend = MockBackend::start(vec![(
            "/api/incidents/",
            MockResponse::json(200, r#"{"results":[]}"#),
        )])
        .await;
        let feed = NotificationFeed::new(backend.base_url(), Duration::from_secs(5)).unwrap();

        let err = feed.fetch_ids().await.unwrap_err();
        assert!(matches!(err, DirectoryError::Status { status: 404, .. }));
    }
}
