//! Snapshot lookup against the state store.

use carryover_config::{Resource, is_content_id};
use carryover_store::{Snapshot, SnapshotQuery, StateStore, decode_files};
use tracing::{debug, instrument, warn};

use crate::console::Console;
use crate::error::FetchError;

/// Fetch the snapshot of `resource` selected by `query`.
///
/// An empty or malformed payload yields an empty snapshot. A failure to talk
/// to the store, or a resource or query the store cannot be asked about, is
/// an error.
#[instrument(
  name = "snapshot_fetch",
  skip(store, console, resource, query),
  fields(resource = %resource.name, resource_id = %resource.resource_id, query = %query)
)]
pub async fn fetch_snapshot(
  store: &dyn StateStore,
  console: &dyn Console,
  resource: &Resource,
  query: &SnapshotQuery,
) -> Result<Snapshot, FetchError> {
  if resource.resource_id.is_empty() {
    return Err(FetchError::MissingResourceId {
      resource: resource.name.clone(),
    });
  }

  if !is_content_id(&query.content_id) {
    return Err(FetchError::InvalidContentId {
      content_id: query.content_id.clone(),
    });
  }

  debug!("listing files");

  let payload = store
    .list_files_by_resource(&resource.resource_id, &query.to_string())
    .await
    .map_err(|e| FetchError::Store {
      resource_id: resource.resource_id.clone(),
      source: e,
    })?;

  let files = match decode_files(&payload) {
    Ok(files) => files,
    Err(e) => {
      warn!(
        error = %e,
        payload_bytes = payload.len(),
        "malformed file list, treating as empty"
      );
      Vec::new()
    }
  };

  if files.is_empty() {
    console.publish_message(&format!("No files found for resource {}", resource.name));
  } else {
    console.publish_message(&format!(
      "Found {} file(s) for resource {}",
      files.len(),
      resource.name
    ));
  }

  Ok(Snapshot::new(query.content_id.clone(), files))
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use async_trait::async_trait;
  use bytes::Bytes;
  use carryover_store::StoreError;
  use tokio::sync::mpsc;

  use super::*;
  use crate::console::{ChannelConsole, ConsoleEvent, NoopConsole};

  /// Store stub that replays a canned response and records queries.
  struct CannedStore {
    response: Mutex<Option<Result<Bytes, StoreError>>>,
    queries: Mutex<Vec<(String, String)>>,
  }

  impl CannedStore {
    fn new(response: Result<Bytes, StoreError>) -> Self {
      Self {
        response: Mutex::new(Some(response)),
        queries: Mutex::new(Vec::new()),
      }
    }
  }

  #[async_trait]
  impl StateStore for CannedStore {
    async fn list_files_by_resource(
      &self,
      resource_id: &str,
      query: &str,
    ) -> Result<Bytes, StoreError> {
      self
        .queries
        .lock()
        .unwrap()
        .push((resource_id.to_string(), query.to_string()));
      self
        .response
        .lock()
        .unwrap()
        .take()
        .unwrap_or_else(|| Ok(Bytes::new()))
    }
  }

  fn resource() -> Resource {
    Resource::new("db-state", "state")
      .with_resource_id("res-42")
      .with_prior_content_id("abc123")
  }

  fn query() -> SnapshotQuery {
    SnapshotQuery::new("abc123")
  }

  #[tokio::test]
  async fn test_fetch_decodes_files() {
    let store = CannedStore::new(Ok(Bytes::from_static(
      br#"[{"relativePath":"a.txt","contents":[104,101,108,108,111],"permissions":420}]"#,
    )));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let snapshot = fetch_snapshot(&store, &ChannelConsole::new(tx), &resource(), &query())
      .await
      .unwrap();

    assert_eq!(snapshot.content_id, "abc123");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.files[0].contents, Bytes::from_static(b"hello"));
    assert_eq!(
      store.queries.lock().unwrap().as_slice(),
      &[("res-42".to_string(), "sha=abc123".to_string())]
    );
    assert_eq!(
      rx.try_recv().unwrap(),
      ConsoleEvent::Message {
        text: "Found 1 file(s) for resource db-state".to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_fetch_empty_payload_is_empty_snapshot() {
    let store = CannedStore::new(Ok(Bytes::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let snapshot = fetch_snapshot(&store, &ChannelConsole::new(tx), &resource(), &query())
      .await
      .unwrap();

    assert!(snapshot.is_empty());
    assert_eq!(
      rx.try_recv().unwrap(),
      ConsoleEvent::Message {
        text: "No files found for resource db-state".to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_fetch_malformed_payload_is_empty_snapshot() {
    let store = CannedStore::new(Ok(Bytes::from_static(b"<html>502</html>")));

    let snapshot = fetch_snapshot(&store, &NoopConsole, &resource(), &query())
      .await
      .unwrap();

    assert!(snapshot.is_empty());
  }

  #[tokio::test]
  async fn test_fetch_store_failure() {
    let store = CannedStore::new(Err(StoreError::unavailable("timed out")));

    let err = fetch_snapshot(&store, &NoopConsole, &resource(), &query())
      .await
      .unwrap_err();

    match err {
      FetchError::Store { resource_id, source } => {
        assert_eq!(resource_id, "res-42");
        assert!(matches!(source, StoreError::Unavailable { .. }));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn test_fetch_requires_resource_id() {
    let store = CannedStore::new(Ok(Bytes::new()));
    let resource = Resource::new("db-state", "state").with_prior_content_id("abc123");

    let err = fetch_snapshot(&store, &NoopConsole, &resource, &query())
      .await
      .unwrap_err();

    assert!(matches!(err, FetchError::MissingResourceId { .. }));
    assert!(store.queries.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_fetch_rejects_query_breaking_content_id() {
    let store = CannedStore::new(Ok(Bytes::new()));

    let err = fetch_snapshot(
      &store,
      &NoopConsole,
      &resource(),
      &SnapshotQuery::new("abc&sha=other"),
    )
    .await
    .unwrap_err();

    assert!(matches!(
      err,
      FetchError::InvalidContentId { ref content_id } if content_id == "abc&sha=other"
    ));
    assert!(store.queries.lock().unwrap().is_empty());
  }
}
