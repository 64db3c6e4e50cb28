use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use carryover_config::{is_content_id, is_path_segment};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::snapshot::{Snapshot, SnapshotQuery, decode_files};
use crate::{StateStore, StoreError};

/// Filesystem-based state store.
///
/// Snapshots are stored as JSON file lists:
/// ```text
/// {root}/
/// └── res-42/
///     ├── 3f1c...e9.json
///     └── 8a02...41.json
/// ```
/// Each file name is the snapshot's content identifier.
pub struct FsStateStore {
  root: PathBuf,
}

impl FsStateStore {
  /// Create a new filesystem store at the given root path.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Get the root directory of the store.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn snapshot_path(&self, resource_id: &str, content_id: &str) -> Result<PathBuf, StoreError> {
    if !is_path_segment(resource_id) {
      return Err(StoreError::InvalidKey(format!("resource id '{}'", resource_id)));
    }
    if !is_content_id(content_id) {
      return Err(StoreError::InvalidKey(format!("content id '{}'", content_id)));
    }

    Ok(
      self
        .root
        .join(resource_id)
        .join(format!("{}.json", content_id)),
    )
  }

  async fn read_payload(&self, resource_id: &str, content_id: &str) -> Result<Bytes, StoreError> {
    let path = self.snapshot_path(resource_id, content_id)?;
    let payload = fs::read(&path).await.map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        StoreError::NotFound {
          resource_id: resource_id.to_string(),
          content_id: content_id.to_string(),
        }
      } else {
        StoreError::Io(e)
      }
    })?;
    Ok(Bytes::from(payload))
  }

  /// Store a snapshot for a resource, replacing any snapshot with the same
  /// content identifier.
  pub async fn put_snapshot(&self, resource_id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
    let path = self.snapshot_path(resource_id, &snapshot.content_id)?;
    let payload = serde_json::to_vec(&snapshot.files)?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    // Write beside the target and rename so readers never see a torn file.
    let staging = path.with_extension("json.partial");
    let mut file = fs::File::create(&staging).await?;
    file.write_all(&payload).await?;
    file.flush().await?;
    drop(file);
    fs::rename(&staging, &path).await?;

    debug!(
      resource_id = %resource_id,
      content_id = %snapshot.content_id,
      files = snapshot.len(),
      "snapshot stored"
    );
    Ok(())
  }

  /// Load a stored snapshot.
  pub async fn get_snapshot(&self, resource_id: &str, content_id: &str) -> Result<Snapshot, StoreError> {
    let payload = self.read_payload(resource_id, content_id).await?;
    let files = decode_files(&payload)?;
    Ok(Snapshot::new(content_id, files))
  }
}

#[async_trait]
impl StateStore for FsStateStore {
  async fn list_files_by_resource(
    &self,
    resource_id: &str,
    query: &str,
  ) -> Result<Bytes, StoreError> {
    let query =
      SnapshotQuery::parse(query).ok_or_else(|| StoreError::InvalidQuery(query.to_string()))?;
    self.read_payload(resource_id, &query.content_id).await
  }
}
