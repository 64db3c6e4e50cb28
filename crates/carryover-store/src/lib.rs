//! Carryover Store
//!
//! This crate provides the state store trait, the snapshot wire types and a
//! filesystem-backed store for carryover.
//!
//! A store keeps, for every resource, the set of files captured at a given
//! content identifier. The synchronizer only ever reads from it through
//! [`StateStore::list_files_by_resource`], which hands back the raw payload;
//! decoding and validating the payload is the caller's job.
//!
//! [`FsStateStore`] keeps snapshots on the local filesystem and is used by
//! the command-line front end and in tests. A networked client would
//! implement the same trait.

mod fs;
mod snapshot;

pub use fs::FsStateStore;
pub use snapshot::{Snapshot, SnapshotFile, SnapshotQuery, compute_content_id, decode_files};

use async_trait::async_trait;
use bytes::Bytes;

/// Error type for state store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// No snapshot is stored for the resource at this content identifier.
  #[error("no snapshot for resource '{resource_id}' at '{content_id}'")]
  NotFound {
    resource_id: String,
    content_id: String,
  },

  /// The lookup query is not understood by the store.
  #[error("invalid query: {0}")]
  InvalidQuery(String),

  /// A resource or content identifier cannot be used as a storage key.
  #[error("invalid storage key: {0}")]
  InvalidKey(String),

  /// The store could not be reached or gave up (timeout, connection reset).
  #[error("store unavailable: {message}")]
  Unavailable { message: String },

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// A snapshot could not be encoded or decoded.
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl StoreError {
  pub fn unavailable(message: impl Into<String>) -> Self {
    Self::Unavailable {
      message: message.into(),
    }
  }
}

/// Client side of the state store.
///
/// Implementations own their transport, timeouts and retry policy.
#[async_trait]
pub trait StateStore: Send + Sync {
  /// List the files recorded for a resource.
  ///
  /// `query` selects the snapshot, e.g. `sha=<content id>` (see
  /// [`SnapshotQuery`]). The returned payload is a JSON array of
  /// [`SnapshotFile`]; it may be empty.
  async fn list_files_by_resource(
    &self,
    resource_id: &str,
    query: &str,
  ) -> Result<Bytes, StoreError>;
}
