//! Error types for resource synchronization.

use std::path::PathBuf;

use carryover_store::StoreError;
use thiserror::Error;
use tokio::task::JoinError;

/// The store could not produce a snapshot.
///
/// Never fatal: the synchronizer reports it and carries on as if the
/// snapshot were empty.
#[derive(Debug, Error)]
pub enum FetchError {
  /// A continuation was requested for a resource without a store identifier.
  #[error("resource '{resource}' has no resource id to fetch with")]
  MissingResourceId { resource: String },

  /// The content identifier cannot be carried in a store query.
  #[error("content id '{content_id}' contains characters not allowed in a query")]
  InvalidContentId { content_id: String },

  /// The store returned an error or could not be reached.
  #[error("failed to list files for resource '{resource_id}': {source}")]
  Store {
    resource_id: String,
    #[source]
    source: StoreError,
  },
}

/// A snapshot file could not be written into the workspace.
#[derive(Debug, Error)]
pub enum MaterializeError {
  /// The resource's name or type cannot be used as a directory name.
  #[error("invalid resource layout: {message}")]
  InvalidLayout { message: String },

  /// A relative path points outside the resource directory.
  #[error("path '{relative_path}' escapes the resource directory")]
  PathEscape { relative_path: String },

  /// A symbolic link sits on the way to a file in the workspace.
  #[error("refusing to write through symbolic link '{}'", .link.display())]
  Symlink { relative_path: String, link: PathBuf },

  /// The same relative path appears more than once in the snapshot.
  #[error("path '{relative_path}' appears more than once in the snapshot")]
  DuplicatePath { relative_path: String },

  /// Inspecting the path of a file failed.
  #[error("failed to inspect '{}': {source}", .path.display())]
  Inspect {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Writing the file failed.
  #[error("failed to write '{}': {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A write worker died before reporting a result.
  #[error("write worker failed: {message}")]
  Worker { message: String },
}

impl From<JoinError> for MaterializeError {
  fn from(e: JoinError) -> Self {
    Self::Worker {
      message: e.to_string(),
    }
  }
}

/// Recorded permission bits could not be applied to a written file.
#[derive(Debug, Error)]
pub enum PermissionError {
  /// Changing the mode failed.
  #[error("failed to set mode {mode:o} on '{}': {source}", .path.display())]
  Apply {
    path: PathBuf,
    mode: u32,
    #[source]
    source: std::io::Error,
  },

  /// A symbolic link sits on the way to a restored file.
  #[error("refusing to change mode through symbolic link '{}'", .link.display())]
  Symlink { path: PathBuf, link: PathBuf },

  /// Inspecting the path of a restored file failed.
  #[error("failed to inspect '{}': {source}", .path.display())]
  Inspect {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A permission worker died before reporting a result.
  #[error("permission worker failed: {message}")]
  Worker { message: String },
}

impl From<JoinError> for PermissionError {
  fn from(e: JoinError) -> Self {
    Self::Worker {
      message: e.to_string(),
    }
  }
}

/// Errors that fail a synchronization step.
///
/// Files written before the failure stay on disk; `written` lists them so
/// callers know the workspace may be partially restored.
#[derive(Debug, Error)]
pub enum SyncError {
  /// Materialization failed; permissions were not applied to any file.
  #[error("failed to restore files for resource '{resource}': {source}")]
  Materialize {
    resource: String,
    written: Vec<PathBuf>,
    #[source]
    source: MaterializeError,
  },

  /// Every file was written but applying permissions failed.
  #[error("failed to apply permissions for resource '{resource}': {source}")]
  Permission {
    resource: String,
    written: Vec<PathBuf>,
    #[source]
    source: PermissionError,
  },
}

impl SyncError {
  /// Files known to be on disk when the step failed.
  pub fn written(&self) -> &[PathBuf] {
    match self {
      Self::Materialize { written, .. } | Self::Permission { written, .. } => written,
    }
  }
}

/// Errors that can occur while capturing a resource directory.
#[derive(Debug, Error)]
pub enum CaptureError {
  /// The resource's name or type cannot be used as a directory name.
  #[error("invalid resource layout: {message}")]
  InvalidLayout { message: String },

  /// A path under the resource directory is not valid UTF-8.
  #[error("path '{}' is not valid UTF-8", .path.display())]
  NonUtf8Path { path: PathBuf },

  /// Reading the resource directory failed.
  #[error("failed to read '{}': {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
