//! Synchronization results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a synchronization ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
  /// First run for the resource; nothing was fetched.
  Bootstrap,

  /// The store could not provide the snapshot; nothing was written.
  Unavailable { content_id: String, reason: String },

  /// The snapshot holds no files.
  Empty { content_id: String },

  /// Every file was written and its permissions applied.
  Restored { content_id: String },
}

/// A file restored into the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
  /// Path as recorded in the snapshot.
  pub relative_path: String,
  /// Location in the workspace.
  pub path: PathBuf,
  /// Permission bits applied to the file.
  pub mode: u32,
}

/// Result of a successful synchronization step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
  /// Resource name.
  pub resource: String,
  pub outcome: SyncOutcome,
  /// Restored files, ordered by relative path.
  pub files: Vec<FileOutcome>,
}

impl SyncReport {
  pub(crate) fn without_files(resource: &str, outcome: SyncOutcome) -> Self {
    Self {
      resource: resource.to_string(),
      outcome,
      files: Vec::new(),
    }
  }

  pub(crate) fn restored(resource: &str, content_id: &str, mut files: Vec<FileOutcome>) -> Self {
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Self {
      resource: resource.to_string(),
      outcome: SyncOutcome::Restored {
        content_id: content_id.to_string(),
      },
      files,
    }
  }

  /// Number of files written into the workspace.
  pub fn files_restored(&self) -> usize {
    self.files.len()
  }
}
