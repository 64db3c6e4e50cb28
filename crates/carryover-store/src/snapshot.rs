use std::fmt;

use bytes::Bytes;
use carryover_config::is_content_id;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One file within a snapshot, as recorded at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFile {
  /// Path relative to the resource's `name/type` directory, `/`-separated.
  pub relative_path: String,
  /// Full file contents.
  pub contents: Bytes,
  /// POSIX mode bits (e.g. `0o644`).
  pub permissions: u32,
}

impl SnapshotFile {
  pub fn new(relative_path: impl Into<String>, contents: impl Into<Bytes>, permissions: u32) -> Self {
    Self {
      relative_path: relative_path.into(),
      contents: contents.into(),
      permissions,
    }
  }
}

/// The files associated with a resource at one content identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
  pub content_id: String,
  pub files: Vec<SnapshotFile>,
}

impl Snapshot {
  pub fn new(content_id: impl Into<String>, files: Vec<SnapshotFile>) -> Self {
    Self {
      content_id: content_id.into(),
      files,
    }
  }

  /// A snapshot with no files.
  pub fn empty(content_id: impl Into<String>) -> Self {
    Self::new(content_id, Vec::new())
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

/// Selects which snapshot of a resource to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotQuery {
  pub content_id: String,
}

impl SnapshotQuery {
  pub fn new(content_id: impl Into<String>) -> Self {
    Self {
      content_id: content_id.into(),
    }
  }

  /// Parse a query string of the form `sha=<content id>[&...]`.
  ///
  /// Returns `None` when `sha` is missing or repeated, or its value is not a
  /// valid content identifier.
  pub fn parse(query: &str) -> Option<Self> {
    let mut shas = query
      .split('&')
      .filter_map(|pair| pair.split_once('='))
      .filter(|(key, _)| *key == "sha")
      .map(|(_, value)| value);

    match (shas.next(), shas.next()) {
      (Some(value), None) if is_content_id(value) => Some(Self::new(value)),
      _ => None,
    }
  }
}

impl fmt::Display for SnapshotQuery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "sha={}", self.content_id)
  }
}

/// Decode a list-files payload.
///
/// An empty body or a JSON `null` decodes to no files.
pub fn decode_files(payload: &[u8]) -> Result<Vec<SnapshotFile>, serde_json::Error> {
  if payload.iter().all(u8::is_ascii_whitespace) {
    return Ok(Vec::new());
  }

  let files: Option<Vec<SnapshotFile>> = serde_json::from_slice(payload)?;
  Ok(files.unwrap_or_default())
}

/// Derive the content identifier of a set of files.
///
/// The digest covers every file's path, mode and contents in path order,
/// so the same tree always yields the same identifier regardless of the
/// order the files were collected in.
pub fn compute_content_id(files: &[SnapshotFile]) -> String {
  let mut ordered: Vec<&SnapshotFile> = files.iter().collect();
  ordered.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

  let mut hasher = Sha256::new();
  for file in ordered {
    hasher.update(file.relative_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(file.permissions.to_be_bytes());
    hasher.update((file.contents.len() as u64).to_be_bytes());
    hasher.update(&file.contents);
  }
  hex::encode(hasher.finalize())
}
