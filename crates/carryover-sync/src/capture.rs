//! Records a resource directory as a snapshot for the next run.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use carryover_config::Resource;
use carryover_store::{Snapshot, SnapshotFile, compute_content_id};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::CaptureError;
use crate::layout::ResourceLayout;

/// Capture every regular file under `workspace_root/<name>/<type>`.
///
/// Symlinks are skipped. A missing resource directory captures as an empty
/// snapshot. The content identifier is derived from the captured files, so
/// an unchanged directory always captures to the same identifier.
#[instrument(
  name = "resource_capture",
  skip(workspace_root, resource),
  fields(resource = %resource.name, resource_type = %resource.resource_type)
)]
pub async fn capture(workspace_root: &Path, resource: &Resource) -> Result<Snapshot, CaptureError> {
  let layout =
    ResourceLayout::new(workspace_root, resource).map_err(|e| CaptureError::InvalidLayout {
      message: e.to_string(),
    })?;

  let mut files = Vec::new();
  match fs::metadata(layout.root()).await {
    Ok(metadata) if metadata.is_dir() => {
      collect_files(layout.root(), layout.root(), &mut files).await?;
    }
    Ok(_) => {}
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
    Err(source) => {
      return Err(CaptureError::Io {
        path: layout.root().to_path_buf(),
        source,
      });
    }
  }

  files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
  let content_id = compute_content_id(&files);

  info!(content_id = %content_id, files = files.len(), "resource captured");
  Ok(Snapshot::new(content_id, files))
}

/// Recursively collect regular files below `dir`.
async fn collect_files(
  root: &Path,
  dir: &Path,
  files: &mut Vec<SnapshotFile>,
) -> Result<(), CaptureError> {
  let io_error = |path: &Path| {
    let path = path.to_path_buf();
    move |source| CaptureError::Io { path, source }
  };

  let mut entries = fs::read_dir(dir).await.map_err(io_error(dir))?;
  while let Some(entry) = entries.next_entry().await.map_err(io_error(dir))? {
    let path = entry.path();
    let file_type = entry.file_type().await.map_err(io_error(&path))?;

    if file_type.is_dir() {
      Box::pin(collect_files(root, &path, files)).await?;
    } else if file_type.is_file() {
      let contents = fs::read(&path).await.map_err(io_error(&path))?;
      let metadata = entry.metadata().await.map_err(io_error(&path))?;
      files.push(SnapshotFile {
        relative_path: relative_path(root, &path)?,
        contents: Bytes::from(contents),
        permissions: mode_of(&metadata),
      });
    } else {
      debug!(path = %path.display(), "skipping non-regular file");
    }
  }

  Ok(())
}

/// `/`-separated path of `path` below `root`.
fn relative_path(root: &Path, path: &Path) -> Result<String, CaptureError> {
  let non_utf8 = || CaptureError::NonUtf8Path {
    path: PathBuf::from(path),
  };

  let relative = path.strip_prefix(root).map_err(|_| non_utf8())?;
  let segments = relative
    .components()
    .map(|c| c.as_os_str().to_str().ok_or_else(non_utf8))
    .collect::<Result<Vec<_>, _>>()?;
  Ok(segments.join("/"))
}

#[cfg(unix)]
fn mode_of(metadata: &std::fs::Metadata) -> u32 {
  use std::os::unix::fs::PermissionsExt;
  metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(metadata: &std::fs::Metadata) -> u32 {
  if metadata.permissions().readonly() {
    0o444
  } else {
    0o644
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn resource() -> Resource {
    Resource::new("db-state", "state").with_resource_id("res-42")
  }

  #[tokio::test]
  async fn test_capture_missing_directory_is_empty() {
    let temp = tempfile::tempdir().unwrap();

    let snapshot = capture(temp.path(), &resource()).await.unwrap();
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.content_id, compute_content_id(&[]));
  }

  #[tokio::test]
  async fn test_capture_nested_files() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("db-state").join("state");
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    std::fs::write(dir.join("a.txt"), "hello").unwrap();
    std::fs::write(dir.join("sub").join("b.txt"), "world").unwrap();

    let snapshot = capture(temp.path(), &resource()).await.unwrap();

    let paths: Vec<&str> = snapshot
      .files
      .iter()
      .map(|f| f.relative_path.as_str())
      .collect();
    assert_eq!(paths, vec!["a.txt", "sub/b.txt"]);
    assert_eq!(snapshot.files[1].contents, Bytes::from_static(b"world"));
  }

  #[tokio::test]
  async fn test_capture_is_stable() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("db-state").join("state");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("counter"), "41").unwrap();

    let first = capture(temp.path(), &resource()).await.unwrap();
    let second = capture(temp.path(), &resource()).await.unwrap();
    assert_eq!(first.content_id, second.content_id);

    std::fs::write(dir.join("counter"), "42").unwrap();
    let changed = capture(temp.path(), &resource()).await.unwrap();
    assert_ne!(first.content_id, changed.content_id);
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_capture_records_mode() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("db-state").join("state");
    std::fs::create_dir_all(&dir).unwrap();
    let script = dir.join("run.sh");
    std::fs::write(&script, "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let snapshot = capture(temp.path(), &resource()).await.unwrap();
    assert_eq!(snapshot.files[0].permissions, 0o755);
  }
}
