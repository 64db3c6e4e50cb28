//! Reapplies recorded permission bits to restored files.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::PermissionError;
use crate::filesystem::Filesystem;
use crate::layout::ResourceLayout;
use crate::pool::{PhaseOutcome, run_bounded};
use crate::report::FileOutcome;

/// Applies each restored file's mode, with the same concurrency and
/// fail-fast policy as the materializer.
pub struct PermissionApplier {
  filesystem: Arc<dyn Filesystem>,
  concurrency: usize,
}

impl PermissionApplier {
  pub fn new(filesystem: Arc<dyn Filesystem>, concurrency: usize) -> Self {
    Self {
      filesystem,
      concurrency: concurrency.max(1),
    }
  }

  /// Set the mode of every file in `files`.
  ///
  /// Only pass files written by the current run into `layout`. A file
  /// reached through a symbolic link is refused rather than changed.
  #[instrument(name = "apply_permissions", skip_all, fields(files = files.len()))]
  pub async fn apply(
    &self,
    layout: &ResourceLayout,
    files: &[FileOutcome],
  ) -> PhaseOutcome<PathBuf, PermissionError> {
    let jobs: Vec<(PathBuf, u32)> = files
      .iter()
      .map(|file| (file.path.clone(), file.mode))
      .collect();

    let filesystem = self.filesystem.clone();
    let layout = Arc::new(layout.clone());
    run_bounded(jobs, self.concurrency, move |(path, mode): (PathBuf, u32)| {
      let filesystem = filesystem.clone();
      let layout = layout.clone();
      async move {
        match layout.find_symlink(&path).await {
          Ok(None) => {}
          Ok(Some(link)) => {
            warn!(path = %path.display(), link = %link.display(), "symbolic link in restore path");
            return Err(PermissionError::Symlink { path, link });
          }
          Err(source) => return Err(PermissionError::Inspect { path, source }),
        }

        match filesystem.set_mode(&path, mode).await {
          Ok(()) => {
            debug!(path = %path.display(), mode = %format!("{:o}", mode), "mode applied");
            Ok(path)
          }
          Err(source) => Err(PermissionError::Apply { path, mode, source }),
        }
      }
    })
    .await
  }
}

#[cfg(all(test, unix))]
mod tests {
  use std::os::unix::fs::PermissionsExt;

  use carryover_config::Resource;

  use super::*;
  use crate::filesystem::LocalFilesystem;

  fn layout(workspace: &std::path::Path) -> ResourceLayout {
    ResourceLayout::new(workspace, &Resource::new("db-state", "state")).unwrap()
  }

  #[tokio::test]
  async fn test_apply_sets_modes() {
    let temp = tempfile::tempdir().unwrap();
    let layout = layout(temp.path());
    std::fs::create_dir_all(layout.root()).unwrap();
    let script = layout.root().join("run.sh");
    let notes = layout.root().join("notes.txt");
    std::fs::write(&script, "#!/bin/sh\n").unwrap();
    std::fs::write(&notes, "hi").unwrap();

    let files = vec![
      FileOutcome {
        relative_path: "run.sh".to_string(),
        path: script.clone(),
        mode: 0o750,
      },
      FileOutcome {
        relative_path: "notes.txt".to_string(),
        path: notes.clone(),
        mode: 0o600,
      },
    ];

    let outcome = PermissionApplier::new(Arc::new(LocalFilesystem), 10)
      .apply(&layout, &files)
      .await;

    assert!(outcome.is_success());
    let mode = |p: &PathBuf| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&script), 0o750);
    assert_eq!(mode(&notes), 0o600);
  }

  #[tokio::test]
  async fn test_apply_missing_file_fails() {
    let temp = tempfile::tempdir().unwrap();
    let layout = layout(temp.path());
    let files = vec![FileOutcome {
      relative_path: "gone.txt".to_string(),
      path: layout.root().join("gone.txt"),
      mode: 0o644,
    }];

    let outcome = PermissionApplier::new(Arc::new(LocalFilesystem), 10)
      .apply(&layout, &files)
      .await;

    let (_, first) = outcome.into_parts();
    assert!(matches!(first, Some(PermissionError::Apply { mode: 0o644, .. })));
  }

  #[tokio::test]
  async fn test_apply_refuses_symlinked_file() {
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("outside.txt");
    std::fs::write(&target, "x").unwrap();
    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o600)).unwrap();

    let layout = layout(&temp.path().join("ws"));
    std::fs::create_dir_all(layout.root()).unwrap();
    let link = layout.root().join("a.txt");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let files = vec![FileOutcome {
      relative_path: "a.txt".to_string(),
      path: link.clone(),
      mode: 0o777,
    }];
    let outcome = PermissionApplier::new(Arc::new(LocalFilesystem), 10)
      .apply(&layout, &files)
      .await;

    let (_, first) = outcome.into_parts();
    assert!(matches!(first, Some(PermissionError::Symlink { .. })));
    let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
  }
}
