//! Writes snapshot files into the workspace.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use carryover_store::Snapshot;
use tracing::{debug, instrument, warn};

use crate::error::MaterializeError;
use crate::filesystem::Filesystem;
use crate::layout::ResourceLayout;
use crate::pool::{PhaseOutcome, run_bounded};
use crate::report::FileOutcome;

/// A validated write: where a snapshot file goes and what goes there.
#[derive(Debug, Clone)]
struct PlannedWrite {
  relative_path: String,
  path: PathBuf,
  contents: Bytes,
  mode: u32,
}

/// Writes every file of a snapshot under a resource directory.
pub struct Materializer {
  filesystem: Arc<dyn Filesystem>,
  concurrency: usize,
}

impl Materializer {
  /// Create a materializer allowing `concurrency` writes in flight.
  pub fn new(filesystem: Arc<dyn Filesystem>, concurrency: usize) -> Self {
    Self {
      filesystem,
      concurrency: concurrency.max(1),
    }
  }

  /// Write the snapshot's files.
  ///
  /// Every path is validated before the first write, so a snapshot with an
  /// escaping or repeated path, or one reaching a symbolic link already in
  /// the workspace, writes nothing. After that the first failed write stops
  /// further writes; files already written stay on disk.
  #[instrument(
    name = "materialize",
    skip_all,
    fields(content_id = %snapshot.content_id, files = snapshot.len())
  )]
  pub async fn materialize(
    &self,
    layout: &ResourceLayout,
    snapshot: &Snapshot,
  ) -> PhaseOutcome<FileOutcome, MaterializeError> {
    let writes = match plan(layout, snapshot) {
      Ok(writes) => writes,
      Err(e) => return PhaseOutcome::failed(e),
    };
    if let Err(e) = reject_symlinks(layout, &writes).await {
      return PhaseOutcome::failed(e);
    }

    let filesystem = self.filesystem.clone();
    run_bounded(writes, self.concurrency, move |write: PlannedWrite| {
      let filesystem = filesystem.clone();
      async move {
        filesystem
          .write_file(&write.path, write.contents)
          .await
          .map_err(|source| MaterializeError::Write {
            path: write.path.clone(),
            source,
          })?;
        debug!(path = %write.path.display(), "file written");

        Ok(FileOutcome {
          relative_path: write.relative_path,
          path: write.path,
          mode: write.mode,
        })
      }
    })
    .await
  }
}

/// Resolve every snapshot path, rejecting escapes and duplicates.
fn plan(layout: &ResourceLayout, snapshot: &Snapshot) -> Result<Vec<PlannedWrite>, MaterializeError> {
  let mut seen = HashSet::with_capacity(snapshot.len());
  let mut writes = Vec::with_capacity(snapshot.len());

  for file in &snapshot.files {
    let path = layout.resolve(&file.relative_path)?;
    if !seen.insert(path.clone()) {
      return Err(MaterializeError::DuplicatePath {
        relative_path: file.relative_path.clone(),
      });
    }

    writes.push(PlannedWrite {
      relative_path: file.relative_path.clone(),
      path,
      contents: file.contents.clone(),
      mode: file.permissions,
    });
  }

  Ok(writes)
}

/// Refuse writes that would follow a symbolic link out of the resource
/// directory.
async fn reject_symlinks(
  layout: &ResourceLayout,
  writes: &[PlannedWrite],
) -> Result<(), MaterializeError> {
  for write in writes {
    let link = layout
      .find_symlink(&write.path)
      .await
      .map_err(|source| MaterializeError::Inspect {
        path: write.path.clone(),
        source,
      })?;
    if let Some(link) = link {
      warn!(path = %write.path.display(), link = %link.display(), "symbolic link in restore path");
      return Err(MaterializeError::Symlink {
        relative_path: write.relative_path.clone(),
        link,
      });
    }
  }
  Ok(())
}
