//! Where a resource's files live inside a workspace.

use std::io;
use std::path::{Component, Path, PathBuf};

use carryover_config::{Resource, is_path_segment};
use tokio::fs;

use crate::error::MaterializeError;

/// The directory a resource's files are restored into:
/// `workspace_root/<name>/<type>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLayout {
  workspace_root: PathBuf,
  root: PathBuf,
}

impl ResourceLayout {
  pub fn new(workspace_root: &Path, resource: &Resource) -> Result<Self, MaterializeError> {
    for (what, segment) in [("name", &resource.name), ("type", &resource.resource_type)] {
      if !is_path_segment(segment) {
        return Err(MaterializeError::InvalidLayout {
          message: format!("resource {} '{}' is not a single path segment", what, segment),
        });
      }
    }

    Ok(Self {
      workspace_root: workspace_root.to_path_buf(),
      root: workspace_root
        .join(&resource.name)
        .join(&resource.resource_type),
    })
  }

  /// The resource directory.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Map a snapshot-relative path to its location in the workspace.
  ///
  /// `.` segments are dropped. Absolute paths, `..` segments and paths that
  /// name no file are rejected so nothing is written outside the resource
  /// directory.
  pub fn resolve(&self, relative_path: &str) -> Result<PathBuf, MaterializeError> {
    let escape = || MaterializeError::PathEscape {
      relative_path: relative_path.to_string(),
    };

    let mut path = self.root.clone();
    let mut depth = 0;
    for component in Path::new(relative_path).components() {
      match component {
        Component::Normal(segment) => {
          path.push(segment);
          depth += 1;
        }
        Component::CurDir => {}
        Component::ParentDir | Component::RootDir | Component::Prefix(_) => return Err(escape()),
      }
    }

    if depth == 0 {
      return Err(escape());
    }
    Ok(path)
  }

  /// Find the first symbolic link between the workspace root and `path`,
  /// `path` itself included.
  ///
  /// Writing through a link could land outside the resource directory, so
  /// callers refuse to touch a path for which this returns `Some`. A path
  /// outside the workspace root is returned as is. Components that do not
  /// exist yet are not links.
  pub async fn find_symlink(&self, path: &Path) -> io::Result<Option<PathBuf>> {
    let Ok(relative) = path.strip_prefix(&self.workspace_root) else {
      return Ok(Some(path.to_path_buf()));
    };

    let mut current = self.workspace_root.clone();
    for component in relative.components() {
      current.push(component);
      match fs::symlink_metadata(&current).await {
        Ok(metadata) if metadata.file_type().is_symlink() => return Ok(Some(current)),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => break,
        Err(e) => return Err(e),
      }
    }

    Ok(None)
  }
}
