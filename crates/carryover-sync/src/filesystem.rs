//! Filesystem capability used to restore files.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

/// The file operations a restore performs.
#[async_trait]
pub trait Filesystem: Send + Sync {
  /// Write `contents` to `path`, creating missing parent directories and
  /// replacing any existing file.
  async fn write_file(&self, path: &Path, contents: Bytes) -> io::Result<()>;

  /// Set the permission bits of `path`.
  async fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// The local disk, via `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct LocalFilesystem;

#[async_trait]
impl Filesystem for LocalFilesystem {
  async fn write_file(&self, path: &Path, contents: Bytes) -> io::Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    match fs::write(path, &contents).await {
      Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
        // A previous restore may have left the file read-only.
        if make_writable(path).await? {
          fs::write(path, &contents).await
        } else {
          Err(e)
        }
      }
      result => result,
    }
  }

  async fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
    fs::set_permissions(path, permissions_for(path, mode).await?).await
  }
}

/// Give the owner write access to an existing read-only file.
///
/// Returns `false` when there is nothing to fix.
async fn make_writable(path: &Path) -> io::Result<bool> {
  let metadata = match fs::metadata(path).await {
    Ok(metadata) => metadata,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
    Err(e) => return Err(e),
  };

  let mut permissions = metadata.permissions();
  if !metadata.is_file() || !permissions.readonly() {
    return Ok(false);
  }

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
  }
  #[cfg(not(unix))]
  permissions.set_readonly(false);

  fs::set_permissions(path, permissions).await?;
  Ok(true)
}

#[cfg(unix)]
async fn permissions_for(_path: &Path, mode: u32) -> io::Result<std::fs::Permissions> {
  use std::os::unix::fs::PermissionsExt;
  Ok(std::fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
async fn permissions_for(path: &Path, mode: u32) -> io::Result<std::fs::Permissions> {
  // Only the owner write bit has a counterpart here.
  let mut permissions = fs::metadata(path).await?.permissions();
  permissions.set_readonly(mode & 0o200 == 0);
  Ok(permissions)
}
