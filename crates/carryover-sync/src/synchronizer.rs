//! Synchronizer implementation.

use std::path::Path;
use std::sync::Arc;

use carryover_config::{Resource, SyncConfig};
use carryover_store::StateStore;
use tracing::{error, info, instrument, warn};

use crate::console::Console;
use crate::error::SyncError;
use crate::fetcher::fetch_snapshot;
use crate::filesystem::{Filesystem, LocalFilesystem};
use crate::layout::ResourceLayout;
use crate::materializer::Materializer;
use crate::permissions::PermissionApplier;
use crate::report::{SyncOutcome, SyncReport};
use crate::resolver::{Resolution, resolve};

/// Restores a resource's files from the state store into a workspace.
///
/// Phases run in order: resolve, fetch, materialize, apply permissions.
/// A fetch failure is reported and treated as an empty snapshot; a
/// materialize or permission failure fails the step without undoing the
/// files already written.
pub struct Synchronizer {
  store: Arc<dyn StateStore>,
  filesystem: Arc<dyn Filesystem>,
  console: Arc<dyn Console>,
  config: SyncConfig,
}

impl Synchronizer {
  /// Create a synchronizer writing to the local disk with default settings.
  pub fn new(store: Arc<dyn StateStore>, console: Arc<dyn Console>) -> Self {
    Self {
      store,
      filesystem: Arc::new(LocalFilesystem),
      console,
      config: SyncConfig::default(),
    }
  }

  /// Use a different filesystem.
  pub fn with_filesystem(mut self, filesystem: Arc<dyn Filesystem>) -> Self {
    self.filesystem = filesystem;
    self
  }

  /// Use different settings.
  pub fn with_config(mut self, config: SyncConfig) -> Self {
    self.config = config;
    self
  }

  /// Restore `resource` under `workspace_root/<name>/<type>`.
  #[instrument(
    name = "resource_sync",
    skip(self, resource, workspace_root),
    fields(
      resource = %resource.name,
      resource_type = %resource.resource_type,
    )
  )]
  pub async fn synchronize(
    &self,
    resource: &Resource,
    workspace_root: &Path,
  ) -> Result<SyncReport, SyncError> {
    self.console.open_section(&format!(
      "Restoring state for {} ({})",
      resource.name, resource.resource_type
    ));

    let result = self.synchronize_inner(resource, workspace_root).await;

    match &result {
      Ok(report) => {
        info!(
          outcome = ?report.outcome,
          files = report.files_restored(),
          "sync_completed"
        );
        self.console.close_section(true);
      }
      Err(e) => {
        error!(
          error = %e,
          files_written = e.written().len(),
          "sync_failed"
        );
        self.console.publish_message(&format!(
          "Restore failed for resource {}: {} file(s) were written before the failure and were left in place",
          resource.name,
          e.written().len()
        ));
        self.console.close_section(false);
      }
    }

    result
  }

  async fn synchronize_inner(
    &self,
    resource: &Resource,
    workspace_root: &Path,
  ) -> Result<SyncReport, SyncError> {
    let query = match resolve(resource) {
      Resolution::Bootstrap => {
        info!("no prior content id, bootstrapping");
        self.console.publish_message(&format!(
          "No previous state for resource {}, nothing to restore",
          resource.name
        ));
        return Ok(SyncReport::without_files(
          &resource.name,
          SyncOutcome::Bootstrap,
        ));
      }
      Resolution::Continue { query } => query,
    };
    let content_id = query.content_id.clone();

    let snapshot = match fetch_snapshot(
      self.store.as_ref(),
      self.console.as_ref(),
      resource,
      &query,
    )
    .await
    {
      Ok(snapshot) => snapshot,
      Err(e) => {
        warn!(error = %e, "snapshot unavailable, continuing without restoring");
        self.console.publish_message(&format!(
          "Warning: {}. No files found, continuing without previous state",
          e
        ));
        return Ok(SyncReport::without_files(
          &resource.name,
          SyncOutcome::Unavailable {
            content_id,
            reason: e.to_string(),
          },
        ));
      }
    };

    if snapshot.is_empty() {
      return Ok(SyncReport::without_files(
        &resource.name,
        SyncOutcome::Empty { content_id },
      ));
    }

    let layout =
      ResourceLayout::new(workspace_root, resource).map_err(|source| SyncError::Materialize {
        resource: resource.name.clone(),
        written: Vec::new(),
        source,
      })?;

    self.console.publish_message(&format!(
      "Writing {} file(s) to {}",
      snapshot.len(),
      layout.root().display()
    ));

    let concurrency = self.config.effective_concurrency();
    let outcome = Materializer::new(self.filesystem.clone(), concurrency)
      .materialize(&layout, &snapshot)
      .await;
    for e in &outcome.errors {
      self.console.publish_message(&format!("Error: {}", e));
    }
    let (files, first_error) = outcome.into_parts();
    if let Some(source) = first_error {
      return Err(SyncError::Materialize {
        resource: resource.name.clone(),
        written: files.into_iter().map(|f| f.path).collect(),
        source,
      });
    }

    self.console.publish_message(&format!(
      "Applying permissions to {} file(s)",
      files.len()
    ));

    let outcome = PermissionApplier::new(self.filesystem.clone(), concurrency)
      .apply(&layout, &files)
      .await;
    for e in &outcome.errors {
      self.console.publish_message(&format!("Error: {}", e));
    }
    if let (_, Some(source)) = outcome.into_parts() {
      return Err(SyncError::Permission {
        resource: resource.name.clone(),
        written: files.into_iter().map(|f| f.path).collect(),
        source,
      });
    }

    self.console.publish_message(&format!(
      "Restored {} file(s) for resource {}",
      files.len(),
      resource.name
    ));

    Ok(SyncReport::restored(&resource.name, &content_id, files))
  }
}
