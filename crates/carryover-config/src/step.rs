use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::resource::Resource;

/// Number of file operations allowed in flight during one phase.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Synchronizer tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
  /// Maximum concurrent writes (or permission updates) within a phase.
  #[serde(default = "default_concurrency")]
  pub concurrency: usize,
}

impl SyncConfig {
  /// Concurrency actually used by the worker pool; never zero.
  pub fn effective_concurrency(&self) -> usize {
    self.concurrency.max(1)
  }
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      concurrency: DEFAULT_CONCURRENCY,
    }
  }
}

fn default_concurrency() -> usize {
  DEFAULT_CONCURRENCY
}

/// Parameters a pipeline step supplies for one synchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepParams {
  pub resource: Resource,
  pub workspace_root: PathBuf,
  #[serde(default)]
  pub sync: SyncConfig,
}

impl StepParams {
  /// Parse and validate step parameters from JSON.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let params: StepParams = serde_json::from_str(content)?;
    params.resource.validate()?;
    Ok(params)
  }
}
