use thiserror::Error;

/// Errors that can occur while loading step parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The step parameters are not valid JSON for the expected shape.
  #[error("failed to parse step parameters: {0}")]
  Parse(#[from] serde_json::Error),

  /// The resource definition is unusable.
  #[error("invalid resource '{name}': {message}")]
  InvalidResource { name: String, message: String },
}

impl ConfigError {
  pub(crate) fn invalid_resource(name: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InvalidResource {
      name: name.into(),
      message: message.into(),
    }
  }
}
