use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named, typed build dependency whose files persist across pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
  /// Resource name, used as the first directory under the workspace root.
  pub name: String,
  /// Resource type, used as the second directory under the workspace root.
  #[serde(rename = "type")]
  pub resource_type: String,
  /// Opaque identifier of the resource in the state store.
  #[serde(default)]
  pub resource_id: String,
  /// Content identifier captured by the previous run, if there was one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prior_content_id: Option<String>,
}

impl Resource {
  pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      resource_type: resource_type.into(),
      resource_id: String::new(),
      prior_content_id: None,
    }
  }

  pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
    self.resource_id = resource_id.into();
    self
  }

  pub fn with_prior_content_id(mut self, content_id: impl Into<String>) -> Self {
    self.prior_content_id = Some(content_id.into());
    self
  }

  /// The prior content identifier, treating an empty string as absent.
  pub fn prior_content_id(&self) -> Option<&str> {
    self
      .prior_content_id
      .as_deref()
      .filter(|id| !id.is_empty())
  }

  /// Check the resource can be laid out in a workspace and looked up in a store.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !is_path_segment(&self.name) {
      return Err(ConfigError::invalid_resource(
        &self.name,
        "name must be a single non-empty path segment",
      ));
    }

    if !is_path_segment(&self.resource_type) {
      return Err(ConfigError::invalid_resource(
        &self.name,
        format!(
          "type '{}' must be a single non-empty path segment",
          self.resource_type
        ),
      ));
    }

    if let Some(content_id) = self.prior_content_id()
      && !is_content_id(content_id)
    {
      return Err(ConfigError::invalid_resource(
        &self.name,
        format!(
          "priorContentId '{}' may only contain ASCII letters, digits, '-', '_' and '.'",
          content_id
        ),
      ));
    }

    if self.prior_content_id().is_some() && self.resource_id.is_empty() {
      return Err(ConfigError::invalid_resource(
        &self.name,
        "resourceId is required when priorContentId is set",
      ));
    }

    Ok(())
  }
}

/// Whether `value` can be used as exactly one directory name.
pub fn is_path_segment(value: &str) -> bool {
  !value.is_empty() && value != "." && value != ".." && !value.contains(['/', '\\', '\0'])
}

/// Whether `value` is usable as a content identifier.
///
/// Identifiers travel inside `sha=<id>` store queries and name snapshot
/// files, so they are restricted to characters that need no escaping in
/// either place.
pub fn is_content_id(value: &str) -> bool {
  is_path_segment(value)
    && value
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_prior_content_id_is_absent() {
    let resource = Resource::new("db-state", "state").with_prior_content_id("");
    assert_eq!(resource.prior_content_id(), None);
  }

  #[test]
  fn test_validate_accepts_bootstrap_without_resource_id() {
    let resource = Resource::new("db-state", "state");
    assert!(resource.validate().is_ok());
  }

  #[test]
  fn test_validate_rejects_continuation_without_resource_id() {
    let resource = Resource::new("db-state", "state").with_prior_content_id("abc123");
    let err = resource.validate().unwrap_err();
    assert!(err.to_string().contains("resourceId is required"));
  }

  #[test]
  fn test_validate_rejects_traversing_name() {
    let resource = Resource::new("..", "state");
    assert!(resource.validate().is_err());

    let resource = Resource::new("db-state", "state/../../etc");
    assert!(resource.validate().is_err());
  }

  #[test]
  fn test_validate_rejects_query_breaking_content_id() {
    for bad in ["abc&sha=other", "abc=def", "a b", "abc/def", ".."] {
      let resource = Resource::new("db-state", "state")
        .with_resource_id("res-42")
        .with_prior_content_id(bad);
      let err = resource.validate().unwrap_err();
      assert!(err.to_string().contains("priorContentId"), "{}", bad);
    }
  }

  #[test]
  fn test_is_content_id() {
    assert!(is_content_id("abc123"));
    assert!(is_content_id("3f1c-e9_v2.1"));
    assert!(!is_content_id(""));
    assert!(!is_content_id("."));
    assert!(!is_content_id("abc&limit=5"));
    assert!(!is_content_id("abc%26"));
  }

  #[test]
  fn test_is_path_segment() {
    assert!(is_path_segment("db-state"));
    assert!(is_path_segment(".hidden"));
    assert!(!is_path_segment(""));
    assert!(!is_path_segment("."));
    assert!(!is_path_segment("a/b"));
    assert!(!is_path_segment("a\\b"));
  }
}
