use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::block::BlockDef;
use crate::connection::ConnectionDef;
use crate::enums::ExecutionSettings;
use crate::error::ManifestError;

/// Top-level workflow manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowManifest {
  pub workflow_name: String,
  pub version: String,
  pub description: String,
  pub blocks: Vec<BlockDef>,
  pub connections: Vec<ConnectionDef>,

  /// Labels explicitly declared as final outputs of the workflow.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub outputs: Option<Vec<String>>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub execution: Option<ExecutionSettings>,
}

impl WorkflowManifest {
  /// Decode a manifest from YAML text.
  pub fn from_yaml_str(content: &str) -> Result<Self, ManifestError> {
    Ok(serde_yaml::from_str(content)?)
  }

  /// Decode a manifest from JSON text.
  pub fn from_json_str(content: &str) -> Result<Self, ManifestError> {
    Ok(serde_json::from_str(content)?)
  }

  /// Read and decode a manifest file. `.json` files are decoded as JSON,
  /// everything else as YAML.
  pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    let is_json = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
      Self::from_json_str(&content)
    } else {
      Self::from_yaml_str(&content)
    }
  }
}
