use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a workflow manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// The manifest file could not be read.
  #[error("failed to read workflow manifest {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The manifest is not well-formed YAML for this schema.
  #[error("invalid workflow manifest: {0}")]
  Yaml(#[from] serde_yaml::Error),

  /// The manifest is not well-formed JSON for this schema.
  #[error("invalid workflow manifest: {0}")]
  Json(#[from] serde_json::Error),
}
