use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PackageError;
use crate::manifest::Entry;

/// A request to make a block available locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
  /// Repository identifier, e.g. "my-org/text-tools"
  pub repo: String,
  /// Release tag. `None` installs the latest release.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  /// Reinstall even if the block is already installed.
  #[serde(default)]
  pub force: bool,
}

impl InstallRequest {
  pub fn new(repo: impl Into<String>) -> Self {
    Self {
      repo: repo.into(),
      version: None,
      force: false,
    }
  }

  pub fn with_version(mut self, version: Option<impl Into<String>>) -> Self {
    self.version = version.map(Into::into);
    self
  }

  pub fn with_force(mut self, force: bool) -> Self {
    self.force = force;
    self
  }
}

/// Metadata recorded for an installed block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledBlock {
  pub name: String,
  pub version: String,
  pub source_repo: String,
  /// Path to the executable.
  pub binary_path: PathBuf,
  pub installed_at: DateTime<Utc>,
  pub last_updated: DateTime<Utc>,
  /// Entries the block's CLI exposes, keyed by entry name.
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub entries: HashMap<String, Entry>,
}

impl InstalledBlock {
  /// Check whether the block declares an entry with this name.
  ///
  /// Blocks that declare no entries at all accept any entry name.
  pub fn accepts_entry(&self, entry: &str) -> bool {
    self.entries.is_empty() || self.entries.contains_key(entry)
  }
}

/// The package-manager seam the workflow engine depends on.
#[async_trait]
pub trait BlockInstaller: Send + Sync {
  /// Ensure the block is installed, downloading it if absent or if a forced
  /// reinstall was requested, and return its metadata.
  async fn install(&self, request: &InstallRequest) -> Result<InstalledBlock, PackageError>;

  /// Get an installed block by name.
  async fn get(&self, name: &str) -> Result<Option<InstalledBlock>, PackageError>;

  /// List all installed blocks.
  async fn list(&self) -> Result<Vec<InstalledBlock>, PackageError>;

  /// Remove an installed block and its binary.
  async fn remove(&self, name: &str) -> Result<(), PackageError>;
}
