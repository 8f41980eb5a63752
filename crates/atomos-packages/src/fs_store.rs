use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::error::PackageError;
use crate::registry::InstalledBlock;

/// Summary of what a store holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
  pub root: PathBuf,
  pub total_blocks: usize,
  /// Combined size of every binary present on disk.
  pub total_binary_bytes: u64,
  /// Blocks whose recorded binary is gone.
  pub missing_binaries: Vec<String>,
}

/// Filesystem store for installed blocks.
///
/// Blocks are stored in a directory structure:
/// ```text
/// {root}/
/// ├── metadata/
/// │   └── text-tools.json
/// └── binaries/
///     └── text-tools/
///         └── text-tools-linux-amd64
/// ```
#[derive(Debug, Clone)]
pub struct FsBlockStore {
  root: PathBuf,
}

impl FsBlockStore {
  /// Create a new store at the given root path.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Get the root directory of the store.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn metadata_dir(&self) -> PathBuf {
    self.root.join("metadata")
  }

  /// Block names may contain slashes; they become "--" on disk.
  fn file_stem(name: &str) -> String {
    name.replace('/', "--")
  }

  fn metadata_path(&self, name: &str) -> PathBuf {
    self
      .metadata_dir()
      .join(format!("{}.json", Self::file_stem(name)))
  }

  /// Directory holding the binaries of one block.
  pub fn binary_dir(&self, name: &str) -> PathBuf {
    self.root.join("binaries").join(Self::file_stem(name))
  }

  /// Check whether metadata exists for the block.
  pub async fn is_installed(&self, name: &str) -> bool {
    fs::try_exists(self.metadata_path(name))
      .await
      .unwrap_or(false)
  }

  /// Read the metadata of an installed block.
  pub async fn get(&self, name: &str) -> Result<Option<InstalledBlock>, PackageError> {
    let path = self.metadata_path(name);
    let content = match fs::read_to_string(&path).await {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
  }

  /// Write the metadata of an installed block, replacing any previous record.
  pub async fn save(&self, block: &InstalledBlock) -> Result<(), PackageError> {
    fs::create_dir_all(self.metadata_dir()).await?;
    let json = serde_json::to_string_pretty(block)?;
    fs::write(self.metadata_path(&block.name), json).await?;
    Ok(())
  }

  /// List every installed block. Unreadable metadata files are skipped.
  pub async fn list(&self) -> Result<Vec<InstalledBlock>, PackageError> {
    let mut blocks = Vec::new();
    let dir = self.metadata_dir();

    if !fs::try_exists(&dir).await.unwrap_or(false) {
      return Ok(blocks);
    }

    let mut entries = fs::read_dir(&dir).await?;
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }

      let parsed = match fs::read_to_string(&path).await {
        Ok(content) => serde_json::from_str::<InstalledBlock>(&content).map_err(PackageError::from),
        Err(e) => Err(e.into()),
      };
      match parsed {
        Ok(block) => blocks.push(block),
        Err(e) => warn!(path = %path.display(), error = %e, "skipping corrupt block metadata"),
      }
    }

    blocks.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(blocks)
  }

  /// Check whether the binary recorded for `block` is on disk.
  pub async fn has_binary(&self, block: &InstalledBlock) -> bool {
    fs::metadata(&block.binary_path)
      .await
      .map(|meta| meta.is_file())
      .unwrap_or(false)
  }

  /// Blocks whose metadata exists but whose binary is missing.
  pub async fn validate(&self) -> Result<Vec<InstalledBlock>, PackageError> {
    let mut missing = Vec::new();
    for block in self.list().await? {
      if !self.has_binary(&block).await {
        warn!(block = %block.name, binary = %block.binary_path.display(), "block_binary_missing");
        missing.push(block);
      }
    }
    Ok(missing)
  }

  /// Count installed blocks and the disk space their binaries use.
  pub async fn stats(&self) -> Result<StoreStats, PackageError> {
    let mut stats = StoreStats {
      root: self.root.clone(),
      ..StoreStats::default()
    };

    for block in self.list().await? {
      stats.total_blocks += 1;
      match fs::metadata(&block.binary_path).await {
        Ok(meta) if meta.is_file() => stats.total_binary_bytes += meta.len(),
        _ => stats.missing_binaries.push(block.name),
      }
    }
    Ok(stats)
  }

  /// Remove a block's binary directory and metadata.
  pub async fn remove(&self, name: &str) -> Result<(), PackageError> {
    if self.get(name).await?.is_none() {
      return Err(PackageError::NotInstalled {
        name: name.to_string(),
      });
    }

    let binary_dir = self.binary_dir(name);
    if fs::try_exists(&binary_dir).await.unwrap_or(false) {
      fs::remove_dir_all(&binary_dir).await?;
    }
    fs::remove_file(self.metadata_path(name)).await?;
    Ok(())
  }
}
