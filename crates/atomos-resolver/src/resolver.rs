use std::collections::HashMap;

use async_trait::async_trait;
use atomos_packages::{BlockInstaller, InstallRequest, InstalledBlock};
use atomos_workflow::{Block, Workflow};
use tracing::{debug, info, warn};

use crate::error::ResolveError;

/// Installed metadata keyed by workflow block name.
pub type ResolvedBlocks = HashMap<String, InstalledBlock>;

/// Resolves the blocks of a workflow to installed binaries.
#[async_trait]
pub trait Resolver: Send + Sync {
  /// Install every block in order. The first failure aborts resolution;
  /// blocks installed before it stay installed.
  async fn resolve(&self, blocks: &[Block]) -> Result<ResolvedBlocks, ResolveError>;

  /// Resolve a workflow's blocks and check the entries its connections use.
  async fn resolve_workflow(&self, workflow: &Workflow) -> Result<ResolvedBlocks, ResolveError> {
    let resolved = self.resolve(workflow.blocks()).await?;
    check_entries(workflow, &resolved);
    Ok(resolved)
  }
}

/// Standard resolver implementation backed by a block installer.
pub struct StandardResolver<I: BlockInstaller> {
  installer: I,
}

impl<I: BlockInstaller> StandardResolver<I> {
  pub fn new(installer: I) -> Self {
    Self { installer }
  }

  pub fn installer(&self) -> &I {
    &self.installer
  }
}

#[async_trait]
impl<I: BlockInstaller> Resolver for StandardResolver<I> {
  async fn resolve(&self, blocks: &[Block]) -> Result<ResolvedBlocks, ResolveError> {
    let mut resolved = HashMap::new();

    for block in blocks {
      if block.github.trim().is_empty() {
        return Err(ResolveError::MissingRepository {
          block: block.name.clone(),
        });
      }

      let request = InstallRequest::new(block.github.clone())
        .with_version(block.version.clone())
        .with_force(block.force);

      let installed = self
        .installer
        .install(&request)
        .await
        .map_err(|source| ResolveError::Install {
          block: block.name.clone(),
          source,
        })?;

      debug!(
        block = %block.name,
        version = %installed.version,
        binary = %installed.binary_path.display(),
        "block_resolved"
      );
      resolved.insert(block.name.clone(), installed);
    }

    info!(blocks = resolved.len(), "blocks_resolved");
    Ok(resolved)
  }
}

/// Warn about connections naming an entry their block does not declare.
fn check_entries(workflow: &Workflow, resolved: &ResolvedBlocks) {
  for conn in workflow.graph.connections() {
    let Some(installed) = resolved.get(&conn.block) else {
      continue;
    };
    if !installed.accepts_entry(&conn.entry) {
      warn!(
        block = %conn.block,
        entry = %conn.entry,
        connection = conn.index,
        "entry not declared by installed block"
      );
    }
  }
}
