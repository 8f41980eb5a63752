use atomos_packages::PackageError;
use thiserror::Error;

/// Errors that can occur while resolving a workflow's blocks.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The package manager could not provide the block.
  #[error("failed to install block '{block}': {source}")]
  Install {
    block: String,
    #[source]
    source: PackageError,
  },

  /// A block declares no repository to install from.
  #[error("block '{block}' has no github repository")]
  MissingRepository { block: String },
}
