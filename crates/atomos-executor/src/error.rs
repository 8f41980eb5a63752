//! Error types for workflow execution.

use std::path::PathBuf;
use std::process::ExitStatus;

use atomos_workflow::GraphError;
use thiserror::Error;

/// Errors that can occur while running a workflow.
#[derive(Debug, Error)]
pub enum ExecutionError {
  /// The block's binary could not be started.
  #[error("failed to spawn '{}' for block '{block}': {source}", binary.display())]
  Spawn {
    block: String,
    binary: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The block's binary exited unsuccessfully.
  #[error("block '{block}' entry '{entry}' failed ({status}): {stderr}")]
  Failed {
    block: String,
    entry: String,
    status: ExitStatus,
    stderr: String,
  },

  /// A source connection's input file could not be read.
  #[error("failed to read source '{}' for block '{block}': {source}", path.display())]
  Source {
    block: String,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A source connection declares no source file.
  #[error("connection #{connection} of block '{block}' has neither an input nor a source")]
  MissingSource { block: String, connection: usize },

  /// A connection reads a label that has not been produced.
  #[error("block '{block}' reads label '{label}' which has no result")]
  MissingInput { block: String, label: String },

  /// The block was not resolved to an installed binary.
  #[error("no installed binary for block '{block}'")]
  MissingMetadata { block: String },

  /// Piping data to or from the child process failed.
  #[error("i/o error running block '{block}': {source}")]
  Io {
    block: String,
    #[source]
    source: std::io::Error,
  },

  /// A block task panicked or was cancelled.
  #[error("block task did not complete: {message}")]
  TaskPanicked { message: String },

  #[error(transparent)]
  Graph(#[from] GraphError),
}

impl ExecutionError {
  /// Name of the block the error is attributed to, when known.
  pub fn block(&self) -> Option<&str> {
    match self {
      Self::Spawn { block, .. }
      | Self::Failed { block, .. }
      | Self::Source { block, .. }
      | Self::MissingSource { block, .. }
      | Self::MissingInput { block, .. }
      | Self::MissingMetadata { block }
      | Self::Io { block, .. } => Some(block),
      Self::TaskPanicked { .. } | Self::Graph(_) => None,
    }
  }
}
