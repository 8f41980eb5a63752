use std::path::PathBuf;

use atomos_config::{BlockDef, ConnectionDef};
use serde::{Deserialize, Serialize};

/// A graph vertex: a block the workflow depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
  pub name: String,
  /// Requested release. `None` means latest.
  pub version: Option<String>,
  /// Repository identifier, e.g. "my-org/text-tools"
  pub github: String,
  pub force: bool,
}

impl From<&BlockDef> for Block {
  fn from(def: &BlockDef) -> Self {
    Self {
      name: def.name.clone(),
      version: def.requested_version().map(str::to_string),
      github: def.github.clone(),
      force: def.force,
    }
  }
}

/// One invocation of a block's entry, with its position in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
  /// Index of the connection in declaration order.
  pub index: usize,
  pub block: String,
  pub entry: String,
  pub output: String,
  /// Consumed label. `None` for source connections.
  pub input: Option<String>,
  pub source: Option<PathBuf>,
}

impl Connection {
  pub fn from_def(index: usize, def: &ConnectionDef) -> Self {
    Self {
      index,
      block: def.from_block.clone(),
      entry: def.from_entry.clone(),
      output: def.output.clone(),
      input: def.input_label().map(str::to_string),
      source: def.source.clone(),
    }
  }

  pub fn is_source(&self) -> bool {
    self.input.is_none()
  }

  /// Output labels that are empty produce nothing addressable.
  pub fn has_output(&self) -> bool {
    !self.output.trim().is_empty()
  }
}
