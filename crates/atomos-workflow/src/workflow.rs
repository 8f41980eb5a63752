use std::path::{Path, PathBuf};

use atomos_config::{ExecutionSettings, WorkflowManifest};
use tracing::debug;

use crate::block::{Block, Connection};
use crate::error::GraphError;
use crate::graph::Graph;
use crate::validate::detect_cycle;

/// A workflow whose graph has been built and checked for cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
  pub name: String,
  pub version: String,
  pub description: String,
  pub graph: Graph,
  /// Labels the manifest declares as final outputs, if any.
  pub declared_outputs: Option<Vec<String>>,
  pub execution: Option<ExecutionSettings>,
  /// Directory relative source paths are resolved against.
  pub base_dir: PathBuf,
}

impl Workflow {
  /// Build and check the graph for a manifest.
  pub fn from_manifest(manifest: &WorkflowManifest, base_dir: impl AsRef<Path>) -> Result<Self, GraphError> {
    let blocks: Vec<Block> = manifest.blocks.iter().map(Block::from).collect();
    let connections: Vec<Connection> = manifest
      .connections
      .iter()
      .enumerate()
      .map(|(i, def)| Connection::from_def(i, def))
      .collect();

    let graph = Graph::build(&blocks, &connections)?;
    detect_cycle(&graph)?;

    debug!(
      workflow = %manifest.workflow_name,
      vertices = graph.vertices().len(),
      edges = graph.edges().len(),
      "graph_built"
    );

    Ok(Self {
      name: manifest.workflow_name.clone(),
      version: manifest.version.clone(),
      description: manifest.description.clone(),
      graph,
      declared_outputs: manifest.outputs.clone(),
      execution: manifest.execution.clone(),
      base_dir: base_dir.as_ref().to_path_buf(),
    })
  }

  /// Blocks in declaration order.
  pub fn blocks(&self) -> &[Block] {
    self.graph.vertices()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const MANIFEST: &str = r#"
workflow_name: shout
version: "1"
blocks:
  - name: upper
    github: my-org/upper
  - name: exclaim
    github: my-org/exclaim
connections:
  - from_block: upper
    from_entry: upper
    output: loud
    source: in.txt
  - from_block: exclaim
    from_entry: bang
    input: loud
    output: result
"#;

  #[test]
  fn test_from_manifest() {
    let manifest = WorkflowManifest::from_yaml_str(MANIFEST).unwrap();
    let workflow = Workflow::from_manifest(&manifest, "/tmp/flows").unwrap();

    assert_eq!(workflow.name, "shout");
    assert_eq!(workflow.base_dir, PathBuf::from("/tmp/flows"));
    assert_eq!(workflow.blocks().len(), 2);
    assert_eq!(workflow.graph.edges().len(), 1);
    assert_eq!(workflow.graph.edges()[0].entry, "upper");
  }

  #[test]
  fn test_idempotent_compilation() {
    let manifest = WorkflowManifest::from_yaml_str(MANIFEST).unwrap();
    let first = Workflow::from_manifest(&manifest, ".").unwrap();
    let second = Workflow::from_manifest(&manifest, ".").unwrap();

    assert_eq!(first.graph.vertices(), second.graph.vertices());
    assert_eq!(first.graph.edges(), second.graph.edges());
  }

  #[test]
  fn test_cycle_rejected() {
    let manifest = WorkflowManifest::from_yaml_str(
      r#"
workflow_name: loop
blocks:
  - name: a
  - name: b
connections:
  - from_block: a
    from_entry: run
    input: y
    output: x
  - from_block: b
    from_entry: run
    input: x
    output: y
"#,
    )
    .unwrap();

    assert!(matches!(
      Workflow::from_manifest(&manifest, "."),
      Err(GraphError::CycleDetected { .. })
    ));
  }
}
