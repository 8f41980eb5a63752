use atomos_config::ManifestError;
use atomos_executor::ExecutionError;
use atomos_resolver::ResolveError;
use atomos_workflow::GraphError;
use thiserror::Error;

/// Errors surfaced by the workflow manager.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("failed to load manifest: {0}")]
  Manifest(#[from] ManifestError),

  #[error("failed to resolve blocks: {0}")]
  Resolve(#[from] ResolveError),

  #[error("invalid workflow graph: {0}")]
  Graph(#[from] GraphError),

  #[error("workflow execution failed: {0}")]
  Execution(#[from] ExecutionError),

  #[error("workflow not found: {name}")]
  WorkflowNotFound { name: String },
}
