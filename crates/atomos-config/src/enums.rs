use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
  /// One block at a time, in breadth-first order.
  Sequential,
  /// Independent blocks run concurrently as soon as their inputs are ready.
  #[default]
  Parallel,
}

/// Per-workflow execution overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSettings {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mode: Option<ExecutionMode>,

  /// Upper bound on concurrently running blocks in parallel mode.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_concurrency: Option<usize>,
}
