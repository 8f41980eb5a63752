use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("connection #{connection} references unknown block: {block}")]
  UnknownBlock { block: String, connection: usize },

  #[error("no root found (no source connection, or every block has an upstream producer)")]
  NoRoot,

  #[error("cycle detected: {}", path.join(" -> "))]
  CycleDetected { path: Vec<String> },

  #[error(
    "block '{block}' reads label '{label}' before producing it (connection #{consumer} consumes output of #{producer})"
  )]
  SelfCycle {
    block: String,
    label: String,
    producer: usize,
    consumer: usize,
  },

  #[error("connection #{connection} of block '{block}' reads label '{label}' that no connection produces")]
  DanglingInput {
    block: String,
    label: String,
    connection: usize,
  },

  #[error("output label '{label}' of block '{block}' is never consumed and not declared as a workflow output")]
  UnconsumedOutput { block: String, label: String },

  #[error("declared workflow output '{label}' is not produced by any connection")]
  UnknownOutput { label: String },
}
