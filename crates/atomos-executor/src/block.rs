//! Execution of one workflow block.

use std::path::{Path, PathBuf};

use atomos_workflow::Connection;
use tracing::{debug, instrument};

use crate::error::ExecutionError;
use crate::process::invoke;
use crate::store::ResultStore;

/// Everything needed to run one block, owned so it can move onto a task.
#[derive(Debug, Clone)]
pub struct BlockTask {
  pub block: String,
  pub binary: PathBuf,
  /// The block's connections in declaration order.
  pub connections: Vec<Connection>,
  /// Results of the labels this block reads.
  pub inputs: ResultStore,
  /// Directory relative source paths are resolved against.
  pub base_dir: PathBuf,
}

/// Output of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Produced {
  pub label: String,
  pub connection: usize,
  pub text: String,
}

/// Runs a block's connections one after another.
///
/// Each connection invokes the block's binary once with its entry as the only
/// argument. Source connections read stdin from their file; the others read
/// the text stored under their input label, including text produced by an
/// earlier connection of the same block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockExecutor;

impl BlockExecutor {
  pub fn new() -> Self {
    Self
  }

  #[instrument(name = "block_execute", skip(self, task), fields(block = %task.block))]
  pub async fn execute(&self, task: BlockTask) -> Result<Vec<Produced>, ExecutionError> {
    let BlockTask {
      block,
      binary,
      connections,
      inputs: mut local,
      base_dir,
    } = task;
    let mut produced = Vec::with_capacity(connections.len());

    for conn in &connections {
      let stdin = match conn.input.as_deref() {
        None => read_source(&block, conn, &base_dir).await?,
        Some(label) => local
          .get(label)
          .ok_or_else(|| ExecutionError::MissingInput {
            block: block.clone(),
            label: label.to_string(),
          })?
          .into_bytes(),
      };

      debug!(
        entry = %conn.entry,
        connection = conn.index,
        stdin_bytes = stdin.len(),
        "invoking_block"
      );
      let text = invoke(&block, &binary, &conn.entry, stdin).await?;

      if conn.has_output() {
        local.insert(&conn.output, conn.index, text.clone());
        produced.push(Produced {
          label: conn.output.clone(),
          connection: conn.index,
          text,
        });
      }
    }

    Ok(produced)
  }
}

async fn read_source(block: &str, conn: &Connection, base_dir: &Path) -> Result<Vec<u8>, ExecutionError> {
  let Some(source) = conn.source.as_deref() else {
    return Err(ExecutionError::MissingSource {
      block: block.to_string(),
      connection: conn.index,
    });
  };

  let path = if source.is_absolute() {
    source.to_path_buf()
  } else {
    base_dir.join(source)
  };

  tokio::fs::read(&path)
    .await
    .map_err(|source| ExecutionError::Source {
      block: block.to_string(),
      path,
      source,
    })
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;

  fn conn(index: usize, entry: &str, input: Option<&str>, output: &str, source: Option<&str>) -> Connection {
    Connection {
      index,
      block: "tools".to_string(),
      entry: entry.to_string(),
      output: output.to_string(),
      input: input.map(str::to_string),
      source: source.map(PathBuf::from),
    }
  }

  fn task(dir: &Path, connections: Vec<Connection>, inputs: ResultStore) -> BlockTask {
    BlockTask {
      block: "tools".to_string(),
      binary: PathBuf::from("/bin/sh"),
      connections,
      inputs,
      base_dir: dir.to_path_buf(),
    }
  }

  #[tokio::test]
  async fn test_source_then_self_input() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("in.txt"), "abc\n").unwrap();
    std::fs::write(dir.path().join("upper.sh"), "tr '[:lower:]' '[:upper:]'\n").unwrap();
    std::fs::write(dir.path().join("quote.sh"), "sed 's/^/> /'\n").unwrap();
    let upper = dir.path().join("upper.sh").display().to_string();
    let quote = dir.path().join("quote.sh").display().to_string();

    let produced = BlockExecutor::new()
      .execute(task(
        dir.path(),
        vec![
          conn(0, &upper, None, "loud", Some("in.txt")),
          conn(1, &quote, Some("loud"), "quoted", None),
        ],
        ResultStore::new(),
      ))
      .await
      .unwrap();

    assert_eq!(
      produced,
      vec![
        Produced {
          label: "loud".to_string(),
          connection: 0,
          text: "ABC\n".to_string(),
        },
        Produced {
          label: "quoted".to_string(),
          connection: 1,
          text: "> ABC\n".to_string(),
        },
      ]
    );
  }

  #[tokio::test]
  async fn test_reads_input_label() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("wc.sh"), "wc -l | tr -d ' '\n").unwrap();
    let wc = dir.path().join("wc.sh").display().to_string();

    let mut inputs = ResultStore::new();
    inputs.insert("lines", 0, "a\nb\n".to_string());
    inputs.insert("lines", 1, "c\n".to_string());

    let produced = BlockExecutor::new()
      .execute(task(dir.path(), vec![conn(2, &wc, Some("lines"), "count", None)], inputs))
      .await
      .unwrap();
    assert_eq!(produced[0].text, "3\n");
  }

  #[tokio::test]
  async fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let result = BlockExecutor::new()
      .execute(task(
        dir.path(),
        vec![conn(0, "run", Some("nothing"), "x", None)],
        ResultStore::new(),
      ))
      .await;
    assert!(matches!(result, Err(ExecutionError::MissingInput { label, .. }) if label == "nothing"));
  }

  #[tokio::test]
  async fn test_unreadable_source() {
    let dir = tempfile::tempdir().unwrap();
    let result = BlockExecutor::new()
      .execute(task(
        dir.path(),
        vec![conn(0, "run", None, "x", Some("absent.txt"))],
        ResultStore::new(),
      ))
      .await;
    assert!(matches!(result, Err(ExecutionError::Source { path, .. }) if path == dir.path().join("absent.txt")));

    let result = BlockExecutor::new()
      .execute(task(dir.path(), vec![conn(0, "run", None, "x", None)], ResultStore::new()))
      .await;
    assert!(matches!(result, Err(ExecutionError::MissingSource { connection: 0, .. })));
  }
}
