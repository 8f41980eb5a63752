//! Child process invocation for block binaries.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecutionError;

/// Run `binary entry`, feeding `stdin` and capturing stdout.
///
/// The child is always awaited, and killed if this future is dropped first.
/// A non-zero exit is reported with the captured stderr.
pub(crate) async fn invoke(
  block: &str,
  binary: &Path,
  entry: &str,
  stdin: Vec<u8>,
) -> Result<String, ExecutionError> {
  let mut child = Command::new(binary)
    .arg(entry)
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .spawn()
    .map_err(|source| ExecutionError::Spawn {
      block: block.to_string(),
      binary: binary.to_path_buf(),
      source,
    })?;

  // Writing from a separate task keeps a child that fills its stdout pipe
  // before draining stdin from deadlocking against us.
  let writer = child.stdin.take().map(|mut pipe| {
    tokio::spawn(async move {
      pipe.write_all(&stdin).await?;
      pipe.shutdown().await
    })
  });

  let output = child
    .wait_with_output()
    .await
    .map_err(|source| ExecutionError::Io {
      block: block.to_string(),
      source,
    })?;

  if let Some(writer) = writer {
    match writer.await {
      Ok(Ok(())) => {}
      // The child may exit without reading all of its input.
      Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
        debug!(block, entry, "child closed stdin early");
      }
      Ok(Err(source)) => {
        return Err(ExecutionError::Io {
          block: block.to_string(),
          source,
        });
      }
      Err(e) => {
        return Err(ExecutionError::TaskPanicked {
          message: e.to_string(),
        });
      }
    }
  }

  if !output.status.success() {
    return Err(ExecutionError::Failed {
      block: block.to_string(),
      entry: entry.to_string(),
      status: output.status,
      stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
    });
  }

  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;

  fn script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path.display().to_string()
  }

  #[tokio::test]
  async fn test_pipes_stdin_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let upper = script(dir.path(), "upper.sh", "tr '[:lower:]' '[:upper:]'\n");

    let out = invoke("upper", Path::new("/bin/sh"), &upper, b"hello\n".to_vec())
      .await
      .unwrap();
    assert_eq!(out, "HELLO\n");
  }

  #[tokio::test]
  async fn test_failure_carries_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let fail = script(dir.path(), "fail.sh", "echo 'boom' >&2\nexit 3\n");

    let err = invoke("breaker", Path::new("/bin/sh"), &fail, Vec::new())
      .await
      .unwrap_err();
    match err {
      ExecutionError::Failed {
        block,
        status,
        stderr,
        ..
      } => {
        assert_eq!(block, "breaker");
        assert_eq!(status.code(), Some(3));
        assert_eq!(stderr, "boom");
      }
      other => panic!("unexpected error: {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_child_ignoring_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let quiet = script(dir.path(), "quiet.sh", "echo done\n");

    let input = vec![b'x'; 1 << 20];
    let out = invoke("quiet", Path::new("/bin/sh"), &quiet, input).await.unwrap();
    assert_eq!(out, "done\n");
  }

  #[tokio::test]
  async fn test_spawn_failure() {
    let err = invoke("ghost", Path::new("/nonexistent/block"), "run", Vec::new())
      .await
      .unwrap_err();
    assert!(matches!(err, ExecutionError::Spawn { .. }));
    assert_eq!(err.block(), Some("ghost"));
  }
}
