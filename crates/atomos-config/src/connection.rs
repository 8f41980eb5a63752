use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One invocation of a block's entry.
///
/// The block named by `from_block` is run with `from_entry` as its argument.
/// Its stdin comes from the data labelled `input`, or from the file at
/// `source` when `input` is omitted (a source connection). Its stdout is
/// stored under `output`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDef {
  #[serde(default)]
  pub from_block: String,

  #[serde(default)]
  pub from_entry: String,

  /// Logical name of the data this invocation produces.
  #[serde(default)]
  pub output: String,

  /// Logical name of the data this invocation consumes.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub input: Option<String>,

  /// File that seeds stdin for a source connection.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<PathBuf>,
}

impl ConnectionDef {
  /// The input label, treating an empty string as absent.
  pub fn input_label(&self) -> Option<&str> {
    self.input.as_deref().filter(|label| !label.trim().is_empty())
  }

  /// True when this connection reads from a file rather than another block.
  pub fn is_source(&self) -> bool {
    self.input_label().is_none()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_is_source() {
    let conn = ConnectionDef {
      from_block: "reader".to_string(),
      from_entry: "read".to_string(),
      output: "raw".to_string(),
      input: Some(String::new()),
      source: Some(PathBuf::from("in.txt")),
    };
    assert!(conn.is_source());
    assert_eq!(conn.input_label(), None);
  }

  #[test]
  fn test_input_label() {
    let conn = ConnectionDef {
      from_block: "upper".to_string(),
      from_entry: "upper".to_string(),
      output: "shout".to_string(),
      input: Some("raw".to_string()),
      source: None,
    };
    assert!(!conn.is_source());
    assert_eq!(conn.input_label(), Some("raw"));
  }
}
