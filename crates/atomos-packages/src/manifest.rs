use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The `agentic_support.yaml` file published at the root of a block repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockInfo {
  pub name: String,
  pub description: String,
  pub version: String,
  pub source: SourceSpec,
  pub binary: BinarySpec,
  pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSpec {
  #[serde(rename = "type")]
  pub kind: String,
  pub repo: String,
}

/// Where the binary comes from and which release asset to pick per platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarySpec {
  pub from: String,
  /// Platform key (e.g. "linux-amd64") -> release asset name.
  pub assets: HashMap<String, String>,
}

/// A command exposed by a block's CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
  pub name: String,
  pub command: String,
  pub description: String,
  pub inputs: Vec<Port>,
  pub outputs: Vec<Port>,
}

/// A declared input or output of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Port {
  pub name: String,
  #[serde(rename = "type")]
  pub kind: String,
}

impl BlockInfo {
  /// Parse the contents of an `agentic_support.yaml` file.
  pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(content)
  }

  /// Release asset name for the given platform key.
  pub fn asset_for(&self, platform: &str) -> Option<&str> {
    self.binary.assets.get(platform).map(String::as_str)
  }

  /// Entries keyed by name.
  pub fn entry_map(&self) -> HashMap<String, Entry> {
    self
      .entries
      .iter()
      .map(|entry| (entry.name.clone(), entry.clone()))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SUPPORT_YAML: &str = r#"
name: text-tools
description: Small text utilities
version: 0.3.1
source:
  type: github
  repo: my-org/text-tools
binary:
  from: release
  assets:
    linux-amd64: text-tools-linux-amd64
    darwin-arm64: text-tools-darwin-arm64
entries:
  - name: upper
    command: text-tools upper
    description: Upper-case stdin
    inputs:
      - name: text
        type: string
    outputs:
      - name: text
        type: string
  - name: count
    command: text-tools count
"#;

  #[test]
  fn test_parse_block_info() {
    let info = BlockInfo::from_yaml_str(SUPPORT_YAML).unwrap();

    assert_eq!(info.name, "text-tools");
    assert_eq!(info.source.kind, "github");
    assert_eq!(info.source.repo, "my-org/text-tools");
    assert_eq!(info.asset_for("linux-amd64"), Some("text-tools-linux-amd64"));
    assert_eq!(info.asset_for("windows-amd64"), None);

    let entries = info.entry_map();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["upper"].inputs[0].kind, "string");
    assert!(entries["count"].outputs.is_empty());
  }
}
