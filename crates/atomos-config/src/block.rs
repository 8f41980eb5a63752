use serde::{Deserialize, Serialize};

/// A block the workflow depends on, fetched from a GitHub repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDef {
  /// Name of the block within this workflow. Connections refer to it.
  #[serde(default)]
  pub name: String,

  /// Release version, e.g. "v1.2.0". Empty means the latest release.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version: String,

  /// Repository identifier, e.g. "my-org/text-tools"
  #[serde(default)]
  pub github: String,

  /// Reinstall even when the block is already present locally.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub force: bool,
}

impl BlockDef {
  /// The requested version, or `None` when the latest release should be used.
  pub fn requested_version(&self) -> Option<&str> {
    let version = self.version.trim();
    if version.is_empty() || version == "latest" {
      None
    } else {
      Some(version)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_requested_version() {
    let mut block = BlockDef {
      name: "upper".to_string(),
      github: "my-org/text-tools".to_string(),
      ..Default::default()
    };
    assert_eq!(block.requested_version(), None);

    block.version = "latest".to_string();
    assert_eq!(block.requested_version(), None);

    block.version = " v1.0.0 ".to_string();
    assert_eq!(block.requested_version(), Some("v1.0.0"));
  }
}
