use atomos_config::{ExecutionMode, ExecutionSettings};
use atomos_executor::default_concurrency;

/// Engine-wide execution defaults. A manifest's `execution` settings take
/// precedence for that workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
  pub mode: ExecutionMode,
  /// Upper bound on concurrently running blocks in parallel mode.
  pub max_concurrency: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      mode: ExecutionMode::default(),
      max_concurrency: default_concurrency(),
    }
  }
}

impl EngineConfig {
  /// Apply a workflow's overrides on top of these defaults.
  pub fn with_overrides(&self, settings: Option<&ExecutionSettings>) -> Self {
    let Some(settings) = settings else {
      return self.clone();
    };
    Self {
      mode: settings.mode.unwrap_or(self.mode),
      max_concurrency: settings.max_concurrency.unwrap_or(self.max_concurrency),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_overrides() {
    let config = EngineConfig {
      mode: ExecutionMode::Parallel,
      max_concurrency: 8,
    };

    assert_eq!(config.with_overrides(None), config);

    let settings = ExecutionSettings {
      mode: Some(ExecutionMode::Sequential),
      max_concurrency: None,
    };
    let merged = config.with_overrides(Some(&settings));
    assert_eq!(merged.mode, ExecutionMode::Sequential);
    assert_eq!(merged.max_concurrency, 8);
  }
}
