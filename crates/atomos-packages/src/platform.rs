/// Platform key used in `agentic_support.yaml` asset maps, e.g. `linux-amd64`.
///
/// Block authors publish with Go-style OS and architecture names, so the Rust
/// target names are translated.
pub fn platform_key() -> String {
  platform_key_for(std::env::consts::OS, std::env::consts::ARCH)
}

fn platform_key_for(os: &str, arch: &str) -> String {
  let os = match os {
    "macos" => "darwin",
    other => other,
  };
  let arch = match arch {
    "x86_64" => "amd64",
    "aarch64" => "arm64",
    "x86" => "386",
    "powerpc64" => "ppc64",
    other => other,
  };
  format!("{}-{}", os, arch)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_platform_key_translation() {
    assert_eq!(platform_key_for("linux", "x86_64"), "linux-amd64");
    assert_eq!(platform_key_for("macos", "aarch64"), "darwin-arm64");
    assert_eq!(platform_key_for("windows", "x86"), "windows-386");
    assert_eq!(platform_key_for("freebsd", "riscv64"), "freebsd-riscv64");
  }

  #[test]
  fn test_platform_key_current() {
    let key = platform_key();
    assert!(key.contains('-'));
    assert!(!key.starts_with("macos"));
  }
}
