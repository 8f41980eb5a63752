use thiserror::Error;

/// Errors that can occur while installing or looking up blocks.
#[derive(Debug, Error)]
pub enum PackageError {
  /// Block is not installed locally.
  #[error("block not installed: {name}")]
  NotInstalled { name: String },

  /// The repository has no `agentic_support.yaml` on its main or master branch.
  #[error("no agentic_support.yaml found in {repo}")]
  ManifestNotFound { repo: String },

  /// The repository's `agentic_support.yaml` could not be parsed.
  #[error("invalid block manifest in {repo}: {source}")]
  InvalidManifest {
    repo: String,
    #[source]
    source: serde_yaml::Error,
  },

  /// No release matches the requested tag.
  #[error("release not found for tag '{tag}' in {repo} (tried with and without 'v')")]
  ReleaseNotFound { repo: String, tag: String },

  /// The block does not publish a binary for this OS/architecture.
  #[error("no binary found for platform {platform} in {repo}")]
  UnsupportedPlatform { repo: String, platform: String },

  /// The release does not contain the asset named by the block manifest.
  #[error("asset '{asset}' not found in release {tag}")]
  AssetNotFound { asset: String, tag: String },

  /// GitHub rejected the credentials.
  #[error("authentication failed for {repo} - check GITHUB_TOKEN")]
  Auth { repo: String },

  /// Unexpected HTTP status from GitHub.
  #[error("GitHub API error {status} for {url}: {body}")]
  Api { status: u16, url: String, body: String },

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Installed-block metadata could not be read or written.
  #[error("invalid block metadata: {0}")]
  InvalidMetadata(#[from] serde_json::Error),
}
