use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::PackageError;
use crate::fs_store::FsBlockStore;
use crate::manifest::BlockInfo;
use crate::platform::platform_key;
use crate::registry::{BlockInstaller, InstallRequest, InstalledBlock};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";
const SUPPORT_FILE: &str = "agentic_support.yaml";
const MANIFEST_BRANCHES: [&str; 2] = ["main", "master"];

/// A GitHub release as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubRelease {
  pub tag_name: String,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseAsset {
  pub id: u64,
  pub name: String,
  pub browser_download_url: String,
  #[serde(default)]
  pub size: u64,
}

impl GithubRelease {
  pub fn asset(&self, name: &str) -> Option<&ReleaseAsset> {
    self.assets.iter().find(|asset| asset.name == name)
  }
}

/// Installs blocks from GitHub releases into a [`FsBlockStore`].
///
/// The block's `agentic_support.yaml` is read from the repository's default
/// branch, the release is resolved by tag (or latest), and the asset for the
/// current platform is downloaded into the store.
pub struct GithubInstaller {
  client: Client,
  store: FsBlockStore,
  token: Option<String>,
  api_base: String,
  raw_base: String,
}

impl GithubInstaller {
  pub fn new(store: FsBlockStore) -> Result<Self, PackageError> {
    let client = Client::builder()
      .user_agent("atomos")
      .timeout(Duration::from_secs(30))
      .build()?;

    Ok(Self {
      client,
      store,
      token: None,
      api_base: DEFAULT_API_BASE.to_string(),
      raw_base: DEFAULT_RAW_BASE.to_string(),
    })
  }

  /// Like [`GithubInstaller::new`], picking up `GITHUB_TOKEN` if set.
  pub fn from_env(store: FsBlockStore) -> Result<Self, PackageError> {
    let token = std::env::var("GITHUB_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty());
    Ok(Self::new(store)?.with_token(token))
  }

  pub fn with_token(mut self, token: Option<String>) -> Self {
    self.token = token;
    self
  }

  /// Point the installer at different API and raw-content hosts.
  pub fn with_endpoints(mut self, api_base: impl Into<String>, raw_base: impl Into<String>) -> Self {
    self.api_base = api_base.into().trim_end_matches('/').to_string();
    self.raw_base = raw_base.into().trim_end_matches('/').to_string();
    self
  }

  pub fn store(&self) -> &FsBlockStore {
    &self.store
  }

  fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  /// Fetch and parse `agentic_support.yaml`, trying `main` then `master`.
  #[instrument(skip(self))]
  pub async fn fetch_block_info(&self, repo: &str) -> Result<BlockInfo, PackageError> {
    for branch in MANIFEST_BRANCHES {
      let url = format!("{}/{}/{}/{}", self.raw_base, repo, branch, SUPPORT_FILE);
      let response = self.authorized(self.client.get(&url)).send().await?;

      if response.status() == StatusCode::NOT_FOUND {
        debug!(branch, "support file not on branch");
        continue;
      }
      let body = check_status(response, repo, &url).await?.text().await?;

      return BlockInfo::from_yaml_str(&body).map_err(|source| PackageError::InvalidManifest {
        repo: repo.to_string(),
        source,
      });
    }

    Err(PackageError::ManifestNotFound {
      repo: repo.to_string(),
    })
  }

  #[instrument(skip(self))]
  pub async fn latest_release(&self, repo: &str) -> Result<GithubRelease, PackageError> {
    let url = format!("{}/repos/{}/releases/latest", self.api_base, repo);
    let response = self.api_get(&url).await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Err(PackageError::ReleaseNotFound {
        repo: repo.to_string(),
        tag: "latest".to_string(),
      });
    }
    Ok(check_status(response, repo, &url).await?.json().await?)
  }

  /// Look up a release by tag, tolerating a missing or extra `v` prefix.
  #[instrument(skip(self))]
  pub async fn release_by_tag(&self, repo: &str, tag: &str) -> Result<GithubRelease, PackageError> {
    for candidate in tag_candidates(tag) {
      let url = format!("{}/repos/{}/releases/tags/{}", self.api_base, repo, candidate);
      let response = self.api_get(&url).await?;
      if response.status() == StatusCode::NOT_FOUND {
        continue;
      }
      return Ok(check_status(response, repo, &url).await?.json().await?);
    }

    Err(PackageError::ReleaseNotFound {
      repo: repo.to_string(),
      tag: tag.to_string(),
    })
  }

  async fn api_get(&self, url: &str) -> Result<Response, PackageError> {
    let request = self
      .client
      .get(url)
      .header("Accept", "application/vnd.github+json");
    Ok(self.authorized(request).send().await?)
  }

  /// Download the platform's asset for `release` into the store.
  async fn download_binary(
    &self,
    repo: &str,
    info: &BlockInfo,
    release: &GithubRelease,
  ) -> Result<PathBuf, PackageError> {
    let platform = platform_key();
    let asset_name = info
      .asset_for(&platform)
      .ok_or_else(|| PackageError::UnsupportedPlatform {
        repo: repo.to_string(),
        platform: platform.clone(),
      })?;

    let asset = release
      .asset(asset_name)
      .ok_or_else(|| PackageError::AssetNotFound {
        asset: asset_name.to_string(),
        tag: release.tag_name.clone(),
      })?;

    info!(asset = %asset.name, size = asset.size, "downloading_block_binary");
    let response = self
      .authorized(self.client.get(&asset.browser_download_url))
      .send()
      .await?;
    let bytes = check_status(response, repo, &asset.browser_download_url)
      .await?
      .bytes()
      .await?;

    let dir = self.store.binary_dir(&info.name);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(&asset.name);
    tokio::fs::write(&path, &bytes).await?;
    make_executable(&path).await?;

    Ok(path)
  }

  async fn install_release(
    &self,
    repo: &str,
    info: &BlockInfo,
    release: &GithubRelease,
    previous: Option<&InstalledBlock>,
  ) -> Result<InstalledBlock, PackageError> {
    let binary_path = self.download_binary(repo, info, release).await?;

    if let Some(old) = previous {
      if old.binary_path != binary_path {
        match tokio::fs::remove_file(&old.binary_path).await {
          Ok(()) => {}
          Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
          Err(e) => return Err(e.into()),
        }
      }
    }

    let now = Utc::now();
    let block = InstalledBlock {
      name: info.name.clone(),
      version: release.tag_name.clone(),
      source_repo: repo.to_string(),
      binary_path,
      installed_at: previous.map(|b| b.installed_at).unwrap_or(now),
      last_updated: now,
      entries: info.entry_map(),
    };
    self.store.save(&block).await?;

    info!(block = %block.name, version = %block.version, "block_installed");
    Ok(block)
  }

  async fn resolve_release(
    &self,
    repo: &str,
    version: Option<&str>,
  ) -> Result<GithubRelease, PackageError> {
    match version {
      Some(tag) => self.release_by_tag(repo, tag).await,
      None => self.latest_release(repo).await,
    }
  }

  /// Move an installed block to another release (latest when `version` is `None`).
  ///
  /// Returns `None` when the block is already at the target version.
  #[instrument(skip(self))]
  pub async fn update(
    &self,
    name: &str,
    version: Option<&str>,
  ) -> Result<Option<InstalledBlock>, PackageError> {
    let current = self
      .store
      .get(name)
      .await?
      .ok_or_else(|| PackageError::NotInstalled {
        name: name.to_string(),
      })?;

    let release = self.resolve_release(&current.source_repo, version).await?;
    if same_tag(&release.tag_name, &current.version) {
      info!(block = name, version = %current.version, "block_up_to_date");
      return Ok(None);
    }

    let info = self.fetch_block_info(&current.source_repo).await?;
    let updated = self
      .install_release(&current.source_repo, &info, &release, Some(&current))
      .await?;
    Ok(Some(updated))
  }
}

#[async_trait]
impl BlockInstaller for GithubInstaller {
  #[instrument(skip(self), fields(repo = %request.repo))]
  async fn install(&self, request: &InstallRequest) -> Result<InstalledBlock, PackageError> {
    let info = self.fetch_block_info(&request.repo).await?;

    let existing = self.store.get(&info.name).await?;
    if let Some(installed) = &existing {
      let wanted = request.version.as_deref();
      let satisfied = wanted.is_none_or(|tag| same_tag(tag, &installed.version));
      let present = self.store.has_binary(installed).await;
      if !present {
        warn!(block = %installed.name, binary = %installed.binary_path.display(), "block_binary_missing");
      }
      if !request.force && satisfied && present {
        debug!(block = %installed.name, version = %installed.version, "block_already_installed");
        return Ok(installed.clone());
      }
    }

    let release = self
      .resolve_release(&request.repo, request.version.as_deref())
      .await?;
    self
      .install_release(&request.repo, &info, &release, existing.as_ref())
      .await
  }

  async fn get(&self, name: &str) -> Result<Option<InstalledBlock>, PackageError> {
    self.store.get(name).await
  }

  async fn list(&self) -> Result<Vec<InstalledBlock>, PackageError> {
    self.store.list().await
  }

  async fn remove(&self, name: &str) -> Result<(), PackageError> {
    self.store.remove(name).await?;
    info!(block = name, "block_removed");
    Ok(())
  }
}

/// Map non-success statuses to errors, passing successful responses through.
async fn check_status(response: Response, repo: &str, url: &str) -> Result<Response, PackageError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
    return Err(PackageError::Auth {
      repo: repo.to_string(),
    });
  }
  let body = response.text().await.unwrap_or_default();
  Err(PackageError::Api {
    status: status.as_u16(),
    url: url.to_string(),
    body,
  })
}

/// Tags to try for a requested version: as given, then with the `v` prefix toggled.
fn tag_candidates(tag: &str) -> Vec<String> {
  let alternate = match tag.strip_prefix('v') {
    Some(bare) => bare.to_string(),
    None => format!("v{}", tag),
  };
  if alternate.is_empty() {
    return vec![tag.to_string()];
  }
  vec![tag.to_string(), alternate]
}

fn same_tag(a: &str, b: &str) -> bool {
  a.trim_start_matches('v') == b.trim_start_matches('v')
}

#[cfg(unix)]
async fn make_executable(path: &std::path::Path) -> Result<(), PackageError> {
  use std::os::unix::fs::PermissionsExt;
  tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
  Ok(())
}

#[cfg(not(unix))]
async fn make_executable(_path: &std::path::Path) -> Result<(), PackageError> {
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use mockito::{Server, ServerGuard};

  use super::*;

  fn support_yaml() -> String {
    format!(
      "name: tools\nversion: 1.0.0\nbinary:\n  from: release\n  assets:\n    {}: tools-bin\nentries:\n  - name: upper\n",
      platform_key()
    )
  }

  fn release_json(server: &ServerGuard) -> String {
    serde_json::json!({
      "tag_name": "v1.0.0",
      "assets": [{
        "id": 1,
        "name": "tools-bin",
        "browser_download_url": format!("{}/download/tools-bin", server.url()),
        "size": 9
      }]
    })
    .to_string()
  }

  fn recorded(name: &str, binary_path: PathBuf) -> InstalledBlock {
    InstalledBlock {
      name: name.to_string(),
      version: "v1.0.0".to_string(),
      source_repo: format!("o/{}", name),
      binary_path,
      installed_at: Utc::now(),
      last_updated: Utc::now(),
      entries: HashMap::new(),
    }
  }

  #[test]
  fn test_tag_candidates() {
    assert_eq!(tag_candidates("v1.2.0"), vec!["v1.2.0", "1.2.0"]);
    assert_eq!(tag_candidates("1.2.0"), vec!["1.2.0", "v1.2.0"]);
    assert_eq!(tag_candidates("v"), vec!["v"]);
  }

  #[test]
  fn test_same_tag() {
    assert!(same_tag("v1.0.0", "1.0.0"));
    assert!(same_tag("1.0.0", "1.0.0"));
    assert!(!same_tag("v1.0.0", "v1.0.1"));
  }

  #[test]
  fn test_release_asset_lookup() {
    let release: GithubRelease = serde_json::from_str(
      r#"{
        "tag_name": "v0.3.1",
        "name": "0.3.1",
        "assets": [
          {"id": 7, "name": "text-tools-linux-amd64", "browser_download_url": "https://example.com/a", "size": 42}
        ]
      }"#,
    )
    .unwrap();

    assert_eq!(release.asset("text-tools-linux-amd64").map(|a| a.id), Some(7));
    assert!(release.asset("text-tools-darwin-arm64").is_none());
  }

  #[tokio::test]
  async fn test_installer_delegates_to_store() {
    let dir = tempfile::tempdir().unwrap();
    let installer = GithubInstaller::new(FsBlockStore::new(dir.path())).unwrap();

    assert!(installer.list().await.unwrap().is_empty());
    assert!(installer.get("upper").await.unwrap().is_none());
    assert!(matches!(
      installer.remove("upper").await,
      Err(PackageError::NotInstalled { .. })
    ));
  }

  #[tokio::test]
  async fn test_install_replaces_missing_binary() {
    let mut server = Server::new_async().await;
    let _support = server
      .mock("GET", "/o/tools/main/agentic_support.yaml")
      .with_status(200)
      .with_body(support_yaml())
      .create_async()
      .await;
    let release = server
      .mock("GET", "/repos/o/tools/releases/latest")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(release_json(&server))
      .expect(1)
      .create_async()
      .await;
    let download = server
      .mock("GET", "/download/tools-bin")
      .with_status(200)
      .with_body("#!/bin/sh")
      .expect(1)
      .create_async()
      .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FsBlockStore::new(dir.path());
    let gone = store.binary_dir("tools").join("gone");
    store.save(&recorded("tools", gone.clone())).await.unwrap();

    let installer = GithubInstaller::new(store)
      .unwrap()
      .with_endpoints(server.url(), server.url());
    let block = installer.install(&InstallRequest::new("o/tools")).await.unwrap();

    release.assert_async().await;
    download.assert_async().await;
    assert_ne!(block.binary_path, gone);
    assert_eq!(block.binary_path, installer.store().binary_dir("tools").join("tools-bin"));
    assert_eq!(std::fs::read_to_string(&block.binary_path).unwrap(), "#!/bin/sh");
    assert!(block.accepts_entry("upper"));
    assert!(installer.store().validate().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_install_reuses_present_binary() {
    let mut server = Server::new_async().await;
    let _support = server
      .mock("GET", "/o/tools/main/agentic_support.yaml")
      .with_status(200)
      .with_body(support_yaml())
      .create_async()
      .await;
    let release = server
      .mock("GET", "/repos/o/tools/releases/latest")
      .with_status(200)
      .with_body(release_json(&server))
      .expect(0)
      .create_async()
      .await;

    let dir = tempfile::tempdir().unwrap();
    let binary = dir.path().join("tools-bin");
    std::fs::write(&binary, "#!/bin/sh").unwrap();
    let store = FsBlockStore::new(dir.path());
    store.save(&recorded("tools", binary.clone())).await.unwrap();

    let installer = GithubInstaller::new(store)
      .unwrap()
      .with_endpoints(server.url(), server.url());
    let block = installer.install(&InstallRequest::new("o/tools")).await.unwrap();

    release.assert_async().await;
    assert_eq!(block.binary_path, binary);
  }
}
