//! atomos Packages
//!
//! Installs blocks: platform-specific binaries published as GitHub release
//! assets, described by an `agentic_support.yaml` file at the root of the
//! block's repository.
//!
//! The workflow engine only depends on the [`BlockInstaller`] trait. The
//! [`GithubInstaller`] implementation downloads release assets and records
//! what it installed in an [`FsBlockStore`].

mod error;
mod fs_store;
mod github;
mod manifest;
mod platform;
mod registry;

pub use error::PackageError;
pub use fs_store::{FsBlockStore, StoreStats};
pub use github::{GithubInstaller, GithubRelease, ReleaseAsset};
pub use manifest::{BinarySpec, BlockInfo, Entry, Port, SourceSpec};
pub use platform::platform_key;
pub use registry::{BlockInstaller, InstallRequest, InstalledBlock};
