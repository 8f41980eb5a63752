//! atomos Workflow Engine
//!
//! This crate ties the pieces together behind [`WorkflowManager`]:
//!
//! ```text
//! compile_workflow(path)
//!   manifest  ── atomos-config     parse YAML/JSON
//!   graph     ── atomos-workflow   match outputs to inputs, reject cycles
//!   blocks    ── atomos-resolver   install binaries via the package manager
//!
//! run_workflow(name)
//!   roots + label checks           fail before anything is spawned
//!   scheduler ── atomos-executor   pipe results between block processes
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use atomos_engine::{EngineConfig, WorkflowManager};
//! use atomos_packages::{FsBlockStore, GithubInstaller};
//! use atomos_resolver::StandardResolver;
//!
//! let installer = GithubInstaller::from_env(FsBlockStore::new(data_dir))?;
//! let mut manager = WorkflowManager::new(StandardResolver::new(installer), EngineConfig::default());
//!
//! let name = manager.compile_workflow("pipeline.yaml").await?;
//! let report = manager.run_workflow(&name).await?;
//! ```

mod config;
mod error;
mod manager;

pub use config::EngineConfig;
pub use error::EngineError;
pub use manager::{CompiledWorkflow, WorkflowManager};

pub use atomos_executor::{
  ChannelNotifier, ExecutionEvent, ExecutionNotifier, ExecutionReport, NoopNotifier, ResultStore,
};
