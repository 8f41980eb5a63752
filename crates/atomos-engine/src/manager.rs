//! Compiled workflow registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use atomos_config::WorkflowManifest;
use atomos_executor::{
  ExecutionNotifier, ExecutionReport, NoopNotifier, ResultStore, RunOptions, Scheduler,
};
use atomos_resolver::{ResolvedBlocks, Resolver};
use atomos_workflow::{Graph, Traversal, Workflow, roots, validate_labels};
use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// A workflow ready to run: its graph, the binaries its blocks resolved to,
/// and the results of its most recent run.
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
  pub workflow: Workflow,
  pub resolved: ResolvedBlocks,
  pub results: ResultStore,
}

/// Compiles workflow manifests and runs them by name.
///
/// Each manager owns its own registry, so several can coexist in one process.
/// Generic over `N: ExecutionNotifier` to allow different notification
/// strategies; `WorkflowManager::new` discards events.
pub struct WorkflowManager<R: Resolver, N: ExecutionNotifier = NoopNotifier> {
  resolver: R,
  config: EngineConfig,
  scheduler: Scheduler,
  notifier: N,
  workflows: HashMap<String, CompiledWorkflow>,
}

impl<R: Resolver> WorkflowManager<R, NoopNotifier> {
  pub fn new(resolver: R, config: EngineConfig) -> Self {
    Self::with_notifier(resolver, config, NoopNotifier)
  }
}

impl<R: Resolver, N: ExecutionNotifier> WorkflowManager<R, N> {
  pub fn with_notifier(resolver: R, config: EngineConfig, notifier: N) -> Self {
    Self {
      resolver,
      config,
      scheduler: Scheduler::new(),
      notifier,
      workflows: HashMap::new(),
    }
  }

  pub fn resolver(&self) -> &R {
    &self.resolver
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Compile the manifest at `path`. Relative source paths in the manifest
  /// are resolved against the manifest's directory.
  ///
  /// Returns the workflow name it was registered under.
  pub async fn compile_workflow(&mut self, path: impl AsRef<Path>) -> Result<String, EngineError> {
    let path = path.as_ref();
    let manifest = WorkflowManifest::from_path(path)?;
    let base_dir = match path.parent() {
      Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
      _ => PathBuf::from("."),
    };
    self.compile_manifest(&manifest, base_dir).await
  }

  /// Compile an in-memory manifest. Recompiling a name replaces the earlier
  /// workflow.
  #[instrument(skip(self, manifest, base_dir), fields(workflow = %manifest.workflow_name))]
  pub async fn compile_manifest(
    &mut self,
    manifest: &WorkflowManifest,
    base_dir: impl AsRef<Path>,
  ) -> Result<String, EngineError> {
    let workflow = Workflow::from_manifest(manifest, base_dir)?;
    let resolved = self.resolver.resolve_workflow(&workflow).await?;
    let name = workflow.name.clone();

    info!(
      workflow = %name,
      blocks = workflow.graph.vertices().len(),
      edges = workflow.graph.edges().len(),
      "workflow_compiled"
    );

    self.workflows.insert(
      name.clone(),
      CompiledWorkflow {
        workflow,
        resolved,
        results: ResultStore::new(),
      },
    );
    Ok(name)
  }

  /// Run a compiled workflow.
  ///
  /// Roots and labels are checked before any block runs. The result store is
  /// cleared first and kept afterwards, including after a failed run.
  #[instrument(skip(self))]
  pub async fn run_workflow(&mut self, name: &str) -> Result<ExecutionReport, EngineError> {
    let compiled = self
      .workflows
      .get_mut(name)
      .ok_or_else(|| EngineError::WorkflowNotFound {
        name: name.to_string(),
      })?;
    let workflow = &compiled.workflow;

    roots(&workflow.graph)?;
    let final_outputs = validate_labels(&workflow.graph, workflow.declared_outputs.as_deref())?;

    let config = self.config.with_overrides(workflow.execution.as_ref());
    let options = RunOptions {
      workflow: workflow.name.clone(),
      mode: config.mode,
      max_concurrency: config.max_concurrency,
      base_dir: workflow.base_dir.clone(),
      final_outputs,
    };

    compiled.results.clear();
    let report = self
      .scheduler
      .run(
        &workflow.graph,
        &compiled.resolved,
        &mut compiled.results,
        &options,
        &self.notifier,
      )
      .await?;
    Ok(report)
  }

  pub fn workflow(&self, name: &str) -> Result<&CompiledWorkflow, EngineError> {
    self
      .workflows
      .get(name)
      .ok_or_else(|| EngineError::WorkflowNotFound {
        name: name.to_string(),
      })
  }

  pub fn graph(&self, name: &str) -> Result<&Graph, EngineError> {
    Ok(&self.workflow(name)?.workflow.graph)
  }

  /// Installed metadata per block.
  pub fn metadata(&self, name: &str) -> Result<&ResolvedBlocks, EngineError> {
    Ok(&self.workflow(name)?.resolved)
  }

  /// Results of the most recent run.
  pub fn results(&self, name: &str) -> Result<&ResultStore, EngineError> {
    Ok(&self.workflow(name)?.results)
  }

  /// Block names grouped by traversal level.
  pub fn plan(&self, name: &str) -> Result<Vec<Vec<String>>, EngineError> {
    let graph = self.graph(name)?;
    let levels = Traversal::new(graph)?
      .plan()
      .into_iter()
      .map(|level| level.into_iter().map(str::to_string).collect())
      .collect();
    Ok(levels)
  }

  /// Names of compiled workflows, sorted.
  pub fn workflow_names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  pub fn remove_workflow(&mut self, name: &str) -> Result<CompiledWorkflow, EngineError> {
    self
      .workflows
      .remove(name)
      .ok_or_else(|| EngineError::WorkflowNotFound {
        name: name.to_string(),
      })
  }
}
