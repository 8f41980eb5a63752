//! Workflow scheduler.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use atomos_config::ExecutionMode;
use atomos_packages::InstalledBlock;
use atomos_workflow::{Graph, Traversal, roots};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use crate::block::{BlockExecutor, BlockTask, Produced};
use crate::error::ExecutionError;
use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::store::ResultStore;

/// Options for a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
  /// Workflow name, used in logs and events.
  pub workflow: String,
  pub mode: ExecutionMode,
  /// Maximum number of blocks running at once in parallel mode.
  pub max_concurrency: usize,
  /// Directory relative source paths are resolved against.
  pub base_dir: PathBuf,
  /// Labels reported as the workflow's outputs.
  pub final_outputs: Vec<String>,
}

impl Default for RunOptions {
  fn default() -> Self {
    Self {
      workflow: String::new(),
      mode: ExecutionMode::default(),
      max_concurrency: default_concurrency(),
      base_dir: PathBuf::from("."),
      final_outputs: Vec::new(),
    }
  }
}

/// Number of logical CPUs, falling back to 4.
pub fn default_concurrency() -> usize {
  std::thread::available_parallelism()
    .map(|n| n.get())
    .unwrap_or(4)
}

/// Result of a complete workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
  pub execution_id: String,
  /// Blocks in the order they completed.
  pub order: Vec<String>,
  pub results: ResultStore,
  /// Final output label -> text.
  pub outputs: HashMap<String, String>,
}

/// Drives blocks in dependency order and stages their outputs.
///
/// The scheduler loop is the only writer to the result store. Block tasks get
/// a copy of the labels they read.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
  executor: BlockExecutor,
}

impl Scheduler {
  pub fn new() -> Self {
    Self::default()
  }

  /// Run every block reachable from the roots.
  ///
  /// On the first failure the remaining blocks are abandoned (running children
  /// are killed) and the error is returned. Results written before the failure
  /// stay in `store`.
  #[instrument(
    name = "workflow_execute",
    skip_all,
    fields(workflow = %options.workflow, mode = ?options.mode)
  )]
  pub async fn run(
    &self,
    graph: &Graph,
    resolved: &HashMap<String, InstalledBlock>,
    store: &mut ResultStore,
    options: &RunOptions,
    notifier: &dyn ExecutionNotifier,
  ) -> Result<ExecutionReport, ExecutionError> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let run = Run {
      graph,
      resolved,
      options,
      notifier,
      execution_id: &execution_id,
    };

    info!(execution_id = %execution_id, "workflow_started");
    notifier.notify(ExecutionEvent::WorkflowStarted {
      execution_id: execution_id.clone(),
      workflow: options.workflow.clone(),
    });

    let mut order = Vec::new();
    let result = match options.mode {
      ExecutionMode::Sequential => self.run_sequential(&run, store, &mut order).await,
      ExecutionMode::Parallel => self.run_parallel(&run, store, &mut order).await,
    };

    if let Err(e) = result {
      error!(execution_id = %execution_id, error = %e, "workflow_failed");
      notifier.notify(ExecutionEvent::WorkflowFailed {
        execution_id,
        error: e.to_string(),
      });
      return Err(e);
    }

    info!(execution_id = %execution_id, blocks = order.len(), "workflow_completed");
    notifier.notify(ExecutionEvent::WorkflowCompleted {
      execution_id: execution_id.clone(),
    });

    let outputs = options
      .final_outputs
      .iter()
      .filter_map(|label| store.get(label).map(|text| (label.clone(), text)))
      .collect();

    Ok(ExecutionReport {
      execution_id,
      order,
      results: store.clone(),
      outputs,
    })
  }

  /// One block at a time, in breadth-first order.
  async fn run_sequential(
    &self,
    run: &Run<'_>,
    store: &mut ResultStore,
    order: &mut Vec<String>,
  ) -> Result<(), ExecutionError> {
    for visit in Traversal::new(run.graph)? {
      let name = visit.block.name.as_str();
      let task = run.task(name, store).map_err(|e| run.failed(name, e))?;
      run.started(name, visit.level);

      match self.executor.execute(task).await {
        Ok(produced) => run.record(name, produced, store),
        Err(e) => return Err(run.failed(name, e)),
      }
      order.push(name.to_string());
    }
    Ok(())
  }

  /// Data-flow execution: a block is dispatched once all its upstream blocks
  /// have completed, up to `max_concurrency` at a time.
  async fn run_parallel(
    &self,
    run: &Run<'_>,
    store: &mut ResultStore,
    order: &mut Vec<String>,
  ) -> Result<(), ExecutionError> {
    let graph = run.graph;
    let max = run.options.max_concurrency.max(1);

    let mut waiting: HashMap<&str, usize> = graph
      .vertices()
      .iter()
      .map(|b| (b.name.as_str(), graph.in_degree(&b.name)))
      .collect();
    let mut levels: HashMap<&str, usize> = HashMap::new();
    let mut ready: VecDeque<&str> = roots(graph)?
      .into_iter()
      .map(|b| b.name.as_str())
      .collect();
    let mut running: JoinSet<(String, Result<Vec<Produced>, ExecutionError>)> = JoinSet::new();

    loop {
      while running.len() < max {
        let Some(name) = ready.pop_front() else {
          break;
        };
        let task = match run.task(name, store) {
          Ok(task) => task,
          Err(e) => {
            running.shutdown().await;
            return Err(run.failed(name, e));
          }
        };
        run.started(name, levels.get(name).copied().unwrap_or(0));

        let executor = self.executor;
        running.spawn(async move {
          let block = task.block.clone();
          let result = executor.execute(task).await;
          (block, result)
        });
      }

      let Some(joined) = running.join_next().await else {
        break;
      };

      let (block, result) = match joined {
        Ok(done) => done,
        Err(e) => {
          running.shutdown().await;
          return Err(ExecutionError::TaskPanicked {
            message: e.to_string(),
          });
        }
      };

      let produced = match result {
        Ok(produced) => produced,
        Err(e) => {
          running.shutdown().await;
          return Err(run.failed(&block, e));
        }
      };
      run.record(&block, produced, store);

      let level = levels.get(block.as_str()).copied().unwrap_or(0);
      for next in graph.downstream(&block) {
        let next_level = levels.entry(next).or_insert(0);
        *next_level = (*next_level).max(level + 1);

        if let Some(count) = waiting.get_mut(next) {
          *count = count.saturating_sub(1);
          if *count == 0 {
            ready.push_back(next);
          }
        }
      }
      order.push(block);
    }

    Ok(())
  }
}

/// Per-run context shared by both scheduling modes.
struct Run<'a> {
  graph: &'a Graph,
  resolved: &'a HashMap<String, InstalledBlock>,
  options: &'a RunOptions,
  notifier: &'a dyn ExecutionNotifier,
  execution_id: &'a str,
}

impl Run<'_> {
  fn task(&self, name: &str, store: &ResultStore) -> Result<BlockTask, ExecutionError> {
    let connections: Vec<_> = self
      .graph
      .connections_of(name)
      .into_iter()
      .cloned()
      .collect();

    let binary = match self.resolved.get(name) {
      Some(installed) => installed.binary_path.clone(),
      // A block without connections never spawns anything.
      None if connections.is_empty() => PathBuf::new(),
      None => {
        return Err(ExecutionError::MissingMetadata {
          block: name.to_string(),
        });
      }
    };

    let inputs = store.subset(connections.iter().filter_map(|c| c.input.as_deref()));

    Ok(BlockTask {
      block: name.to_string(),
      binary,
      connections,
      inputs,
      base_dir: self.options.base_dir.clone(),
    })
  }

  fn started(&self, block: &str, level: usize) {
    info!(execution_id = %self.execution_id, block, level, "block_started");
    self.notifier.notify(ExecutionEvent::BlockStarted {
      execution_id: self.execution_id.to_string(),
      block: block.to_string(),
      level,
    });
  }

  fn record(&self, block: &str, produced: Vec<Produced>, store: &mut ResultStore) {
    for output in produced {
      self.notifier.notify(ExecutionEvent::OutputCaptured {
        execution_id: self.execution_id.to_string(),
        block: block.to_string(),
        label: output.label.clone(),
        bytes: output.text.len(),
      });
      store.insert(&output.label, output.connection, output.text);
    }

    info!(execution_id = %self.execution_id, block, "block_completed");
    self.notifier.notify(ExecutionEvent::BlockCompleted {
      execution_id: self.execution_id.to_string(),
      block: block.to_string(),
    });
  }

  fn failed(&self, block: &str, e: ExecutionError) -> ExecutionError {
    error!(execution_id = %self.execution_id, block, error = %e, "block_failed");
    self.notifier.notify(ExecutionEvent::BlockFailed {
      execution_id: self.execution_id.to_string(),
      block: block.to_string(),
      error: e.to_string(),
    });
    e
  }
}
