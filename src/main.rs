use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use atomos_config::ExecutionMode;
use atomos_engine::{ChannelNotifier, EngineConfig, ExecutionEvent, ExecutionReport, WorkflowManager};
use atomos_packages::{BlockInstaller, FsBlockStore, GithubInstaller, InstallRequest, InstalledBlock};
use atomos_resolver::StandardResolver;

/// atomos - chain block binaries from GitHub releases into workflows
#[derive(Parser)]
#[command(name = "atomos")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.atomos)
  #[arg(long, global = true, env = "ATOMOS_HOME")]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Install a block from a GitHub repository (owner/repo)
  Install {
    repo: String,

    /// Release tag to install (default: latest)
    #[arg(long)]
    version: Option<String>,

    /// Reinstall even if already installed
    #[arg(long)]
    force: bool,
  },

  /// Update an installed block to the latest or a given release
  Update {
    name: String,

    #[arg(long)]
    version: Option<String>,
  },

  /// List installed blocks
  List,

  /// Show an installed block's metadata and entries
  Info { name: String },

  /// Check that every installed block still has its binary
  Doctor,

  /// Remove an installed block
  Uninstall { name: String },

  /// Compile a workflow and print its execution plan
  Plan {
    /// Path to the workflow file (YAML or JSON)
    workflow_file: PathBuf,
  },

  /// Compile and run a workflow
  Run {
    /// Path to the workflow file (YAML or JSON)
    workflow_file: PathBuf,

    /// Run one block at a time in breadth-first order
    #[arg(long)]
    sequential: bool,

    /// Maximum number of blocks running at once
    #[arg(long)]
    max_concurrency: Option<usize>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".atomos"),
  };

  let Some(command) = cli.command else {
    println!("atomos - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { dispatch(command, data_dir).await })
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn installer(data_dir: &Path) -> Result<GithubInstaller> {
  GithubInstaller::from_env(FsBlockStore::new(data_dir)).context("failed to create GitHub client")
}

async fn dispatch(command: Commands, data_dir: PathBuf) -> Result<()> {
  match command {
    Commands::Install {
      repo,
      version,
      force,
    } => {
      let request = InstallRequest::new(&repo)
        .with_version(version)
        .with_force(force);
      let block = installer(&data_dir)?
        .install(&request)
        .await
        .with_context(|| format!("failed to install {}", repo))?;
      println!(
        "{} {} -> {}",
        block.name,
        block.version,
        block.binary_path.display()
      );
    }
    Commands::Update { name, version } => {
      let updated = installer(&data_dir)?
        .update(&name, version.as_deref())
        .await
        .with_context(|| format!("failed to update {}", name))?;
      match updated {
        Some(block) => println!("{} updated to {}", block.name, block.version),
        None => println!("{} is already up to date", name),
      }
    }
    Commands::List => {
      let blocks = installer(&data_dir)?.list().await?;
      if blocks.is_empty() {
        println!("no blocks installed");
      }
      for block in blocks {
        println!("{}\t{}\t{}", block.name, block.version, block.source_repo);
      }
    }
    Commands::Info { name } => {
      let block = installer(&data_dir)?
        .get(&name)
        .await?
        .with_context(|| format!("block '{}' is not installed", name))?;
      print!("{}", describe_block(&block));
    }
    Commands::Doctor => {
      let store = FsBlockStore::new(&data_dir);
      let stats = store.stats().await?;
      println!("data dir:      {}", stats.root.display());
      println!("blocks:        {}", stats.total_blocks);
      println!("binary bytes:  {}", stats.total_binary_bytes);

      let missing = store.validate().await?;
      for block in &missing {
        println!("missing binary: {} ({})", block.name, block.binary_path.display());
      }
      if !missing.is_empty() {
        anyhow::bail!(
          "{} block(s) have metadata but no binary; reinstall them with `atomos install --force`",
          missing.len()
        );
      }
    }
    Commands::Uninstall { name } => {
      installer(&data_dir)?
        .remove(&name)
        .await
        .with_context(|| format!("failed to uninstall {}", name))?;
      info!(block = %name, "block_uninstalled");
      println!("removed {}", name);
    }
    Commands::Plan { workflow_file } => {
      let resolver = StandardResolver::new(installer(&data_dir)?);
      let mut manager = WorkflowManager::new(resolver, EngineConfig::default());
      let name = manager
        .compile_workflow(&workflow_file)
        .await
        .with_context(|| format!("failed to compile {}", workflow_file.display()))?;

      for (level, blocks) in manager.plan(&name)?.iter().enumerate() {
        println!("{}: {}", level, blocks.join(", "));
      }
    }
    Commands::Run {
      workflow_file,
      sequential,
      max_concurrency,
    } => {
      let mut config = EngineConfig::default();
      if sequential {
        config.mode = ExecutionMode::Sequential;
      }
      if let Some(max) = max_concurrency {
        config.max_concurrency = max;
      }

      let report = run_workflow(workflow_file, data_dir, config).await?;
      print_outputs(&report);
    }
  }

  Ok(())
}

async fn run_workflow(workflow_file: PathBuf, data_dir: PathBuf, config: EngineConfig) -> Result<ExecutionReport> {
  let (tx, rx) = mpsc::unbounded_channel();
  let progress = tokio::spawn(print_progress(rx));

  let resolver = StandardResolver::new(installer(&data_dir)?);
  let mut manager = WorkflowManager::with_notifier(resolver, config, ChannelNotifier::new(tx));

  let name = manager
    .compile_workflow(&workflow_file)
    .await
    .with_context(|| format!("failed to compile {}", workflow_file.display()))?;
  info!(workflow = %name, "workflow_compiled");

  let result = manager.run_workflow(&name).await;

  // Closing the channel lets the progress printer finish.
  drop(manager);
  let _ = progress.await;

  if let Err(e) = &result {
    warn!(workflow = %name, error = %e, "workflow_failed");
  }
  result.with_context(|| format!("workflow '{}' failed", name))
}

async fn print_progress(mut rx: mpsc::UnboundedReceiver<ExecutionEvent>) {
  while let Some(event) = rx.recv().await {
    match event {
      ExecutionEvent::BlockStarted { block, level, .. } => {
        eprintln!("[{}] {} started", level, block);
      }
      ExecutionEvent::BlockCompleted { block, .. } => eprintln!("    {} done", block),
      ExecutionEvent::BlockFailed { block, error, .. } => {
        eprintln!("    {} failed: {}", block, error);
      }
      _ => {}
    }
  }
}

fn print_outputs(report: &ExecutionReport) {
  info!(
    execution_id = %report.execution_id,
    blocks = report.order.len(),
    "execution_completed"
  );

  if report.outputs.len() == 1 {
    if let Some(text) = report.outputs.values().next() {
      print!("{}", text);
    }
    return;
  }

  let mut labels: Vec<&String> = report.outputs.keys().collect();
  labels.sort();
  for label in labels {
    println!("== {} ==", label);
    print!("{}", report.outputs[label]);
  }
}

/// Human-readable summary of an installed block, entries sorted by name.
fn describe_block(block: &InstalledBlock) -> String {
  let mut out = format!(
    "name:       {}\nversion:    {}\nrepository: {}\nbinary:     {}\ninstalled:  {}\nupdated:    {}\n",
    block.name,
    block.version,
    block.source_repo,
    block.binary_path.display(),
    block.installed_at.to_rfc3339(),
    block.last_updated.to_rfc3339(),
  );

  if block.entries.is_empty() {
    out.push_str("entries:    (none declared)\n");
    return out;
  }

  out.push_str("entries:\n");
  let mut names: Vec<&String> = block.entries.keys().collect();
  names.sort();
  for name in names {
    let entry = &block.entries[name];
    if entry.description.is_empty() {
      out.push_str(&format!("  {}\n", name));
    } else {
      out.push_str(&format!("  {} - {}\n", name, entry.description));
    }
  }
  out
}
