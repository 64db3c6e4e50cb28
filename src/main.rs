use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use carryover_config::StepParams;
use carryover_store::FsStateStore;
use carryover_sync::{Synchronizer, TracingConsole, capture};

/// Carryover - restores resource state between build pipeline runs
#[derive(Parser)]
#[command(name = "carryover")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the state store directory (default: ~/.carryover/store)
  #[arg(long, global = true)]
  store_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Restore a resource's files from the previous run
  Sync {
    /// Path to the step parameters file (JSON), or `-` for stdin
    params_file: PathBuf,
  },

  /// Record a resource's files as a new snapshot
  Capture {
    /// Path to the step parameters file (JSON), or `-` for stdin
    params_file: PathBuf,
  },

  /// Print the files of a stored snapshot
  Show {
    /// The resource identifier in the store
    resource_id: String,

    /// The content identifier of the snapshot
    content_id: String,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let store_dir = match cli.store_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".carryover")
      .join("store"),
  };

  match cli.command {
    Some(Commands::Sync { params_file }) => block_on(run_sync(params_file, store_dir))?,
    Some(Commands::Capture { params_file }) => block_on(run_capture(params_file, store_dir))?,
    Some(Commands::Show {
      resource_id,
      content_id,
    }) => block_on(run_show(resource_id, content_id, store_dir))?,
    None => {
      println!("carryover - use --help to see available commands");
    }
  }

  Ok(())
}

fn block_on<F: Future<Output = Result<()>>>(future: F) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(future)
}

async fn run_sync(params_file: PathBuf, store_dir: PathBuf) -> Result<()> {
  let params = read_params(&params_file).await?;
  eprintln!(
    "Syncing resource: {} ({})",
    params.resource.name, params.resource.resource_type
  );

  let synchronizer = Synchronizer::new(
    Arc::new(FsStateStore::new(store_dir)),
    Arc::new(TracingConsole),
  )
  .with_config(params.sync.clone());

  let report = synchronizer
    .synchronize(&params.resource, &params.workspace_root)
    .await
    .with_context(|| format!("failed to sync resource '{}'", params.resource.name))?;

  println!("{}", serde_json::to_string_pretty(&report)?);

  Ok(())
}

async fn run_capture(params_file: PathBuf, store_dir: PathBuf) -> Result<()> {
  let params = read_params(&params_file).await?;
  let resource = &params.resource;
  if resource.resource_id.is_empty() {
    bail!("resource '{}' has no resourceId to capture under", resource.name);
  }

  let snapshot = capture(&params.workspace_root, resource)
    .await
    .with_context(|| format!("failed to capture resource '{}'", resource.name))?;

  info!(content_id = %snapshot.content_id, files = snapshot.len(), "snapshot captured");

  FsStateStore::new(store_dir)
    .put_snapshot(&resource.resource_id, &snapshot)
    .await
    .context("failed to store snapshot")?;

  println!("{}", snapshot.content_id);

  Ok(())
}

async fn run_show(resource_id: String, content_id: String, store_dir: PathBuf) -> Result<()> {
  let snapshot = FsStateStore::new(store_dir)
    .get_snapshot(&resource_id, &content_id)
    .await
    .with_context(|| format!("failed to load snapshot {}/{}", resource_id, content_id))?;

  let files: Vec<serde_json::Value> = snapshot
    .files
    .iter()
    .map(|f| {
      serde_json::json!({
        "path": f.relative_path,
        "mode": format!("{:o}", f.permissions),
        "size": f.contents.len(),
      })
    })
    .collect();

  println!(
    "{}",
    serde_json::to_string_pretty(&serde_json::json!({
      "resourceId": resource_id,
      "contentId": snapshot.content_id,
      "files": files,
    }))?
  );

  Ok(())
}

async fn read_params(params_file: &Path) -> Result<StepParams> {
  let content = if params_file == Path::new("-") {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read step parameters from stdin")?;
    input
  } else {
    tokio::fs::read_to_string(params_file)
      .await
      .with_context(|| format!("failed to read params file: {}", params_file.display()))?
  };

  StepParams::from_json(&content)
    .with_context(|| format!("invalid step parameters: {}", params_file.display()))
}
