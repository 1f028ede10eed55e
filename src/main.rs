use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use webalea_cache::{CacheConfig, ObjectCache};
use webalea_config::{CompositeNode, NodeSpec};
use webalea_registry::{BuiltinRegistry, describe_package, list_packages};
use webalea_runtime::{CompositeExecutor, ExecutionResult, NodeEvaluator, NodeExecutor, SubprocessRunner, serve};
use webalea_visualizer::VisualizationResolver;

/// webalea - execution core for OpenAlea dataflow graphs
#[derive(Parser)]
#[command(name = "webalea")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Object cache directory (default: $OPENALEA_CACHE_DIR, else a temp dir)
  #[arg(long, global = true)]
  cache_dir: Option<PathBuf>,

  /// Cache entry lifetime in seconds (default: $OPENALEA_CACHE_TTL_SECONDS, else 3600)
  #[arg(long, global = true)]
  cache_ttl: Option<u64>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Execute one request read from stdin and print the result (worker process entrypoint)
  Worker,

  /// Run a node or a composite graph
  Run {
    #[command(subcommand)]
    target: RunTarget,
  },

  /// Resolve a visualization payload into a scene
  Visualize {
    /// The node the payload belongs to
    #[arg(long)]
    node_id: String,

    /// Path to the payload JSON (default: stdin)
    payload_file: Option<PathBuf>,
  },

  /// Manage the object cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },

  /// Inspect the node registry
  Packages {
    #[command(subcommand)]
    action: PackagesAction,
  },
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run a single node in a worker process
  Node {
    #[arg(long)]
    package: String,

    #[arg(long)]
    node: String,

    /// Inputs as a JSON object (default: stdin)
    #[arg(long)]
    inputs: Option<String>,

    /// Wall-clock limit in seconds
    #[arg(long, default_value_t = 60.0)]
    timeout: f64,
  },

  /// Run a node described by a node spec file
  Spec {
    /// Path to the node spec JSON
    spec_file: PathBuf,

    /// Wall-clock limit in seconds
    #[arg(long, default_value_t = 60.0)]
    timeout: f64,
  },

  /// Run a composite graph
  Composite {
    /// Path to the composite JSON
    composite_file: PathBuf,

    /// Run every node in its own worker instead of the whole graph in one
    #[arg(long)]
    isolate_nodes: bool,

    /// Wall-clock limit in seconds, per worker
    #[arg(long, default_value_t = 60.0)]
    timeout: f64,
  },
}

#[derive(Subcommand)]
enum CacheAction {
  /// Remove entries older than the TTL
  Cleanup {
    /// Override the configured TTL in seconds
    #[arg(long)]
    ttl: Option<i64>,
  },
}

#[derive(Subcommand)]
enum PackagesAction {
  /// List package names
  List,

  /// Describe the nodes of a package
  Describe { name: String },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  // Logs go to stderr; a worker's stdout carries only its result.
  tracing_subscriber::fmt()
    .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
    .with_writer(io::stderr)
    .init();

  let mut cache_config = CacheConfig::from_env();
  if let Some(dir) = cli.cache_dir {
    cache_config.dir = dir;
  }
  if let Some(ttl) = cli.cache_ttl {
    cache_config.ttl_seconds = ttl;
  }

  match cli.command {
    Some(Commands::Worker) => run_worker(cache_config)?,
    Some(Commands::Run { target }) => match target {
      RunTarget::Node {
        package,
        node,
        inputs,
        timeout,
      } => {
        let inputs: serde_json::Value = match inputs {
          Some(raw) => serde_json::from_str(&raw).context("failed to parse --inputs")?,
          None => read_json_from_stdin()?,
        };
        let serde_json::Value::Object(inputs) = inputs else {
          anyhow::bail!("inputs must be a JSON object");
        };
        let node_id = format!("{}.{}", package, node);
        run_node(&cache_config, &node_id, &package, &node, inputs, timeout)?;
      }
      RunTarget::Spec { spec_file, timeout } => {
        let spec: NodeSpec = read_json_file(&spec_file)?;
        run_node(
          &cache_config,
          &spec.id,
          &spec.package_name,
          &spec.node_name,
          spec.input_values(),
          timeout,
        )?;
      }
      RunTarget::Composite {
        composite_file,
        isolate_nodes,
        timeout,
      } => {
        let composite: CompositeNode = read_json_file(&composite_file)?;
        run_composite(&cache_config, &composite, isolate_nodes, timeout)?;
      }
    },
    Some(Commands::Visualize {
      node_id,
      payload_file,
    }) => {
      let payload = match payload_file {
        Some(path) => read_json_file(&path)?,
        None => read_json_from_stdin()?,
      };
      let cache = ObjectCache::new(cache_config);
      let response = VisualizationResolver::new(&cache).resolve(&node_id, &payload);
      println!("{}", serde_json::to_string_pretty(&response)?);
    }
    Some(Commands::Cache {
      action: CacheAction::Cleanup { ttl },
    }) => {
      let cache = ObjectCache::new(cache_config);
      let removed = cache.cleanup(ttl).context("cache cleanup failed")?;
      println!("{}", json!({ "removed": removed }));
    }
    Some(Commands::Packages { action }) => {
      let registry = BuiltinRegistry::new();
      match action {
        PackagesAction::List => {
          println!("{}", serde_json::to_string_pretty(&list_packages(&registry))?);
        }
        PackagesAction::Describe { name } => {
          let description = describe_package(&registry, &name)?;
          println!("{}", serde_json::to_string_pretty(&description)?);
        }
      }
    }
    None => {
      println!("webalea - use --help to see available commands");
    }
  }

  Ok(())
}

fn run_worker(cache_config: CacheConfig) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let evaluator = NodeEvaluator::new(BuiltinRegistry::new(), ObjectCache::new(cache_config));
    serve(&evaluator, tokio::io::stdin(), tokio::io::stdout())
      .await
      .context("worker failed to answer request")?;
    Ok(())
  })
}

/// A runner re-invoking this executable as a worker sharing our cache.
fn worker_runner(cache_config: &CacheConfig, timeout: f64) -> Result<SubprocessRunner> {
  let timeout = Duration::try_from_secs_f64(timeout).context("invalid --timeout")?;
  let runner = SubprocessRunner::current_exe()
    .context("failed to locate the webalea executable")?
    .with_arg("--cache-dir")
    .with_arg(&cache_config.dir)
    .with_arg("--cache-ttl")
    .with_arg(cache_config.ttl_seconds.to_string())
    .with_timeout(timeout);
  Ok(runner)
}

fn run_node(
  cache_config: &CacheConfig,
  node_id: &str,
  package: &str,
  node: &str,
  inputs: serde_json::Map<String, serde_json::Value>,
  timeout: f64,
) -> Result<()> {
  let runner = worker_runner(cache_config, timeout)?;
  let rt = tokio::runtime::Runtime::new()?;
  let result = rt.block_on(runner.execute_node(package, node, inputs));

  let mut output = json!({
    "success": result.success,
    "node_id": node_id,
    "outputs": result.outputs,
  });
  if let Some(error) = &result.error {
    output["error"] = json!(error);
  }
  if !result.warnings.is_empty() {
    output["warnings"] = json!(result.warnings);
  }
  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

fn run_composite(cache_config: &CacheConfig, composite: &CompositeNode, isolate_nodes: bool, timeout: f64) -> Result<()> {
  let runner = worker_runner(cache_config, timeout)?;
  let rt = tokio::runtime::Runtime::new()?;
  let result: ExecutionResult = rt.block_on(async {
    if isolate_nodes {
      CompositeExecutor::new(&runner).run(composite).await
    } else {
      runner.execute_composite(composite).await
    }
  });

  eprintln!(
    "Composite {}: {} outputs",
    if result.success { "completed" } else { "failed" },
    result.outputs.len()
  );
  println!("{}", serde_json::to_string_pretty(&result)?);
  Ok(())
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read file: {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("failed to parse file: {}", path.display()))
}

fn read_json_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read payload from stdin")?;

    if input.trim().is_empty() {
      Ok(json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse payload as JSON")
    }
  }
}
