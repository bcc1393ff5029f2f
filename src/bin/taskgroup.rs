//! taskgroup CLI — concurrent directory walks on the dispatcher.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskgroup::Context;
use taskgroup::config::Config;
use taskgroup::telemetry::{TelemetryConfig, init_telemetry};
use taskgroup::walk::{WalkOptions, WalkSummary, walk};
use tracing::info;

#[derive(Parser)]
#[command(name = "taskgroup", about = "Bounded concurrent task dispatcher")]
struct Cli {
    /// TOML config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk a directory tree and summarize it
    Walk {
        /// Directory to walk
        root: PathBuf,
        /// Maximum concurrent directory reads (0 = unbounded)
        #[arg(long)]
        limit: Option<usize>,
        /// Do not descend below this depth
        #[arg(long)]
        max_depth: Option<usize>,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "taskgroup".to_string(),
        log_level: config.log_level.clone(),
    })?;

    match cli.command {
        Command::Walk {
            root,
            limit,
            max_depth,
            timeout_ms,
            json,
        } => {
            if let Some(limit) = limit {
                config.limit = limit;
            }
            if max_depth.is_some() {
                config.max_depth = max_depth;
            }
            if timeout_ms.is_some() {
                config.timeout_ms = timeout_ms;
            }
            cmd_walk(root, &config, json).await
        }
    }
}

async fn cmd_walk(root: PathBuf, config: &Config, json: bool) -> anyhow::Result<()> {
    let root_ctx = Context::new();
    let ctx = match config.timeout() {
        Some(timeout) => root_ctx.with_timeout(timeout),
        None => root_ctx.child(),
    };

    let on_signal = root_ctx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("interrupt received, canceling walk");
        on_signal.cancel();
    });

    let options = WalkOptions {
        limit: config.limit,
        max_depth: config.max_depth,
    };
    info!(root = %root.display(), limit = options.limit, "walk started");
    let summary = tokio::task::spawn_blocking(move || walk(&root, ctx, &options)).await??;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &WalkSummary) {
    println!("Root:     {}", summary.root.display());
    println!("Dirs:     {}", summary.dirs);
    println!("Files:    {}", summary.files);
    println!("Bytes:    {}", summary.bytes);
    println!(
        "Started:  {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("Elapsed:  {}ms", summary.elapsed_ms);
}
