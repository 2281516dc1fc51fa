//! auto-push entry point.
//!
//! Periodically commits and pushes a configured list of local git working
//! copies. Runs in the foreground until interrupted, which is also how a
//! service manager such as systemd is expected to host it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use autopush_core::config::SyncConfig;
use autopush_core::git::ProcessRunner;
use autopush_core::sync_engine::SyncEngine;
use autopush_daemon::instance::{self, InstanceStatus};
use autopush_daemon::service::{Environment, Service, ServiceState};
use autopush_daemon::{logging, signals};

/// auto-push: keep local git working copies committed and pushed.
#[derive(Parser)]
#[command(name = "autopush", version, about)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(short, long, global = true, default_value = "~/.config/auto-push/config.json")]
    config: String,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// PID file held by `run` and read by `status`.
    #[arg(long, global = true)]
    pid_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service in the foreground until SIGINT/SIGTERM.
    Run {
        /// Seconds to wait for an in-flight cycle when stopping.
        #[arg(long, default_value_t = 30)]
        shutdown_timeout: u64,
    },

    /// Run a single sync cycle and exit.
    Once {
        /// Print the cycle result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check service status.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = cli.log_file.as_deref().map(expand_tilde_path);
    let _log_guard = logging::init_logging(&cli.log_level, log_file.as_deref())?;

    let config_path = expand_tilde_path(Path::new(&cli.config));
    let pid_path = cli
        .pid_file
        .as_deref()
        .map(|p| expand_tilde_path(Path::new(p)))
        .unwrap_or_else(instance::default_pid_file);

    match cli.command {
        Commands::Run { shutdown_timeout } => {
            cmd_run(&config_path, &pid_path, Duration::from_secs(shutdown_timeout)).await
        }
        Commands::Once { json } => cmd_once(&config_path, json).await,
        Commands::Status => cmd_status(&pid_path),
    }
}

/// Run the service until a termination signal or a fatal worker error.
async fn cmd_run(config_path: &Path, pid_path: &Path, shutdown_timeout: Duration) -> Result<()> {
    info!("auto-push v{}", env!("CARGO_PKG_VERSION"));
    info!(config = %config_path.display(), pid_file = %pid_path.display(), "starting in foreground");

    let mut service = Service::new(config_path, Arc::new(ProcessRunner::new()))
        .with_shutdown_timeout(shutdown_timeout)
        .with_pid_file(pid_path);
    service.init(Environment::detect())?;
    service.start()?;

    let interrupted = tokio::select! {
        _ = signals::wait_for_shutdown() => true,
        result = service.wait() => {
            result.context("auto-push worker terminated")?;
            false
        }
    };

    if interrupted {
        service.stop().await.context("auto-push worker failed")?;
    }
    info!("auto-push stopped");
    Ok(())
}

/// Run a single cycle.
async fn cmd_once(config_path: &Path, json: bool) -> Result<()> {
    let config = SyncConfig::load_from_file(config_path).context("failed to load config")?;
    let engine = SyncEngine::from_config(Arc::new(ProcessRunner::new()), &config);

    let result = engine
        .run_cycle(&config.repositories, config.auto_commit)
        .await
        .context("sync cycle failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.summary());
    }
    Ok(())
}

fn cmd_status(pid_path: &Path) -> Result<()> {
    let status = instance::inspect(pid_path).context("failed to read PID file")?;
    println!("{}", describe_status(status));
    Ok(())
}

fn describe_status(status: InstanceStatus) -> String {
    match status {
        InstanceStatus::Running { pid } => format!("auto-push is {} (PID {})", ServiceState::Running, pid),
        InstanceStatus::NotRunning => format!("auto-push is {}", ServiceState::Stopped),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
