//! Service lifecycle: `Stopped --start()--> Running --stop()--> Stopped`.
//!
//! The same hooks serve the foreground CLI mode and an external service
//! manager. `start` never blocks; the work happens on a single spawned
//! tokio task that owns the polling loop. With a PID file configured, the
//! service also holds an [`InstanceLock`] while running.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use autopush_core::errors::{ConfigError, SyncError};
use autopush_core::git::CommandRunner;

use crate::instance::{InstanceError, InstanceLock};
use crate::scheduler;

/// Default upper bound on how long `stop` waits for the worker.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced by the service lifecycle.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// `start` was called while the worker is already running.
    #[error("service is already running")]
    AlreadyRunning,

    /// Another process holds the instance lock, or the PID file is unusable.
    #[error(transparent)]
    Instance(#[from] InstanceError),

    /// The configuration could not be loaded; the worker never started a cycle.
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    /// A cycle hit an unrecoverable environment error.
    #[error("sync worker stopped: {0}")]
    Sync(#[from] SyncError),

    /// The worker task panicked.
    #[error("sync worker panicked: {0}")]
    WorkerPanicked(String),
}

/// Lifecycle flag guarding the single worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Running,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// How the process is being hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Started by a service manager (systemd sets `INVOCATION_ID`).
    Supervised,
    Interactive,
}

impl Environment {
    pub fn detect() -> Self {
        let supervised = ["INVOCATION_ID", "NOTIFY_SOCKET"]
            .iter()
            .any(|var| std::env::var_os(var).is_some());
        if supervised {
            Self::Supervised
        } else {
            Self::Interactive
        }
    }

    pub fn is_supervised(&self) -> bool {
        matches!(self, Self::Supervised)
    }
}

/// Owns the background worker and its stop signal.
pub struct Service<R: CommandRunner + 'static> {
    config_path: PathBuf,
    runner: Arc<R>,
    shutdown_timeout: Duration,
    pid_file: Option<PathBuf>,
    instance: Option<InstanceLock>,
    state: ServiceState,
    shutdown_tx: Option<watch::Sender<bool>>,
    worker: Option<JoinHandle<Result<(), ServiceError>>>,
}

impl<R: CommandRunner + 'static> Service<R> {
    pub fn new(config_path: impl Into<PathBuf>, runner: Arc<R>) -> Self {
        Self {
            config_path: config_path.into(),
            runner,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            pid_file: None,
            instance: None,
            state: ServiceState::Stopped,
            shutdown_tx: None,
            worker: None,
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Hold a PID file at `path` while running; `start` fails if another
    /// live instance already owns it.
    pub fn with_pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pid_file = Some(path.into());
        self
    }

    pub fn pid_file(&self) -> Option<&Path> {
        self.pid_file.as_deref()
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Called once by the host before `start`.
    pub fn init(&self, env: Environment) -> Result<(), ServiceError> {
        info!(
            supervised = env.is_supervised(),
            config = %self.config_path.display(),
            "initializing auto-push service"
        );
        Ok(())
    }

    /// Spawn the worker and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), ServiceError> {
        if self.state == ServiceState::Running {
            return Err(ServiceError::AlreadyRunning);
        }

        self.instance = match &self.pid_file {
            Some(path) => Some(InstanceLock::acquire(path)?),
            None => None,
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(scheduler::run_worker(
            self.config_path.clone(),
            self.runner.clone(),
            shutdown_rx,
        ));

        self.shutdown_tx = Some(shutdown_tx);
        self.worker = Some(worker);
        self.set_state(ServiceState::Running);
        Ok(())
    }

    /// Signal the worker and wait for it to finish its current cycle.
    ///
    /// Waits at most the shutdown timeout; a worker that has not finished by
    /// then is aborted. Returns the worker's own error if it had already
    /// failed. Stopping a stopped service is a no-op.
    pub async fn stop(&mut self) -> Result<(), ServiceError> {
        if self.state == ServiceState::Stopped {
            debug!("stop requested but service is not running");
            return Ok(());
        }

        info!("stopping auto-push service");
        if let Some(tx) = self.shutdown_tx.take() {
            // The receiver is gone only if the worker already exited.
            let _ = tx.send(true);
        }

        let result = match self.worker.take() {
            Some(mut worker) => {
                match tokio::time::timeout(self.shutdown_timeout, &mut worker).await {
                    Ok(joined) => flatten(joined),
                    Err(_) => {
                        warn!(
                            timeout_secs = self.shutdown_timeout.as_secs_f64(),
                            "worker did not stop in time, aborting"
                        );
                        worker.abort();
                        let _ = worker.await;
                        Ok(())
                    }
                }
            }
            None => Ok(()),
        };

        self.instance = None;
        self.set_state(ServiceState::Stopped);
        result
    }

    /// Wait for the worker to end on its own (it only does so on a fatal
    /// error). Cancel-safe: dropping the future leaves the service running.
    pub async fn wait(&mut self) -> Result<(), ServiceError> {
        let Some(worker) = self.worker.as_mut() else {
            return Ok(());
        };
        let joined = worker.await;
        self.worker = None;
        self.shutdown_tx = None;
        self.instance = None;
        self.set_state(ServiceState::Stopped);
        flatten(joined)
    }

    fn set_state(&mut self, new_state: ServiceState) {
        info!(from = %self.state, to = %new_state, "service state transition");
        self.state = new_state;
    }
}

fn flatten(
    joined: Result<Result<(), ServiceError>, tokio::task::JoinError>,
) -> Result<(), ServiceError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(ServiceError::WorkerPanicked(e.to_string())),
    }
}
