//! Background worker: loads the configuration once, then runs a sync cycle
//! every interval until shutdown is requested.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use autopush_core::config::SyncConfig;
use autopush_core::git::CommandRunner;
use autopush_core::sync_engine::SyncEngine;

use crate::service::ServiceError;

/// Worker entry point spawned by [`crate::service::Service::start`].
///
/// A configuration that cannot be loaded ends the worker with
/// [`ServiceError::Config`]; nothing is retried.
pub async fn run_worker<R: CommandRunner + 'static>(
    config_path: PathBuf,
    runner: Arc<R>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), ServiceError> {
    let config = SyncConfig::load_from_file(&config_path).map_err(|e| {
        error!(path = %config_path.display(), error = %e, "failed to load configuration");
        ServiceError::Config(e)
    })?;
    let engine = SyncEngine::from_config(runner, &config);
    run_polling_loop(&engine, &config, shutdown).await
}

/// Run cycles on `config.interval()` until `shutdown` flips to `true` or its
/// sender is dropped.
///
/// Shutdown is observed before each cycle and during the sleep between
/// cycles; a cycle in progress always runs to completion.
pub async fn run_polling_loop<R: CommandRunner>(
    engine: &SyncEngine<R>,
    config: &SyncConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ServiceError> {
    let interval = config.interval();
    info!(
        interval_secs = interval.as_secs(),
        repositories = config.repositories.len(),
        auto_commit = config.auto_commit,
        "starting polling loop"
    );

    let mut cycle: u64 = 0;
    loop {
        if *shutdown.borrow() {
            info!("shutdown requested, exiting polling loop");
            break;
        }

        cycle += 1;
        match engine
            .run_cycle(&config.repositories, config.auto_commit)
            .await
        {
            Ok(result) => {
                info!(
                    cycle,
                    pushed = result.pushed_count(),
                    skipped = result.skipped,
                    failed = result.failed,
                    "sync cycle completed"
                );
            }
            Err(e) => {
                error!(cycle, error = %e, "sync cycle failed, stopping worker");
                return Err(e.into());
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                info!("shutdown requested during sleep, exiting");
                break;
            }
        }
    }

    Ok(())
}
