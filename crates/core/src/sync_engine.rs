//! Sync engine: commits and pushes every configured repository once per cycle.
//!
//! Per repository the sequence is strictly
//! `[git add . → git commit -m <msg>] → git push <remote> <branch>`,
//! stopping at the first failure. A failing repository never affects the
//! others; its failure is logged and counted, not returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{error, info, instrument, warn};

use crate::config::{RepositoryDescriptor, SyncConfig};
use crate::errors::SyncError;
use crate::git::client::{auto_commit_message, GitClient};
use crate::git::runner::CommandRunner;
use crate::models::{CycleResult, RepoOutcome, SkipReason, SyncStep, NO_REPOSITORY_PUSHED};

/// Resolves the directory relative repository paths are anchored to.
pub type HomeDirResolver = fn() -> std::io::Result<PathBuf>;

/// The directory containing the running executable.
pub fn executable_dir() -> std::io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("executable '{}' has no parent directory", exe.display()),
        )
    })
}

/// Runs repository syncs and whole cycles.
pub struct SyncEngine<R: CommandRunner> {
    git: GitClient<R>,
    home_dir: HomeDirResolver,
}

impl<R: CommandRunner> SyncEngine<R> {
    /// Create an engine that runs `git_binary` through `runner`.
    pub fn new(runner: Arc<R>, git_binary: impl Into<String>) -> Self {
        Self {
            git: GitClient::new(runner, git_binary),
            home_dir: executable_dir,
        }
    }

    /// Create an engine using the git executable named in `config`.
    pub fn from_config(runner: Arc<R>, config: &SyncConfig) -> Self {
        Self::new(runner, config.git.clone())
    }

    /// Replace the home directory lookup (defaults to [`executable_dir`]).
    pub fn with_home_dir_resolver(mut self, resolver: HomeDirResolver) -> Self {
        self.home_dir = resolver;
        self
    }

    /// Run one pass over `repos` in order.
    ///
    /// Only a failed home directory lookup is returned as an error; every
    /// repository failure is absorbed into the [`CycleResult`].
    pub async fn run_cycle(
        &self,
        repos: &[RepositoryDescriptor],
        auto_commit: bool,
    ) -> Result<CycleResult, SyncError> {
        let home_dir =
            (self.home_dir)().map_err(|e| SyncError::HomeDirUnavailable(e.to_string()))?;

        let mut result = CycleResult {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        for repo in repos {
            let outcome = self.sync_one(repo, auto_commit, &home_dir).await;
            result.record(&repo.path, &outcome);
        }

        result.completed_at = Some(Utc::now());

        if result.succeeded_paths.is_empty() {
            info!(
                skipped = result.skipped,
                failed = result.failed,
                "{}",
                NO_REPOSITORY_PUSHED
            );
        } else {
            info!(
                pushed = result.pushed_count(),
                skipped = result.skipped,
                failed = result.failed,
                "{}",
                result.summary()
            );
        }

        Ok(result)
    }

    /// Stage, commit and push a single repository.
    ///
    /// Relative paths are resolved against `home_dir`. Never fails: problems
    /// are logged and reported as [`RepoOutcome::Skipped`] or
    /// [`RepoOutcome::Failed`].
    #[instrument(skip(self, repo, home_dir), fields(path = %repo.path, remote = %repo.remote, branch = %repo.branch))]
    pub async fn sync_one(
        &self,
        repo: &RepositoryDescriptor,
        auto_commit: bool,
        home_dir: &Path,
    ) -> RepoOutcome {
        if repo.path.is_empty() {
            warn!("encountered an empty repository path");
            return RepoOutcome::Skipped(SkipReason::EmptyPath);
        }

        let dir = resolve_repo_path(&repo.path, home_dir);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                error!(dir = %dir.display(), "repository path is not a directory");
                return RepoOutcome::Skipped(SkipReason::NotADirectory);
            }
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "failed to stat repository directory");
                return RepoOutcome::Skipped(SkipReason::NotFound);
            }
        }

        if auto_commit {
            if let Err(e) = self.git.stage_all(&dir).await {
                error!(error = %e, output = %e.output_lossy(), "failed to run 'git add'");
                return RepoOutcome::Failed(SyncStep::Stage);
            }

            // A failed commit (including "nothing to commit") abandons the
            // repository for this cycle.
            let message = auto_commit_message(Local::now());
            if let Err(e) = self.git.commit(&dir, &message).await {
                error!(error = %e, output = %e.output_lossy(), "failed to run 'git commit'");
                return RepoOutcome::Failed(SyncStep::Commit);
            }
        }

        if let Err(e) = self.git.push(&dir, &repo.remote, &repo.branch).await {
            error!(error = %e, output = %e.output_lossy(), "failed to run 'git push'");
            return RepoOutcome::Failed(SyncStep::Push);
        }

        info!("repository pushed");
        RepoOutcome::Pushed
    }
}

fn resolve_repo_path(path: &str, home_dir: &Path) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home_dir.join(path)
    }
}
