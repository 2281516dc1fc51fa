//! The git subcommands auto-push needs, issued through a [`CommandRunner`].

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, info, instrument};

use super::runner::CommandRunner;
use crate::errors::ExecutionError;

/// Timestamp layout used in auto-commit messages.
pub const COMMIT_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Build the auto-commit message for the given local time,
/// e.g. `2024/03/09 14:05:01 auto commit`.
pub fn auto_commit_message(now: DateTime<Local>) -> String {
    format!("{} auto commit", now.format(COMMIT_TIME_FORMAT))
}

/// Thin client over the git CLI.
///
/// Each call takes the repository directory explicitly and treats git as a
/// black box: only exit status and captured output matter.
pub struct GitClient<R: CommandRunner> {
    runner: Arc<R>,
    binary: String,
}

impl<R: CommandRunner> GitClient<R> {
    pub fn new(runner: Arc<R>, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    /// `git add .`
    #[instrument(skip(self, repo), fields(repo = %repo.display()))]
    pub async fn stage_all(&self, repo: &Path) -> Result<(), ExecutionError> {
        self.run(repo, &["add", "."]).await?;
        debug!("staged all changes");
        Ok(())
    }

    /// `git commit -m <message>`
    #[instrument(skip(self, repo), fields(repo = %repo.display()))]
    pub async fn commit(&self, repo: &Path, message: &str) -> Result<(), ExecutionError> {
        self.run(repo, &["commit", "-m", message]).await?;
        info!("committed local changes");
        Ok(())
    }

    /// `git push <remote> <branch>`
    #[instrument(skip(self, repo), fields(repo = %repo.display()))]
    pub async fn push(&self, repo: &Path, remote: &str, branch: &str) -> Result<(), ExecutionError> {
        self.run(repo, &["push", remote, branch]).await?;
        info!("push completed");
        Ok(())
    }

    async fn run(&self, repo: &Path, args: &[&str]) -> Result<Vec<u8>, ExecutionError> {
        self.runner.run(&self.binary, args, repo).await
    }
}
