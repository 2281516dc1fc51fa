//! External command execution.
//!
//! Every invocation takes an explicit working directory; the process-wide
//! current directory is never changed.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{ExecutionCause, ExecutionError};

/// Runs an executable with arguments inside a working directory.
///
/// Returns the captured output on exit status 0. No retries happen at this
/// layer.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        working_dir: &Path,
    ) -> Result<Vec<u8>, ExecutionError>;
}

/// [`CommandRunner`] that spawns real child processes via `tokio::process`.
///
/// Dropping an in-flight `run` future kills the child, so an aborted worker
/// does not leave a hung `git push` behind.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        working_dir: &Path,
    ) -> Result<Vec<u8>, ExecutionError> {
        let command_line = render_command(program, args);

        if !working_dir.is_dir() {
            return Err(ExecutionError::new(
                command_line,
                ExecutionCause::InvalidWorkingDirectory(working_dir.display().to_string()),
                Vec::new(),
            ));
        }

        let mut cmd = Command::new(program);
        cmd.current_dir(working_dir)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(cmd = %command_line, dir = %working_dir.display(), "running command");
        let output = cmd.output().await.map_err(|e| {
            let cause = if e.kind() == std::io::ErrorKind::NotFound {
                ExecutionCause::BinaryNotFound(program.to_string())
            } else {
                ExecutionCause::Io(e)
            };
            ExecutionError::new(command_line.clone(), cause, Vec::new())
        })?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        if !output.status.success() {
            let exit_code = output.status.code();
            warn!(cmd = %command_line, ?exit_code, "command failed");
            return Err(ExecutionError::new(
                command_line,
                ExecutionCause::NonZeroExit(exit_code),
                combined,
            ));
        }
        Ok(combined)
    }
}

/// Render `program args...` for logs and error messages.
pub fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
