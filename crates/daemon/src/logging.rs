//! Log sink selection.
//!
//! All components log through `tracing`; this module only decides where the
//! events end up: stderr by default, or an append-only file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. When `log_file` is set, the
/// returned guard must be held until exit so buffered lines are flushed.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let (dir, file_name) = split_log_path(path)?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name.to_string_lossy().into_owned())
                .build(&dir)
                .with_context(|| format!("failed to open log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .try_init()
                .map_err(|e| anyhow!(e))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .try_init()
                .map_err(|e| anyhow!(e))?;
            Ok(None)
        }
    }
}

/// Split a log file path into its directory and file name.
fn split_log_path(path: &Path) -> Result<(PathBuf, OsString)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?
        .to_os_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("/var/log/auto-push.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log"));
        assert_eq!(name, OsString::from("auto-push.log"));

        let (dir, name) = split_log_path(Path::new("auto-push.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, OsString::from("auto-push.log"));
    }

    #[test]
    fn test_split_log_path_requires_file_name() {
        assert!(split_log_path(Path::new("/")).is_err());
    }
}
