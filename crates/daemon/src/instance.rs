//! Single-instance guard for the service, backed by a PID file.
//!
//! [`InstanceLock`] is taken by [`crate::service::Service::start`] and
//! released when the service stops; [`inspect`] lets `autopush status` report
//! on an instance owned by another process.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from taking or inspecting the instance lock.
#[derive(Debug, Error)]
pub enum InstanceError {
    /// A live process is recorded in the PID file.
    #[error("auto-push is already running (PID {pid}, recorded in '{path}')")]
    AlreadyRunning { pid: u32, path: String },

    /// The PID file exists but does not hold a PID.
    #[error("PID file '{path}' is corrupt: {detail}")]
    Corrupt { path: String, detail: String },

    /// Reading, writing or removing the PID file failed.
    #[error("PID file I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl InstanceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// What the PID file says about another instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    NotRunning,
    Running { pid: u32 },
}

/// Default PID file: `<local data dir>/auto-push/auto-push.pid`.
pub fn default_pid_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("auto-push")
        .join("auto-push.pid")
}

/// Inspect the PID file. A file naming a dead process is removed.
pub fn inspect(path: &Path) -> Result<InstanceStatus, InstanceError> {
    let Some(pid) = read_pid(path)? else {
        return Ok(InstanceStatus::NotRunning);
    };
    if is_process_alive(pid) {
        return Ok(InstanceStatus::Running { pid });
    }
    info!(pid, path = %path.display(), "removing stale PID file");
    remove_if_present(path)?;
    Ok(InstanceStatus::NotRunning)
}

/// Held while this process owns the service; removes its PID file on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    pid: u32,
}

impl InstanceLock {
    /// Record this process in `path`, refusing if another live instance is
    /// already recorded there.
    pub fn acquire(path: &Path) -> Result<Self, InstanceError> {
        if let InstanceStatus::Running { pid } = inspect(path)? {
            return Err(InstanceError::AlreadyRunning {
                pid,
                path: path.display().to_string(),
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| InstanceError::io(path, e))?;
        }
        let pid = std::process::id();
        fs::write(path, pid.to_string()).map_err(|e| InstanceError::io(path, e))?;
        info!(pid, path = %path.display(), "acquired instance lock");

        Ok(Self {
            path: path.to_path_buf(),
            pid,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        // Leave the file alone if another process has since claimed it.
        match read_pid(&self.path) {
            Ok(Some(pid)) if pid == self.pid => match remove_if_present(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "released instance lock"),
                Err(e) => warn!(error = %e, "failed to release instance lock"),
            },
            Ok(_) => debug!(path = %self.path.display(), "PID file no longer ours, leaving it"),
            Err(e) => warn!(error = %e, "failed to read PID file on release"),
        }
    }
}

fn read_pid(path: &Path) -> Result<Option<u32>, InstanceError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(InstanceError::io(path, e)),
    };
    contents
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: std::num::ParseIntError| InstanceError::Corrupt {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
}

fn remove_if_present(path: &Path) -> Result<(), InstanceError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstanceError::io(path, e)),
    }
}

/// Check whether a process with the given PID exists.
///
/// A process owned by another user answers signal 0 with `EPERM`; it still
/// counts as alive.
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // 0 and values that wrap to negative pid_t address process groups.
        if pid == 0 || pid > i32::MAX as u32 {
            return false;
        }
        if unsafe { libc::kill(pid as libc::pid_t, 0) } == 0 {
            return true;
        }
        std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}
