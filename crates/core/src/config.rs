//! Configuration for auto-push.
//!
//! The configuration is a single JSON document:
//!
//! ```json
//! {
//!   "repositories": [
//!     { "path": "/home/me/notes", "remote": "origin", "branch": "main" }
//!   ],
//!   "isCommit": true,
//!   "interval": 60
//! }
//! ```
//!
//! It is read once when the service worker starts; there is no hot reload.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

/// Interval used when `interval` is absent or zero.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Executable used when `git` is absent.
pub const DEFAULT_GIT_BINARY: &str = "git";

// ---------------------------------------------------------------------------
// Repository descriptor
// ---------------------------------------------------------------------------

/// One local working copy and its push target.
///
/// `remote` and `branch` are passed through to git untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub remote: String,

    #[serde(default)]
    pub branch: String,
}

impl RepositoryDescriptor {
    pub fn new(
        path: impl Into<String>,
        remote: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            remote: remote.into(),
            branch: branch.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// The full sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Repositories processed each cycle, in order.
    #[serde(default)]
    pub repositories: Vec<RepositoryDescriptor>,

    /// Stage and commit all local changes before pushing.
    #[serde(rename = "isCommit", default)]
    pub auto_commit: bool,

    /// Seconds between cycles. Zero means [`DEFAULT_INTERVAL_SECS`].
    #[serde(rename = "interval", default)]
    pub interval_secs: u64,

    /// Name or path of the git executable.
    #[serde(default = "default_git_binary")]
    pub git: String,
}

fn default_git_binary() -> String {
    DEFAULT_GIT_BINARY.into()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            auto_commit: false,
            interval_secs: 0,
            git: default_git_binary(),
        }
    }
}

impl SyncConfig {
    /// Load a [`SyncConfig`] from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;

        info!(
            repositories = config.repositories.len(),
            auto_commit = config.auto_commit,
            interval_secs = config.effective_interval_secs(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig =
            serde_json::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Shape checks only; repository paths are checked at sync time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.git.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "git".into(),
                detail: "git executable must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn effective_interval_secs(&self) -> u64 {
        if self.interval_secs == 0 {
            DEFAULT_INTERVAL_SECS
        } else {
            self.interval_secs
        }
    }

    /// The period between cycles, with the zero/absent default applied.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.effective_interval_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "repositories": [
                { "path": "/tmp/r1", "remote": "origin", "branch": "main" },
                { "path": "relative/r2", "remote": "backup", "branch": "dev" }
            ],
            "isCommit": true,
            "interval": 60
        }"#;
        let config = SyncConfig::from_json(json).unwrap();
        assert_eq!(config.repositories.len(), 2);
        assert_eq!(
            config.repositories[0],
            RepositoryDescriptor::new("/tmp/r1", "origin", "main")
        );
        assert_eq!(config.repositories[1].remote, "backup");
        assert!(config.auto_commit);
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.git, "git");
    }

    #[test]
    fn test_interval_defaults_when_absent() {
        let config = SyncConfig::from_json(r#"{ "repositories": [] }"#).unwrap();
        assert_eq!(config.interval_secs, 0);
        assert_eq!(config.interval(), Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert!(!config.auto_commit);
    }

    #[test]
    fn test_interval_defaults_when_zero() {
        let config = SyncConfig::from_json(r#"{ "interval": 0 }"#).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_missing_descriptor_fields_are_empty() {
        let config = SyncConfig::from_json(r#"{ "repositories": [ { "remote": "x" } ] }"#).unwrap();
        assert_eq!(config.repositories[0].path, "");
        assert_eq!(config.repositories[0].branch, "");
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = SyncConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));

        let err = SyncConfig::from_json(r#"{ "interval": "soon" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_empty_git_binary_rejected() {
        let err = SyncConfig::from_json(r#"{ "git": "  " }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "repositories": [ { "path": "/srv/a", "remote": "origin", "branch": "main" } ], "git": "/usr/bin/git" }"#,
        )
        .unwrap();

        let config = SyncConfig::load_from_file(&path).unwrap();
        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.git, "/usr/bin/git");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyncConfig::load_from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
