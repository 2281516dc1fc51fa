//! Result types produced by repository syncs and sync cycles.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary reported when a cycle pushed nothing.
pub const NO_REPOSITORY_PUSHED: &str = "no repository pushed";

// ---------------------------------------------------------------------------
// Per-repository outcome
// ---------------------------------------------------------------------------

/// Why a repository was left out of a cycle before any git command ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyPath,
    NotFound,
    NotADirectory,
}

/// The git step that failed for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    Stage,
    Commit,
    Push,
}

impl std::fmt::Display for SyncStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stage => write!(f, "stage"),
            Self::Commit => write!(f, "commit"),
            Self::Push => write!(f, "push"),
        }
    }
}

/// What happened to one repository during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum RepoOutcome {
    Pushed,
    Skipped(SkipReason),
    Failed(SyncStep),
}

impl RepoOutcome {
    /// `true` when the push succeeded.
    pub fn pushed(&self) -> bool {
        matches!(self, Self::Pushed)
    }
}

// ---------------------------------------------------------------------------
// Cycle result
// ---------------------------------------------------------------------------

/// Outcome of one pass over all configured repositories.
///
/// Built fresh each cycle and discarded once reported.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleResult {
    /// Paths that were pushed, in configuration order.
    pub succeeded_paths: Vec<String>,
    pub skipped: usize,
    pub failed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CycleResult {
    pub fn record(&mut self, path: &str, outcome: &RepoOutcome) {
        match outcome {
            RepoOutcome::Pushed => self.succeeded_paths.push(path.to_string()),
            RepoOutcome::Skipped(_) => self.skipped += 1,
            RepoOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn pushed_count(&self) -> usize {
        self.succeeded_paths.len()
    }

    /// Human-readable summary: either [`NO_REPOSITORY_PUSHED`] or the
    /// newline-joined list of pushed paths.
    pub fn summary(&self) -> String {
        if self.succeeded_paths.is_empty() {
            return NO_REPOSITORY_PUSHED.to_string();
        }
        format!(
            "successfully pushed repositories:\n{}",
            self.succeeded_paths.join("\n")
        )
    }
}
