//! auto-push core library.
//!
//! Configuration loading, the git command runner, and the sync engine that
//! commits and pushes a list of local working copies once per cycle.

pub mod config;
pub mod errors;
pub mod git;
pub mod models;
pub mod sync_engine;

// Re-exports for convenience.
pub use config::{RepositoryDescriptor, SyncConfig};
pub use git::{CommandRunner, ProcessRunner};
pub use models::{CycleResult, RepoOutcome};
pub use sync_engine::SyncEngine;
