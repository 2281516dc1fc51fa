//! Git operations for auto-push.

pub mod client;
pub mod runner;

pub use client::{auto_commit_message, GitClient};
pub use runner::{CommandRunner, ProcessRunner};
