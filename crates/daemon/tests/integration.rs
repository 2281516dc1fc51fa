//! Integration tests for the commit-and-push pipeline.
//!
//! These tests drive the real `git` CLI against local repositories:
//! - working copies created with `git init` in temp directories
//! - a bare repository acting as the `origin` remote
//! - `git2` to inspect what actually landed on the remote
//!
//! No network I/O. If `git` is not installed, tests skip gracefully.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use autopush_core::config::{RepositoryDescriptor, SyncConfig};
use autopush_core::git::ProcessRunner;
use autopush_core::models::{RepoOutcome, SyncStep};
use autopush_core::sync_engine::SyncEngine;
use autopush_daemon::service::{Service, ServiceState};

// ===========================================================================
// Helper functions
// ===========================================================================

/// Returns `true` if `git` is available on `$PATH`.
fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run `git` in `dir`, panicking on failure.
fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A working copy with one pushed commit on `main` and a bare `origin`.
struct Fixture {
    _tmp: TempDir,
    work: PathBuf,
    remote: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let remote = tmp.path().join("remote.git");
        let work = tmp.path().join("work");
        std::fs::create_dir_all(&remote).unwrap();
        std::fs::create_dir_all(&work).unwrap();

        git(&remote, &["init", "--bare", "--quiet"]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        git(&work, &["init", "--quiet"]);
        git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&work, &["config", "user.name", "Auto Push"]);
        git(&work, &["config", "user.email", "autopush@example.com"]);
        git(&work, &["config", "commit.gpgsign", "false"]);
        git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);

        std::fs::write(work.join("README.md"), "# fixture\n").unwrap();
        git(&work, &["add", "."]);
        git(&work, &["commit", "--quiet", "-m", "initial"]);
        git(&work, &["push", "--quiet", "origin", "main"]);

        Self {
            _tmp: tmp,
            work,
            remote,
        }
    }

    fn descriptor(&self) -> RepositoryDescriptor {
        RepositoryDescriptor::new(self.work.to_string_lossy(), "origin", "main")
    }

    fn remote_head_message(&self) -> String {
        let repo = git2::Repository::open_bare(&self.remote).unwrap();
        let commit = repo
            .find_reference("refs/heads/main")
            .unwrap()
            .peel_to_commit()
            .unwrap();
        commit.message().unwrap_or("").trim().to_string()
    }

    fn remote_head_sha(&self) -> String {
        let repo = git2::Repository::open_bare(&self.remote).unwrap();
        let oid = repo.refname_to_id("refs/heads/main").unwrap();
        oid.to_string()
    }

    fn local_head_sha(&self) -> String {
        let repo = git2::Repository::open(&self.work).unwrap();
        let oid = repo.refname_to_id("HEAD").unwrap();
        oid.to_string()
    }
}

fn engine() -> SyncEngine<ProcessRunner> {
    SyncEngine::new(Arc::new(ProcessRunner::new()), "git")
}

// ===========================================================================
// Sync engine against real repositories
// ===========================================================================

#[tokio::test]
async fn test_auto_commit_and_push() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let fx = Fixture::new();
    std::fs::write(fx.work.join("notes.txt"), "new notes\n").unwrap();

    let result = engine().run_cycle(&[fx.descriptor()], true).await.unwrap();

    assert_eq!(result.succeeded_paths, vec![fx.work.to_string_lossy().to_string()]);
    assert!(fx.remote_head_message().ends_with("auto commit"));
    assert_eq!(fx.remote_head_sha(), fx.local_head_sha());
}

#[tokio::test]
async fn test_clean_working_copy_is_not_pushed_with_auto_commit() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let fx = Fixture::new();
    // Create an unpushed commit; a clean tree makes `git commit` fail, which
    // must stop the push as well.
    std::fs::write(fx.work.join("local.txt"), "local only\n").unwrap();
    git(&fx.work, &["add", "."]);
    git(&fx.work, &["commit", "--quiet", "-m", "local"]);
    let remote_before = fx.remote_head_sha();

    let outcome = engine()
        .sync_one(&fx.descriptor(), true, Path::new("/"))
        .await;

    assert_eq!(outcome, RepoOutcome::Failed(SyncStep::Commit));
    assert_eq!(fx.remote_head_sha(), remote_before);
}

#[tokio::test]
async fn test_push_only_without_auto_commit() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let fx = Fixture::new();
    std::fs::write(fx.work.join("manual.txt"), "manual\n").unwrap();
    git(&fx.work, &["add", "."]);
    git(&fx.work, &["commit", "--quiet", "-m", "manual commit"]);
    // Uncommitted change stays local.
    std::fs::write(fx.work.join("pending.txt"), "pending\n").unwrap();

    let result = engine().run_cycle(&[fx.descriptor()], false).await.unwrap();

    assert_eq!(result.pushed_count(), 1);
    assert_eq!(fx.remote_head_message(), "manual commit");
    assert_eq!(fx.remote_head_sha(), fx.local_head_sha());
}

#[tokio::test]
async fn test_bad_remote_does_not_block_other_repositories() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let broken = Fixture::new();
    let healthy = Fixture::new();
    std::fs::write(healthy.work.join("change.txt"), "change\n").unwrap();
    std::fs::write(broken.work.join("change.txt"), "change\n").unwrap();

    let repos = vec![
        RepositoryDescriptor::new(broken.work.to_string_lossy(), "no-such-remote", "main"),
        RepositoryDescriptor::new("", "origin", "main"),
        healthy.descriptor(),
    ];
    let result = engine().run_cycle(&repos, true).await.unwrap();

    assert_eq!(
        result.succeeded_paths,
        vec![healthy.work.to_string_lossy().to_string()]
    );
    assert_eq!(result.failed, 1);
    assert_eq!(result.skipped, 1);
    assert!(healthy.remote_head_message().ends_with("auto commit"));
    assert_eq!(broken.remote_head_message(), "initial");
}

// ===========================================================================
// Service lifecycle end to end
// ===========================================================================

#[tokio::test]
async fn test_service_pushes_until_stopped() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let fx = Fixture::new();
    std::fs::write(fx.work.join("service.txt"), "from service\n").unwrap();

    let config = SyncConfig {
        repositories: vec![fx.descriptor()],
        auto_commit: true,
        interval_secs: 1,
        ..Default::default()
    };
    let config_path = fx.work.parent().unwrap().join("config.json");
    std::fs::write(&config_path, serde_json::to_string(&config).unwrap()).unwrap();

    let mut service = Service::new(&config_path, Arc::new(ProcessRunner::new()));
    service.start().unwrap();

    let mut pushed = false;
    for _ in 0..100 {
        if fx.remote_head_message().ends_with("auto commit") {
            pushed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    tokio::time::timeout(Duration::from_secs(10), service.stop())
        .await
        .expect("service did not stop")
        .unwrap();
    assert_eq!(service.state(), ServiceState::Stopped);
    assert!(pushed, "service never pushed the auto commit");
}
