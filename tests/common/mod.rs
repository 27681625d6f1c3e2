//! Shared fixture for integration tests: real git repositories built in
//! temp directories, driven through the git binary like a user would.

// Each test binary compiles this module separately and uses a subset.
#![allow(dead_code)]

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;

use arbor::core::state::StateStore;
use arbor::core::types::{BranchName, Oid};
use arbor::engine::Context;
use arbor::git::GitRepo;

/// A real git repository with an initial commit on `main`.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");

        run_git(dir.path(), &["init", "-b", "main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);

        let repo = Self { dir };
        repo.commit_file("README.md", "# test repo\n", "initial commit");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self) -> GitRepo {
        GitRepo::open(self.path()).expect("open test repo")
    }

    /// Initialise the arbor store with `main` as trunk.
    pub fn store(&self) -> StateStore {
        let trunk = BranchName::new("main").unwrap();
        StateStore::init(&self.git().common_dir(), &trunk, None, Duration::ZERO)
            .expect("init store")
    }

    /// Write a file and commit it on the current branch; returns the new
    /// HEAD commit.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> Oid {
        std::fs::write(self.path().join(path), content).expect("write file");
        run_git(self.path(), &["add", path]);
        run_git(self.path(), &["commit", "-m", message]);
        self.head()
    }

    /// Create a branch at the current HEAD.
    pub fn create_branch(&self, name: &str) {
        run_git(self.path(), &["branch", name]);
    }

    pub fn checkout(&self, name: &str) {
        run_git(self.path(), &["checkout", "--quiet", name]);
    }

    pub fn head(&self) -> Oid {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(self.path())
            .output()
            .expect("git rev-parse");
        let hash = String::from_utf8(output.stdout).unwrap().trim().to_string();
        Oid::new(hash).expect("valid head oid")
    }

    pub fn branch_tip(&self, name: &str) -> Oid {
        let output = Command::new("git")
            .args(["rev-parse", &format!("refs/heads/{name}")])
            .current_dir(self.path())
            .output()
            .expect("git rev-parse");
        let hash = String::from_utf8(output.stdout).unwrap().trim().to_string();
        Oid::new(hash).expect("valid branch oid")
    }

    /// Whether a rebase is currently stopped in this repository.
    pub fn rebase_in_progress(&self) -> bool {
        let git_dir = self.path().join(".git");
        git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists()
    }

    /// Resolve a stopped rebase by taking `content` for `path`, then
    /// continue.
    pub fn resolve_rebase(&self, path: &str, content: &str) {
        std::fs::write(self.path().join(path), content).expect("write resolution");
        run_git(self.path(), &["add", path]);
        let status = Command::new("git")
            .args(["rebase", "--continue"])
            .env("GIT_EDITOR", "true")
            .current_dir(self.path())
            .status()
            .expect("git rebase --continue");
        assert!(status.success(), "rebase --continue failed");
    }
}

/// Run a git command, panicking on failure.
pub fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

/// Quiet engine context for tests.
pub fn ctx() -> Context {
    Context {
        quiet: true,
        ..Context::default()
    }
}

/// Shorthand for validated branch names.
pub fn branch(name: &str) -> BranchName {
    BranchName::new(name).unwrap()
}
