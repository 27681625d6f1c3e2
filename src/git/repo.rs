//! git::repo
//!
//! [`Vcs`] implementation over a real repository.
//!
//! Reads (discovery, ref resolution, revwalks, merge-base) go through
//! `git2`. Worktree-coupled writes (checkout, rebase, branch deletion) are
//! delegated to the `git` binary: a rebase must drive the user's hooks and
//! leave the standard `rebase --continue` machinery in place on conflict,
//! which in-process rebasing does not give us.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::types::{BranchName, Oid, RefName};

use super::{GitError, GitState, RebaseStatus, Vcs};

/// A real repository, discovered from a path.
pub struct GitRepo {
    repo: git2::Repository,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl GitRepo {
    /// Discover and open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] when no repository is found
    /// - [`GitError::BareRepo`] for bare repositories (no worktree to
    ///   restack in)
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }
        Ok(Self { repo })
    }

    /// The shared git directory (same across linked worktrees).
    ///
    /// Store paths are rooted here so worktrees of one repository share one
    /// store and one lock.
    pub fn common_dir(&self) -> PathBuf {
        self.repo.commondir().to_path_buf()
    }

    /// The working directory commands run in.
    fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    /// Current in-progress operation, if any.
    pub fn state(&self) -> GitState {
        use git2::RepositoryState as S;
        match self.repo.state() {
            S::Clean => GitState::Clean,
            S::Rebase | S::RebaseInteractive | S::RebaseMerge => GitState::Rebase,
            S::Merge => GitState::Merge,
            S::CherryPick | S::CherryPickSequence => GitState::CherryPick,
            S::Revert | S::RevertSequence => GitState::Revert,
            S::Bisect => GitState::Bisect,
            S::ApplyMailbox | S::ApplyMailboxOrRebase => GitState::Rebase,
        }
    }

    /// Whether a local branch exists.
    pub fn branch_exists(&self, branch: &BranchName) -> bool {
        self.repo
            .find_reference(RefName::for_branch(branch).as_str())
            .is_ok()
    }

    /// Resolve an arbitrary full ref to a commit id.
    fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::Internal {
                message: format!("{refname}: {}", e.message()),
            })?;
        let commit = reference.peel_to_commit().map_err(|e| GitError::Internal {
            message: format!("{refname}: {}", e.message()),
        })?;
        Ok(Oid::new(commit.id().to_string())?)
    }

    /// Run `git` with the given arguments in the worktree.
    fn run_git(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let work_dir = self.work_dir()?;
        let output = Command::new("git")
            .args(args)
            .current_dir(work_dir)
            .output()
            .map_err(|e| GitError::Internal {
                message: format!("failed to spawn git {}: {e}", args.first().unwrap_or(&"")),
            })?;
        Ok(GitOutput {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Captured result of a git subprocess.
struct GitOutput {
    success: bool,
    stderr: String,
}

impl GitOutput {
    fn stderr_has(&self, needle: &str) -> bool {
        self.stderr.to_ascii_lowercase().contains(needle)
    }
}

impl Vcs for GitRepo {
    fn resolve(&self, branch: &BranchName) -> Result<Oid, GitError> {
        let refname = RefName::for_branch(branch);
        match self.repo.find_reference(refname.as_str()) {
            Ok(reference) => {
                let commit = reference.peel_to_commit().map_err(|e| GitError::Internal {
                    message: format!("{refname}: {}", e.message()),
                })?;
                Ok(Oid::new(commit.id().to_string())?)
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            }),
            Err(e) => Err(GitError::Internal {
                message: e.message().to_string(),
            }),
        }
    }

    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => {
                return Err(GitError::Internal {
                    message: e.message().to_string(),
                })
            }
        };
        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Some(BranchName::new(name)?));
            }
        }
        Ok(None)
    }

    fn checkout(&self, branch: &BranchName) -> Result<(), GitError> {
        let state = self.state();
        if state.is_in_progress() {
            return Err(GitError::OperationInProgress { operation: state });
        }
        let output = self.run_git(&["checkout", "--quiet", branch.as_str()])?;
        if output.success {
            return Ok(());
        }
        if output.stderr_has("would be overwritten") || output.stderr_has("commit your changes") {
            return Err(GitError::DirtyWorktree {
                details: output.stderr.trim().to_string(),
            });
        }
        if !self.branch_exists(branch) {
            return Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            });
        }
        Err(GitError::Internal {
            message: format!("git checkout {branch} failed: {}", output.stderr.trim()),
        })
    }

    fn commits_between(&self, from: &Oid, to: &BranchName) -> Result<Vec<Oid>, GitError> {
        let to_oid = self.resolve(to)?;
        let mut walk = self.repo.revwalk().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;
        walk.push(parse_git2_oid(&to_oid)?)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;
        // A hide of an unknown commit means `from` was garbage-collected or
        // foreign; surface that rather than silently returning everything.
        walk.hide(parse_git2_oid(from)?)
            .map_err(|e| GitError::Internal {
                message: format!("cannot hide {from}: {}", e.message()),
            })?;

        let mut commits = Vec::new();
        for entry in walk {
            let oid = entry.map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;
            commits.push(Oid::new(oid.to_string())?);
        }
        Ok(commits)
    }

    fn rebase_onto(
        &self,
        branch: &BranchName,
        upstream: &Oid,
        new_base: &BranchName,
    ) -> Result<RebaseStatus, GitError> {
        let state = self.state();
        if state.is_in_progress() {
            return Err(GitError::OperationInProgress { operation: state });
        }
        if !self.branch_exists(branch) {
            return Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            });
        }

        let output = self.run_git(&[
            "rebase",
            "--onto",
            new_base.as_str(),
            upstream.as_str(),
            branch.as_str(),
        ])?;

        if output.success {
            return Ok(RebaseStatus::Completed {
                new_tip: self.resolve(branch)?,
            });
        }

        // A stopped rebase leaves the repository in the rebase state; that
        // is the resumable-conflict outcome, not a failure.
        let state = self.state();
        if state.is_in_progress() {
            return Ok(RebaseStatus::Conflict { state });
        }
        if output.stderr_has("unstaged changes") || output.stderr_has("uncommitted changes") {
            return Err(GitError::DirtyWorktree {
                details: output.stderr.trim().to_string(),
            });
        }
        Err(GitError::Internal {
            message: format!("git rebase of {branch} failed: {}", output.stderr.trim()),
        })
    }

    fn delete_branch(&self, branch: &BranchName, force: bool) -> Result<(), GitError> {
        if !self.branch_exists(branch) {
            return Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            });
        }
        let flag = if force { "-D" } else { "-d" };
        let output = self.run_git(&["branch", flag, branch.as_str()])?;
        if output.success {
            return Ok(());
        }
        if output.stderr_has("not fully merged") {
            return Err(GitError::NotMerged {
                branch: branch.to_string(),
            });
        }
        Err(GitError::Internal {
            message: format!("git branch {flag} {branch} failed: {}", output.stderr.trim()),
        })
    }

    fn merge_base(&self, a: &BranchName, b: &BranchName) -> Result<Option<Oid>, GitError> {
        let oid_a = parse_git2_oid(&self.resolve(a)?)?;
        let oid_b = parse_git2_oid(&self.resolve(b)?)?;
        match self.repo.merge_base(oid_a, oid_b) {
            Ok(base) => Ok(Some(Oid::new(base.to_string())?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Internal {
                message: e.message().to_string(),
            }),
        }
    }

    fn default_branch(&self) -> Result<Option<BranchName>, GitError> {
        // The symbolic origin/HEAD names the remote's default branch when
        // the clone recorded it.
        if let Ok(reference) = self.repo.find_reference("refs/remotes/origin/HEAD") {
            if let Some(target) = reference.symbolic_target() {
                if let Some(name) = target.strip_prefix("refs/remotes/origin/") {
                    if let Ok(branch) = BranchName::new(name) {
                        let remote_ref = RefName::for_remote_branch("origin", &branch);
                        if self.branch_exists(&branch)
                            || self.resolve_ref(remote_ref.as_str()).is_ok()
                        {
                            return Ok(Some(branch));
                        }
                    }
                }
            }
        }
        for candidate in ["main", "master", "trunk"] {
            let branch = BranchName::new(candidate)?;
            if self.branch_exists(&branch) {
                return Ok(Some(branch));
            }
        }
        Ok(None)
    }
}

/// Convert a validated [`Oid`] into a `git2::Oid`.
fn parse_git2_oid(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::Internal {
        message: format!("{oid}: {}", e.message()),
    })
}

// Behavior against real repositories is covered by the integration suites
// under tests/; constructing repository fixtures inline here would only
// duplicate that harness.
