//! git::mock
//!
//! Deterministic in-memory [`Vcs`] implementation for tests.
//!
//! # Design
//!
//! Commits are synthetic ids in a linear-parent DAG; branches are tips in
//! a map. Rebases replay the unique commit range as fresh ids, exactly
//! like git does, so merge-base arithmetic behaves realistically. Tests
//! can script a conflict on a branch, later "resolve" it with
//! [`MockVcs::finish_rebase`], and inspect the recorded operations.
//!
//! # Example
//!
//! ```
//! use arbor::git::mock::MockVcs;
//! use arbor::git::Vcs;
//! use arbor::core::types::BranchName;
//!
//! let vcs = MockVcs::new();
//! let main = BranchName::new("main").unwrap();
//! let feat = BranchName::new("feat").unwrap();
//!
//! vcs.create_branch(&feat, &main);
//! vcs.commit(&feat);
//!
//! let base = vcs.merge_base(&feat, &main).unwrap().unwrap();
//! assert_eq!(base, vcs.resolve(&main).unwrap());
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::core::types::{BranchName, Oid};

use super::{GitError, GitState, RebaseStatus, Vcs};

/// Recorded adapter call, for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Checkout {
        branch: String,
    },
    RebaseOnto {
        branch: String,
        upstream: String,
        new_base: String,
    },
    DeleteBranch {
        branch: String,
        force: bool,
    },
}

/// A rebase that stopped on a scripted conflict, awaiting resolution.
#[derive(Debug, Clone)]
struct PendingRebase {
    branch: BranchName,
    upstream: Oid,
    new_base: BranchName,
}

#[derive(Debug)]
struct MockInner {
    /// Parent pointer per commit (linear histories).
    commits: HashMap<Oid, Option<Oid>>,
    /// Branch tips.
    branches: BTreeMap<String, Oid>,
    /// Checked-out branch; `None` models a detached HEAD.
    current: Option<BranchName>,
    default: Option<BranchName>,
    /// Branches whose next rebase stops with a conflict.
    conflicts: HashSet<String>,
    /// Branches that refuse non-forced deletion.
    unmerged: HashSet<String>,
    pending: Option<PendingRebase>,
    next_commit: u64,
    operations: Vec<MockOperation>,
}

/// In-memory repository double.
///
/// Clonable; all clones share state, mirroring a single repository seen by
/// several components.
#[derive(Debug, Clone)]
pub struct MockVcs {
    inner: Arc<Mutex<MockInner>>,
}

impl Default for MockVcs {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVcs {
    /// A repository with a `main` branch at a root commit, checked out.
    pub fn new() -> Self {
        let main = BranchName::new("main").expect("static name");
        let mut inner = MockInner {
            commits: HashMap::new(),
            branches: BTreeMap::new(),
            current: Some(main.clone()),
            default: Some(main.clone()),
            conflicts: HashSet::new(),
            unmerged: HashSet::new(),
            pending: None,
            next_commit: 0,
            operations: Vec::new(),
        };
        let root = next_oid(&mut inner);
        inner.commits.insert(root.clone(), None);
        inner.branches.insert(main.to_string(), root);
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Create a branch at the tip of `from`.
    pub fn create_branch(&self, name: &BranchName, from: &BranchName) {
        let mut inner = self.lock();
        let tip = inner.branches[from.as_str()].clone();
        inner.branches.insert(name.to_string(), tip);
    }

    /// Append a commit to a branch, returning the new tip.
    pub fn commit(&self, branch: &BranchName) -> Oid {
        let mut inner = self.lock();
        let parent = inner.branches[branch.as_str()].clone();
        let oid = next_oid(&mut inner);
        inner.commits.insert(oid.clone(), Some(parent));
        inner.branches.insert(branch.to_string(), oid.clone());
        oid
    }

    /// Current tip of a branch. Panics on unknown names (test setup bug).
    pub fn tip(&self, branch: &BranchName) -> Oid {
        self.lock().branches[branch.as_str()].clone()
    }

    /// Script the next rebase of `branch` to stop with a conflict.
    pub fn conflict_on(&self, branch: &BranchName) {
        self.lock().conflicts.insert(branch.to_string());
    }

    /// Mark a branch as unmerged, so non-forced deletion is refused.
    pub fn mark_unmerged(&self, branch: &BranchName) {
        self.lock().unmerged.insert(branch.to_string());
    }

    /// Complete the pending conflicted rebase, as the user would with
    /// `git rebase --continue` after resolving.
    ///
    /// Returns the rebased branch's new tip.
    pub fn finish_rebase(&self) -> Oid {
        let mut inner = self.lock();
        let pending = inner.pending.take().expect("no rebase in progress");
        apply_rebase(&mut inner, &pending.branch, &pending.upstream, &pending.new_base)
    }

    /// All recorded operations so far.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockInner> {
        self.inner.lock().expect("mock lock poisoned")
    }
}

/// Synthesize the next commit id.
fn next_oid(inner: &mut MockInner) -> Oid {
    inner.next_commit += 1;
    Oid::new(format!("{:040x}", inner.next_commit)).expect("synthesized oid")
}

/// Ancestors of `oid` including itself, tip first.
fn ancestry(inner: &MockInner, oid: &Oid) -> Vec<Oid> {
    let mut chain = Vec::new();
    let mut current = Some(oid.clone());
    while let Some(oid) = current {
        current = inner.commits.get(&oid).cloned().flatten();
        chain.push(oid);
    }
    chain
}

/// Replay the commits of `branch` unique relative to `upstream` onto the
/// tip of `new_base`, moving the branch tip. Returns the new tip.
fn apply_rebase(
    inner: &mut MockInner,
    branch: &BranchName,
    upstream: &Oid,
    new_base: &BranchName,
) -> Oid {
    let tip = inner.branches[branch.as_str()].clone();
    if &inner.branches[new_base.as_str()] == upstream {
        // Branch already sits where it would land; git reports up-to-date
        // without rewriting anything.
        return tip;
    }
    let mut unique: Vec<Oid> = ancestry(inner, &tip)
        .into_iter()
        .take_while(|oid| oid != upstream)
        .collect();
    unique.reverse(); // replay oldest first

    let mut new_tip = inner.branches[new_base.as_str()].clone();
    for _ in unique {
        let replayed = next_oid(inner);
        inner.commits.insert(replayed.clone(), Some(new_tip));
        new_tip = replayed;
    }
    inner.branches.insert(branch.to_string(), new_tip.clone());
    new_tip
}

impl Vcs for MockVcs {
    fn resolve(&self, branch: &BranchName) -> Result<Oid, GitError> {
        self.lock()
            .branches
            .get(branch.as_str())
            .cloned()
            .ok_or_else(|| GitError::BranchNotFound {
                branch: branch.to_string(),
            })
    }

    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        Ok(self.lock().current.clone())
    }

    fn checkout(&self, branch: &BranchName) -> Result<(), GitError> {
        let mut inner = self.lock();
        if inner.pending.is_some() {
            return Err(GitError::OperationInProgress {
                operation: GitState::Rebase,
            });
        }
        if !inner.branches.contains_key(branch.as_str()) {
            return Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            });
        }
        inner.current = Some(branch.clone());
        inner.operations.push(MockOperation::Checkout {
            branch: branch.to_string(),
        });
        Ok(())
    }

    fn commits_between(&self, from: &Oid, to: &BranchName) -> Result<Vec<Oid>, GitError> {
        let inner = self.lock();
        let tip = inner
            .branches
            .get(to.as_str())
            .cloned()
            .ok_or_else(|| GitError::BranchNotFound {
                branch: to.to_string(),
            })?;
        let mut unique: Vec<Oid> = ancestry(&inner, &tip)
            .into_iter()
            .take_while(|oid| oid != from)
            .collect();
        unique.reverse();
        Ok(unique)
    }

    fn rebase_onto(
        &self,
        branch: &BranchName,
        upstream: &Oid,
        new_base: &BranchName,
    ) -> Result<RebaseStatus, GitError> {
        let mut inner = self.lock();
        if inner.pending.is_some() {
            return Err(GitError::OperationInProgress {
                operation: GitState::Rebase,
            });
        }
        for name in [branch, new_base] {
            if !inner.branches.contains_key(name.as_str()) {
                return Err(GitError::BranchNotFound {
                    branch: name.to_string(),
                });
            }
        }
        inner.operations.push(MockOperation::RebaseOnto {
            branch: branch.to_string(),
            upstream: upstream.to_string(),
            new_base: new_base.to_string(),
        });

        if inner.conflicts.remove(branch.as_str()) {
            inner.pending = Some(PendingRebase {
                branch: branch.clone(),
                upstream: upstream.clone(),
                new_base: new_base.clone(),
            });
            return Ok(RebaseStatus::Conflict {
                state: GitState::Rebase,
            });
        }

        let new_tip = apply_rebase(&mut inner, branch, upstream, new_base);
        Ok(RebaseStatus::Completed { new_tip })
    }

    fn delete_branch(&self, branch: &BranchName, force: bool) -> Result<(), GitError> {
        let mut inner = self.lock();
        if !inner.branches.contains_key(branch.as_str()) {
            return Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            });
        }
        if !force && inner.unmerged.contains(branch.as_str()) {
            return Err(GitError::NotMerged {
                branch: branch.to_string(),
            });
        }
        inner.branches.remove(branch.as_str());
        if inner.current.as_ref() == Some(branch) {
            inner.current = None;
        }
        inner.operations.push(MockOperation::DeleteBranch {
            branch: branch.to_string(),
            force,
        });
        Ok(())
    }

    fn merge_base(&self, a: &BranchName, b: &BranchName) -> Result<Option<Oid>, GitError> {
        let inner = self.lock();
        let tip = |name: &BranchName| {
            inner
                .branches
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| GitError::BranchNotFound {
                    branch: name.to_string(),
                })
        };
        let reachable: HashSet<Oid> = ancestry(&inner, &tip(a)?).into_iter().collect();
        Ok(ancestry(&inner, &tip(b)?)
            .into_iter()
            .find(|oid| reachable.contains(oid)))
    }

    fn default_branch(&self) -> Result<Option<BranchName>, GitError> {
        Ok(self.lock().default.clone())
    }
}
