//! core::state::store
//!
//! The persistent branch-graph store.
//!
//! # Architecture
//!
//! State lives in a single JSON document at `.git/arbor/state.json`. Every
//! mutation goes through [`StateStore::upsert`], which applies a batch of
//! updates to a copy, validates the result, writes it to a temporary file
//! in the same directory, and atomically renames it into place. A reader
//! therefore always observes some fully-committed state; partial batches
//! are never visible.
//!
//! # Concurrency
//!
//! The store is single-writer per repository. Opening the store acquires
//! the exclusive lock (bounded wait, then [`StoreError::Busy`]) and holds
//! it until the store is dropped. The same lock gates worktree mutations,
//! so holding an open store is the licence to rebase.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use super::schema::{parse_state, BranchRecord, SchemaError, StateV1};
use crate::core::ops::lock::{LockError, StoreLock};
use crate::core::paths::StatePaths;
use crate::core::types::{BranchName, TypeError, UtcTimestamp};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No store exists in this repository yet.
    #[error("arbor is not initialised in this repository (run 'arbor init')")]
    NotInitialised,

    /// `init` was called with a trunk different from the recorded one.
    #[error("store already initialised with trunk '{existing}', refusing trunk '{requested}'")]
    AlreadyInitialised { existing: String, requested: String },

    /// The store lock could not be acquired within the timeout.
    #[error("store is busy: {0}")]
    Busy(LockError),

    /// Locking failed for a reason other than contention.
    #[error(transparent)]
    Lock(LockError),

    /// A named branch has no record.
    #[error("branch '{0}' is not tracked")]
    UnknownBranch(String),

    /// A batch tried to delete a record that does not exist.
    #[error("cannot delete untracked branch '{0}'")]
    DeleteUnknown(String),

    /// The state document is malformed or violates invariants.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A stored name or hash failed validation.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Filesystem failure reading or writing the state file.
    #[error("state file i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<LockError> for StoreError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Busy { .. } => StoreError::Busy(err),
            other => StoreError::Lock(other),
        }
    }
}

/// One entry of an atomic batch.
#[derive(Debug, Clone)]
pub enum StateUpdate {
    /// Insert or replace a branch record.
    Set(BranchName, BranchRecord),
    /// Remove a branch record.
    Delete(BranchName),
}

/// The open, locked branch-graph store.
pub struct StateStore {
    paths: StatePaths,
    trunk: BranchName,
    state: StateV1,
    _lock: StoreLock,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("path", &self.paths.state_file())
            .field("trunk", &self.trunk)
            .field("branches", &self.state.branches.len())
            .finish()
    }
}

impl StateStore {
    /// Open an existing store, taking the exclusive lock.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotInitialised`] when no state file exists
    /// - [`StoreError::Busy`] when another process holds the lock past
    ///   `timeout`
    /// - [`StoreError::Schema`] when the state file fails validation
    pub fn open(common_dir: &Path, timeout: Duration) -> Result<Self, StoreError> {
        let paths = StatePaths::new(common_dir);
        let lock = StoreLock::acquire(&paths.lock_file(), timeout)?;
        let state_file = paths.state_file();
        if !state_file.exists() {
            return Err(StoreError::NotInitialised);
        }
        let json = std::fs::read_to_string(&state_file).map_err(|source| StoreError::Io {
            path: state_file,
            source,
        })?;
        let state = parse_state(&json)?;
        let trunk = BranchName::new(state.trunk.name.clone())?;
        Ok(Self {
            paths,
            trunk,
            state,
            _lock: lock,
        })
    }

    /// Initialise the store with a trunk record, or reopen it idempotently.
    ///
    /// Re-running with the same trunk is a no-op; a different trunk fails
    /// with [`StoreError::AlreadyInitialised`].
    pub fn init(
        common_dir: &Path,
        trunk: &BranchName,
        remote: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        match Self::open(common_dir, timeout) {
            Ok(store) => {
                if store.trunk() != trunk {
                    return Err(StoreError::AlreadyInitialised {
                        existing: store.trunk().to_string(),
                        requested: trunk.to_string(),
                    });
                }
                Ok(store)
            }
            Err(StoreError::NotInitialised) => {
                let paths = StatePaths::new(common_dir);
                let lock = StoreLock::acquire(&paths.lock_file(), timeout)?;
                let state = StateV1::new(trunk.clone(), remote);
                write_state(&paths, &state)?;
                Ok(Self {
                    paths,
                    trunk: trunk.clone(),
                    state,
                    _lock: lock,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Read the state without locking.
    ///
    /// Because writes are atomic renames, this observes some committed
    /// point-in-time snapshot. Use for read-only listings; never for
    /// mutation decisions.
    pub fn read_snapshot(common_dir: &Path) -> Result<StateV1, StoreError> {
        let state_file = StatePaths::new(common_dir).state_file();
        if !state_file.exists() {
            return Err(StoreError::NotInitialised);
        }
        let json = std::fs::read_to_string(&state_file).map_err(|source| StoreError::Io {
            path: state_file,
            source,
        })?;
        Ok(parse_state(&json)?)
    }

    /// The trunk branch name.
    pub fn trunk(&self) -> &BranchName {
        &self.trunk
    }

    /// The remote the trunk tracks, if recorded.
    pub fn trunk_remote(&self) -> Option<&str> {
        self.state.trunk.remote.as_deref()
    }

    /// The record for a branch.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownBranch`] when the branch has no record.
    pub fn get(&self, branch: &BranchName) -> Result<&BranchRecord, StoreError> {
        self.lookup(branch)
            .ok_or_else(|| StoreError::UnknownBranch(branch.to_string()))
    }

    /// The record for a branch, or `None` when untracked.
    pub fn lookup(&self, branch: &BranchName) -> Option<&BranchRecord> {
        self.state.branches.get(branch.as_str())
    }

    /// Whether a branch has a record.
    pub fn contains(&self, branch: &BranchName) -> bool {
        self.state.branches.contains_key(branch.as_str())
    }

    /// All tracked branch names, lexicographically ordered.
    pub fn list(&self) -> Vec<BranchName> {
        self.state
            .branches
            .keys()
            // Keys were validated at load/write time.
            .filter_map(|name| BranchName::new(name.clone()).ok())
            .collect()
    }

    /// The full in-memory state.
    pub fn state(&self) -> &StateV1 {
        &self.state
    }

    /// Atomically apply a batch of updates.
    ///
    /// The batch is applied to a copy, validated as a whole, and committed
    /// with a single rename. Either every entry lands or none does; the
    /// in-memory state only advances after the file is in place.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DeleteUnknown`] for a `Delete` of an untracked name
    /// - [`StoreError::Schema`] when the resulting state would violate the
    ///   graph invariants (the file is left untouched)
    pub fn upsert(
        &mut self,
        batch: impl IntoIterator<Item = StateUpdate>,
    ) -> Result<(), StoreError> {
        let mut next = self.state.clone();
        for update in batch {
            match update {
                StateUpdate::Set(name, record) => {
                    next.branches.insert(name.to_string(), record);
                }
                StateUpdate::Delete(name) => {
                    if next.branches.remove(name.as_str()).is_none() {
                        return Err(StoreError::DeleteUnknown(name.to_string()));
                    }
                }
            }
        }
        next.updated_at = UtcTimestamp::now();
        next.check()?;
        write_state(&self.paths, &next)?;
        self.state = next;
        Ok(())
    }
}

/// Serialize and atomically replace the state file.
///
/// The temporary file is created in the state directory so the final
/// `persist` is a same-filesystem rename.
fn write_state(paths: &StatePaths, state: &StateV1) -> Result<(), StoreError> {
    let root = paths.root().to_path_buf();
    std::fs::create_dir_all(&root).map_err(|source| StoreError::Io {
        path: root.clone(),
        source,
    })?;

    let json = state.to_json()?;
    let mut tmp = tempfile::NamedTempFile::new_in(&root).map_err(|source| StoreError::Io {
        path: root.clone(),
        source,
    })?;
    tmp.write_all(json.as_bytes())
        .and_then(|()| tmp.write_all(b"\n"))
        .map_err(|source| StoreError::Io {
            path: tmp.path().to_path_buf(),
            source,
        })?;

    let state_file = paths.state_file();
    tmp.persist(&state_file).map_err(|e| StoreError::Io {
        path: state_file,
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Oid;
    use tempfile::TempDir;

    const NO_WAIT: Duration = Duration::ZERO;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    fn oid(seed: u8) -> Oid {
        Oid::new(format!("{:040x}", seed as u64)).unwrap()
    }

    fn init_store(dir: &TempDir) -> StateStore {
        StateStore::init(dir.path(), &branch("main"), None, NO_WAIT).unwrap()
    }

    #[test]
    fn open_before_init_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            StateStore::open(dir.path(), NO_WAIT),
            Err(StoreError::NotInitialised)
        ));
    }

    #[test]
    fn init_then_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = init_store(&dir);
            assert_eq!(store.trunk(), &branch("main"));
        }
        let store = StateStore::open(dir.path(), NO_WAIT).unwrap();
        assert_eq!(store.trunk(), &branch("main"));
        assert!(store.list().is_empty());
    }

    #[test]
    fn init_is_idempotent_for_same_trunk() {
        let dir = TempDir::new().unwrap();
        drop(init_store(&dir));
        assert!(StateStore::init(dir.path(), &branch("main"), None, NO_WAIT).is_ok());
    }

    #[test]
    fn init_rejects_different_trunk() {
        let dir = TempDir::new().unwrap();
        drop(init_store(&dir));
        let result = StateStore::init(dir.path(), &branch("develop"), None, NO_WAIT);
        assert!(matches!(
            result,
            Err(StoreError::AlreadyInitialised { .. })
        ));
    }

    #[test]
    fn upsert_set_and_get() {
        let dir = TempDir::new().unwrap();
        let mut store = init_store(&dir);

        store
            .upsert([StateUpdate::Set(
                branch("feat"),
                BranchRecord::new(&branch("main"), &oid(1)),
            )])
            .unwrap();

        let record = store.get(&branch("feat")).unwrap();
        assert_eq!(record.base.name, "main");
        assert_eq!(record.base.hash, oid(1).to_string());
        assert!(matches!(
            store.get(&branch("ghost")),
            Err(StoreError::UnknownBranch(_))
        ));
    }

    #[test]
    fn upsert_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = init_store(&dir);
            store
                .upsert([
                    StateUpdate::Set(branch("a"), BranchRecord::new(&branch("main"), &oid(1))),
                    StateUpdate::Set(branch("b"), BranchRecord::new(&branch("a"), &oid(2))),
                ])
                .unwrap();
        }
        let store = StateStore::open(dir.path(), NO_WAIT).unwrap();
        assert_eq!(store.list(), vec![branch("a"), branch("b")]);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let mut store = init_store(&dir);
        store
            .upsert([StateUpdate::Set(
                branch("a"),
                BranchRecord::new(&branch("main"), &oid(1)),
            )])
            .unwrap();

        // Second entry of the batch is invalid (deletes an unknown name);
        // the first entry must not land either.
        let result = store.upsert([
            StateUpdate::Set(branch("b"), BranchRecord::new(&branch("a"), &oid(2))),
            StateUpdate::Delete(branch("ghost")),
        ]);
        assert!(matches!(result, Err(StoreError::DeleteUnknown(_))));
        assert_eq!(store.list(), vec![branch("a")]);

        let reread = StateStore::read_snapshot(dir.path()).unwrap();
        assert_eq!(reread.branches.len(), 1);
    }

    #[test]
    fn upsert_rejects_dangling_base() {
        let dir = TempDir::new().unwrap();
        let mut store = init_store(&dir);
        let result = store.upsert([StateUpdate::Set(
            branch("b"),
            BranchRecord::new(&branch("missing"), &oid(1)),
        )]);
        assert!(matches!(result, Err(StoreError::Schema(_))));
        assert!(store.list().is_empty());
    }

    #[test]
    fn upsert_rejects_cycles() {
        let dir = TempDir::new().unwrap();
        let mut store = init_store(&dir);
        store
            .upsert([
                StateUpdate::Set(branch("a"), BranchRecord::new(&branch("main"), &oid(1))),
                StateUpdate::Set(branch("b"), BranchRecord::new(&branch("a"), &oid(2))),
            ])
            .unwrap();

        let result = store.upsert([StateUpdate::Set(
            branch("a"),
            BranchRecord::new(&branch("b"), &oid(3)),
        )]);
        assert!(matches!(result, Err(StoreError::Schema(_))));
    }

    #[test]
    fn second_writer_fails_busy() {
        let dir = TempDir::new().unwrap();
        let _store = init_store(&dir);
        let result = StateStore::open(dir.path(), Duration::from_millis(150));
        assert!(matches!(result, Err(StoreError::Busy(_))));
    }

    #[test]
    fn snapshot_read_works_while_locked() {
        let dir = TempDir::new().unwrap();
        let mut store = init_store(&dir);
        store
            .upsert([StateUpdate::Set(
                branch("feat"),
                BranchRecord::new(&branch("main"), &oid(1)),
            )])
            .unwrap();

        // Reader needs no lock and sees the committed snapshot.
        let snapshot = StateStore::read_snapshot(dir.path()).unwrap();
        assert!(snapshot.branches.contains_key("feat"));
    }

    #[test]
    fn delete_removes_record() {
        let dir = TempDir::new().unwrap();
        let mut store = init_store(&dir);
        store
            .upsert([StateUpdate::Set(
                branch("feat"),
                BranchRecord::new(&branch("main"), &oid(1)),
            )])
            .unwrap();
        store.upsert([StateUpdate::Delete(branch("feat"))]).unwrap();
        assert!(!store.contains(&branch("feat")));
    }
}
