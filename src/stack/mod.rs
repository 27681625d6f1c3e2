//! stack
//!
//! Pure graph traversals over the branch-graph store.
//!
//! # Architecture
//!
//! The service takes a snapshot of store state at construction, builds the
//! forest once, and answers traversal queries with no side effects on the
//! repository or the store. All orderings are deterministic: children of a
//! node come in lexicographic name order, downstacks follow the base chain
//! strictly.
//!
//! Trunk handling: the trunk is the root of every tree but is not itself
//! tracked. It never appears in an upstack listing unless traversal starts
//! *at* the trunk explicitly, and downstacks stop just before it.

use thiserror::Error;

use crate::core::graph::BranchGraph;
use crate::core::state::schema::Violation;
use crate::core::state::StateStore;
use crate::core::types::{BranchName, TypeError};

/// Errors from stack queries.
#[derive(Debug, Error)]
pub enum StackError {
    /// The named branch has no record in the store.
    #[error("branch '{0}' is not tracked")]
    UnknownBranch(String),

    /// The operation treats trunk as a tracked branch, which it never is.
    #[error("'{0}' is the trunk; the operation needs a tracked branch")]
    TrunkNotTracked(String),

    /// A stored name failed validation while building the forest.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Read-only traversal service over one store snapshot.
pub struct StackService {
    trunk: BranchName,
    tracked: Vec<BranchName>,
    graph: BranchGraph,
    violations: Vec<Violation>,
}

impl StackService {
    /// Build the forest from the store's current state.
    pub fn new(store: &StateStore) -> Result<Self, StackError> {
        Self::from_state(store.state())
    }

    /// Build the forest from a point-in-time snapshot.
    ///
    /// Useful for read-only listings that work off
    /// [`StateStore::read_snapshot`] without taking the lock.
    pub fn from_state(state: &crate::core::state::StateV1) -> Result<Self, StackError> {
        let mut tracked = Vec::with_capacity(state.branches.len());
        for name in state.branches.keys() {
            tracked.push(BranchName::new(name.clone())?);
        }
        Ok(Self {
            trunk: BranchName::new(state.trunk.name.clone())?,
            tracked,
            graph: state.graph()?,
            violations: state.violations(),
        })
    }

    /// The trunk branch name.
    pub fn trunk(&self) -> &BranchName {
        &self.trunk
    }

    /// Whether a branch has a record in this snapshot.
    pub fn is_tracked(&self, branch: &BranchName) -> bool {
        self.tracked.binary_search(branch).is_ok()
    }

    /// All tracked branches, lexicographically ordered.
    pub fn tracked(&self) -> &[BranchName] {
        &self.tracked
    }

    /// The upstack of a branch: itself plus every branch transitively based
    /// on it, in pre-order (parents before children, siblings by name).
    ///
    /// Starting at the trunk is allowed (the explicit traversal of the
    /// entire forest) and is the only case where trunk appears in the
    /// result.
    pub fn list_upstack(&self, branch: &BranchName) -> Result<Vec<BranchName>, StackError> {
        self.require_tracked_or_trunk(branch)?;
        Ok(self.graph.pre_order(branch))
    }

    /// The downstack of a branch: itself, then its base chain, stopping
    /// just before the trunk. Never empty; the first element is always the
    /// branch itself.
    pub fn list_downstack(&self, branch: &BranchName) -> Result<Vec<BranchName>, StackError> {
        self.require_tracked(branch)?;
        let mut chain = vec![branch.clone()];
        chain.extend(
            self.graph
                .ancestors(branch)
                .into_iter()
                .filter(|ancestor| ancestor != &self.trunk),
        );
        Ok(chain)
    }

    /// Direct children of a branch, in name order.
    pub fn list_above(&self, branch: &BranchName) -> Result<Vec<BranchName>, StackError> {
        self.require_tracked_or_trunk(branch)?;
        Ok(self.graph.children(branch).to_vec())
    }

    /// The base of a branch (its direct parent; possibly the trunk).
    pub fn list_below(&self, branch: &BranchName) -> Result<BranchName, StackError> {
        self.require_tracked(branch)?;
        self.graph
            .parent(branch)
            .cloned()
            // A tracked branch always has a base; its absence means the
            // snapshot broke invariant 1.
            .ok_or_else(|| StackError::UnknownBranch(branch.to_string()))
    }

    /// All graph-invariant violations in this snapshot.
    ///
    /// Collected, not failed on: callers render the whole list.
    pub fn validate(&self) -> &[Violation] {
        &self.violations
    }

    fn require_tracked(&self, branch: &BranchName) -> Result<(), StackError> {
        if branch == &self.trunk {
            return Err(StackError::TrunkNotTracked(branch.to_string()));
        }
        if !self.is_tracked(branch) {
            return Err(StackError::UnknownBranch(branch.to_string()));
        }
        Ok(())
    }

    fn require_tracked_or_trunk(&self, branch: &BranchName) -> Result<(), StackError> {
        if branch == &self.trunk {
            return Ok(());
        }
        if !self.is_tracked(branch) {
            return Err(StackError::UnknownBranch(branch.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{BranchRecord, StateStore, StateUpdate};
    use crate::core::types::Oid;
    use std::time::Duration;
    use tempfile::TempDir;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    fn oid(seed: u8) -> Oid {
        Oid::new(format!("{:040x}", seed as u64)).unwrap()
    }

    /// Store with: main -> a -> b -> c and main -> z.
    fn populated_store(dir: &TempDir) -> StateStore {
        let mut store =
            StateStore::init(dir.path(), &branch("main"), None, Duration::ZERO).unwrap();
        store
            .upsert([
                StateUpdate::Set(branch("a"), BranchRecord::new(&branch("main"), &oid(1))),
                StateUpdate::Set(branch("b"), BranchRecord::new(&branch("a"), &oid(2))),
                StateUpdate::Set(branch("c"), BranchRecord::new(&branch("b"), &oid(3))),
                StateUpdate::Set(branch("z"), BranchRecord::new(&branch("main"), &oid(4))),
            ])
            .unwrap();
        store
    }

    #[test]
    fn upstack_is_preorder_from_branch() {
        let dir = TempDir::new().unwrap();
        let service = StackService::new(&populated_store(&dir)).unwrap();

        assert_eq!(
            service.list_upstack(&branch("a")).unwrap(),
            vec![branch("a"), branch("b"), branch("c")]
        );
        assert_eq!(service.list_upstack(&branch("c")).unwrap(), vec![branch("c")]);
    }

    #[test]
    fn upstack_of_trunk_covers_the_forest() {
        let dir = TempDir::new().unwrap();
        let service = StackService::new(&populated_store(&dir)).unwrap();

        assert_eq!(
            service.list_upstack(&branch("main")).unwrap(),
            vec![branch("main"), branch("a"), branch("b"), branch("c"), branch("z")]
        );
    }

    #[test]
    fn downstack_stops_before_trunk() {
        let dir = TempDir::new().unwrap();
        let service = StackService::new(&populated_store(&dir)).unwrap();

        assert_eq!(
            service.list_downstack(&branch("c")).unwrap(),
            vec![branch("c"), branch("b"), branch("a")]
        );
        // A trunk-child's downstack is just itself.
        assert_eq!(service.list_downstack(&branch("a")).unwrap(), vec![branch("a")]);
    }

    #[test]
    fn downstack_of_trunk_is_refused() {
        let dir = TempDir::new().unwrap();
        let service = StackService::new(&populated_store(&dir)).unwrap();
        assert!(matches!(
            service.list_downstack(&branch("main")),
            Err(StackError::TrunkNotTracked(_))
        ));
    }

    #[test]
    fn unknown_branch_is_an_error() {
        let dir = TempDir::new().unwrap();
        let service = StackService::new(&populated_store(&dir)).unwrap();
        assert!(matches!(
            service.list_upstack(&branch("ghost")),
            Err(StackError::UnknownBranch(_))
        ));
        assert!(matches!(
            service.list_downstack(&branch("ghost")),
            Err(StackError::UnknownBranch(_))
        ));
    }

    #[test]
    fn neighbours_are_direct_only() {
        let dir = TempDir::new().unwrap();
        let service = StackService::new(&populated_store(&dir)).unwrap();

        assert_eq!(service.list_above(&branch("a")).unwrap(), vec![branch("b")]);
        assert_eq!(
            service.list_above(&branch("main")).unwrap(),
            vec![branch("a"), branch("z")]
        );
        assert!(service.list_above(&branch("c")).unwrap().is_empty());

        assert_eq!(service.list_below(&branch("b")).unwrap(), branch("a"));
        assert_eq!(service.list_below(&branch("a")).unwrap(), branch("main"));
        assert!(matches!(
            service.list_below(&branch("main")),
            Err(StackError::TrunkNotTracked(_))
        ));
    }

    #[test]
    fn valid_store_validates_clean() {
        let dir = TempDir::new().unwrap();
        let service = StackService::new(&populated_store(&dir)).unwrap();
        assert!(service.validate().is_empty());
    }

    #[test]
    fn sibling_order_is_lexicographic_not_insertion() {
        let dir = TempDir::new().unwrap();
        let mut store =
            StateStore::init(dir.path(), &branch("main"), None, Duration::ZERO).unwrap();
        // Inserted in reverse name order on purpose.
        store
            .upsert([
                StateUpdate::Set(branch("zz"), BranchRecord::new(&branch("main"), &oid(1))),
                StateUpdate::Set(branch("aa"), BranchRecord::new(&branch("main"), &oid(2))),
            ])
            .unwrap();
        let service = StackService::new(&store).unwrap();
        assert_eq!(
            service.list_upstack(&branch("main")).unwrap(),
            vec![branch("main"), branch("aa"), branch("zz")]
        );
    }
}
