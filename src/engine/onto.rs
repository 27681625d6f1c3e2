//! engine::onto
//!
//! The atomic re-parent primitive.
//!
//! `onto(x, new_base)` replays the commits unique to `x` (relative to its
//! *old* recorded base hash, so exactly the right range moves) onto the
//! new base's tip, then rewrites the record in one store batch: both
//! `base.name` and `base.hash` change together, opaque metadata rides
//! along.

use crate::core::state::{StateStore, StateUpdate};
use crate::core::types::{BranchName, Oid};
use crate::git::{RebaseStatus, Vcs};
use crate::stack::StackService;

use super::{Context, EngineError};

/// Re-parent `branch` onto `new_base`, rebasing and updating the record.
///
/// Returns the new base tip recorded for the branch.
///
/// # Errors
///
/// - [`EngineError::TrunkNotTracked`] when `branch` is the trunk
/// - [`EngineError::UnknownBranch`] when `branch` is untracked or
///   `new_base` is neither tracked nor the trunk
/// - [`EngineError::WouldCycle`] when `new_base` lives in `branch`'s own
///   upstack
/// - [`EngineError::Conflict`] when the rebase stops; the store keeps the
///   old parent so the operation can be re-run after resolution
pub fn onto(
    store: &mut StateStore,
    vcs: &dyn Vcs,
    ctx: &Context,
    branch: &BranchName,
    new_base: &BranchName,
) -> Result<Oid, EngineError> {
    if branch == store.trunk() {
        return Err(EngineError::TrunkNotTracked(branch.to_string()));
    }
    let record = store.get(branch)?.clone();
    if new_base != store.trunk() && !store.contains(new_base) {
        return Err(EngineError::UnknownBranch(new_base.to_string()));
    }
    // Re-parenting onto a descendant would fold the branch under its own
    // subtree.
    if branch == new_base
        || StackService::new(store)?
            .list_upstack(branch)?
            .contains(new_base)
    {
        return Err(EngineError::WouldCycle {
            branch: branch.clone(),
            onto: new_base.clone(),
        });
    }

    let old_hash = record
        .base_hash()
        .map_err(|e| EngineError::Internal(e.to_string()))?;

    ctx.ensure_live()?;
    let new_base_tip = vcs.resolve(new_base)?;
    let already_in_position =
        record.base.name == new_base.as_str() && vcs.merge_base(branch, new_base)? == Some(new_base_tip.clone());
    ctx.ensure_live()?;

    if already_in_position {
        // Nothing to replay; refresh the hash if it lags.
        if old_hash != new_base_tip {
            store.upsert([StateUpdate::Set(
                branch.clone(),
                record.rebased(new_base, &new_base_tip),
            )])?;
        }
        return Ok(new_base_tip);
    }

    let status = vcs.rebase_onto(branch, &old_hash, new_base)?;
    ctx.ensure_live()?;
    match status {
        RebaseStatus::Completed { .. } => {
            store.upsert([StateUpdate::Set(
                branch.clone(),
                record.rebased(new_base, &new_base_tip),
            )])?;
            Ok(new_base_tip)
        }
        RebaseStatus::Conflict { .. } => Err(EngineError::Conflict {
            branch: branch.clone(),
            base: new_base.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::BranchRecord;
    use crate::git::mock::MockVcs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    fn quiet_ctx() -> Context {
        Context {
            quiet: true,
            ..Context::default()
        }
    }

    /// main -> a -> b, plus an independent main -> other.
    fn fixture(dir: &TempDir) -> (StateStore, MockVcs) {
        let vcs = MockVcs::new();
        let main = branch("main");
        for (name, base) in [("a", "main"), ("b", "a"), ("other", "main")] {
            let name = branch(name);
            vcs.create_branch(&name, &branch(base));
            vcs.commit(&name);
        }
        let mut store =
            StateStore::init(dir.path(), &main, None, Duration::ZERO).unwrap();
        store
            .upsert([
                StateUpdate::Set(
                    branch("a"),
                    BranchRecord::new(&main, &vcs.tip(&main)),
                ),
                StateUpdate::Set(branch("b"), BranchRecord::new(&branch("a"), &vcs.tip(&branch("a")))),
                StateUpdate::Set(
                    branch("other"),
                    BranchRecord::new(&main, &vcs.tip(&main)),
                ),
            ])
            .unwrap();
        (store, vcs)
    }

    #[test]
    fn onto_moves_branch_and_rewrites_record() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = fixture(&dir);
        let b = branch("b");
        let other = branch("other");

        let new_hash = onto(&mut store, &vcs, &quiet_ctx(), &b, &other).unwrap();
        let record = store.get(&b).unwrap();
        assert_eq!(record.base.name, "other");
        assert_eq!(record.base.hash, new_hash.to_string());
        assert_eq!(vcs.merge_base(&b, &other).unwrap(), Some(vcs.tip(&other)));
    }

    #[test]
    fn onto_preserves_opaque_metadata() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = fixture(&dir);
        let b = branch("b");

        let mut record = store.get(&b).unwrap().clone();
        record.upstream = Some("origin".into());
        record.change = Some(serde_json::json!({ "id": "CR-12" }));
        store
            .upsert([StateUpdate::Set(b.clone(), record)])
            .unwrap();

        onto(&mut store, &vcs, &quiet_ctx(), &b, &branch("other")).unwrap();
        let moved = store.get(&b).unwrap();
        assert_eq!(moved.upstream.as_deref(), Some("origin"));
        assert_eq!(moved.change, Some(serde_json::json!({ "id": "CR-12" })));
    }

    #[test]
    fn onto_trunk_reparents_to_root() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = fixture(&dir);
        let b = branch("b");
        let main = branch("main");

        onto(&mut store, &vcs, &quiet_ctx(), &b, &main).unwrap();
        assert_eq!(store.get(&b).unwrap().base.name, "main");
        assert_eq!(vcs.merge_base(&b, &main).unwrap(), Some(vcs.tip(&main)));
    }

    #[test]
    fn onto_rejects_cycles_and_self() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = fixture(&dir);
        let a = branch("a");
        let b = branch("b");

        // b is in a's upstack.
        assert!(matches!(
            onto(&mut store, &vcs, &quiet_ctx(), &a, &b),
            Err(EngineError::WouldCycle { .. })
        ));
        assert!(matches!(
            onto(&mut store, &vcs, &quiet_ctx(), &a, &a),
            Err(EngineError::WouldCycle { .. })
        ));
    }

    #[test]
    fn onto_rejects_bad_names() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = fixture(&dir);

        assert!(matches!(
            onto(&mut store, &vcs, &quiet_ctx(), &branch("main"), &branch("a")),
            Err(EngineError::TrunkNotTracked(_))
        ));
        assert!(matches!(
            onto(&mut store, &vcs, &quiet_ctx(), &branch("ghost"), &branch("a")),
            Err(EngineError::UnknownBranch(_))
        ));
        assert!(matches!(
            onto(&mut store, &vcs, &quiet_ctx(), &branch("a"), &branch("ghost")),
            Err(EngineError::UnknownBranch(_))
        ));
    }

    #[test]
    fn onto_in_position_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = fixture(&dir);
        let a = branch("a");
        let main = branch("main");
        let tip_before = vcs.tip(&a);

        onto(&mut store, &vcs, &quiet_ctx(), &a, &main).unwrap();
        assert_eq!(vcs.tip(&a), tip_before);
        assert_eq!(store.get(&a).unwrap().base.name, "main");
    }

    #[test]
    fn onto_conflict_keeps_old_parent() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = fixture(&dir);
        let b = branch("b");
        let other = branch("other");

        let record_before = store.get(&b).unwrap().clone();
        vcs.conflict_on(&b);

        let err = onto(&mut store, &vcs, &quiet_ctx(), &b, &other).unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));
        assert_eq!(store.get(&b).unwrap(), &record_before);
    }
}
