//! engine::lifecycle
//!
//! Track, untrack, and delete: how records enter and leave the store.
//!
//! # Cascades
//!
//! Removing a branch from the middle of a stack re-parents its children
//! onto its former base. The two removals differ in what happens to the
//! children's commits:
//!
//! - **untrack** forgets the record only. Children inherit the removed
//!   record's base *name and hash*, so the forgotten branch's commits fold
//!   into each child's replay range at the next restack. Pure store
//!   change, one atomic batch.
//! - **delete** removes the branch itself. Each child is re-parented via
//!   [`onto`] first (its unique commits replay onto the former base,
//!   dropping the deleted branch's work), then the git branch and the
//!   record go away.

use crate::core::state::{BranchRecord, StateStore, StateUpdate};
use crate::core::types::BranchName;
use crate::git::Vcs;
use crate::stack::StackService;
use crate::ui::output;

use super::onto::onto;
use super::{Context, EngineError};

/// Start tracking `branch` on top of `base`.
///
/// The recorded base hash is the merge-base of the two branches, the
/// commit the branch actually forked from, so a base that has advanced
/// since the fork does not smuggle foreign commits into the branch's
/// replay range.
///
/// # Errors
///
/// - [`EngineError::TrunkNotTracked`] when tracking the trunk itself
/// - [`EngineError::UnknownBranch`] when `base` is neither tracked nor the
///   trunk
/// - [`EngineError::Internal`] when the branch shares no history with the
///   base, or is already tracked
pub fn track_branch(
    store: &mut StateStore,
    vcs: &dyn Vcs,
    ctx: &Context,
    branch: &BranchName,
    base: &BranchName,
) -> Result<(), EngineError> {
    if branch == store.trunk() {
        return Err(EngineError::TrunkNotTracked(branch.to_string()));
    }
    if store.contains(branch) {
        return Err(EngineError::Internal(format!(
            "branch '{branch}' is already tracked"
        )));
    }
    if base != store.trunk() && !store.contains(base) {
        return Err(EngineError::UnknownBranch(base.to_string()));
    }

    ctx.ensure_live()?;
    // Confirms existence as a side effect.
    vcs.resolve(branch)?;
    let fork_point = vcs.merge_base(branch, base)?.ok_or_else(|| {
        EngineError::Internal(format!("'{branch}' shares no history with '{base}'"))
    })?;
    ctx.ensure_live()?;

    store.upsert([StateUpdate::Set(
        branch.clone(),
        BranchRecord::new(base, &fork_point),
    )])?;
    output::print(
        format!("{branch}: tracking with base {base}"),
        ctx.verbosity(),
    );
    Ok(())
}

/// Stop tracking `branch`, re-parenting its children in the store.
///
/// One atomic batch: every child's record moves to the removed record's
/// base (keeping the removed record's hash, see module docs), and the
/// record itself is deleted. The repository is untouched.
pub fn untrack_branch(
    store: &mut StateStore,
    ctx: &Context,
    branch: &BranchName,
) -> Result<(), EngineError> {
    if branch == store.trunk() {
        return Err(EngineError::TrunkNotTracked(branch.to_string()));
    }
    let record = store.get(branch)?.clone();
    let base_name = record
        .base_name()
        .map_err(|e| EngineError::Internal(e.to_string()))?;
    let base_hash = record
        .base_hash()
        .map_err(|e| EngineError::Internal(e.to_string()))?;

    let children = StackService::new(store)?.list_above(branch)?;
    let mut batch: Vec<StateUpdate> = Vec::with_capacity(children.len() + 1);
    for child in &children {
        let child_record = store.get(child)?.clone();
        batch.push(StateUpdate::Set(
            child.clone(),
            child_record.rebased(&base_name, &base_hash),
        ));
    }
    batch.push(StateUpdate::Delete(branch.clone()));

    ctx.ensure_live()?;
    store.upsert(batch)?;
    output::print(format!("{branch}: no longer tracked"), ctx.verbosity());
    Ok(())
}

/// Delete `branch` and its record, cascading children onto its base.
///
/// Children are re-parented one at a time via [`onto`]; each re-parent is
/// its own atomic step, so a conflict mid-cascade leaves the completed
/// ones in place. The checked-out branch is vacated to its base before
/// deletion. Without `force`, git refuses unmerged branches.
pub fn delete_branch(
    store: &mut StateStore,
    vcs: &dyn Vcs,
    ctx: &Context,
    branch: &BranchName,
    force: bool,
) -> Result<(), EngineError> {
    if branch == store.trunk() {
        return Err(EngineError::TrunkNotTracked(branch.to_string()));
    }
    let record = store.get(branch)?.clone();
    let base_name = record
        .base_name()
        .map_err(|e| EngineError::Internal(e.to_string()))?;

    // git will not delete the checked-out branch; move to the base first.
    ctx.ensure_live()?;
    if vcs.current_branch()?.as_ref() == Some(branch) {
        vcs.checkout(&base_name)?;
    }

    let children = StackService::new(store)?.list_above(branch)?;
    for child in &children {
        ctx.ensure_live()?;
        let new_hash = onto(store, vcs, ctx, child, &base_name)?;
        output::debug(
            format!("{child}: re-parented onto {base_name} at {}", new_hash.short(7)),
            ctx.verbosity(),
        );
    }

    ctx.ensure_live()?;
    vcs.delete_branch(branch, force)?;
    store.upsert([StateUpdate::Delete(branch.clone())])?;
    output::print(format!("{branch}: deleted"), ctx.verbosity());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
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

    /// main -> a -> b -> c, one commit per branch.
    fn chain_fixture(dir: &TempDir) -> (StateStore, MockVcs) {
        let vcs = MockVcs::new();
        let main = branch("main");
        let mut store =
            StateStore::init(dir.path(), &main, None, Duration::ZERO).unwrap();
        let ctx = quiet_ctx();

        for (name, base) in [("a", "main"), ("b", "a"), ("c", "b")] {
            let name = branch(name);
            let base = branch(base);
            vcs.create_branch(&name, &base);
            vcs.commit(&name);
            track_branch(&mut store, &vcs, &ctx, &name, &base).unwrap();
        }
        (store, vcs)
    }

    #[test]
    fn track_records_fork_point() {
        let dir = TempDir::new().unwrap();
        let vcs = MockVcs::new();
        let main = branch("main");
        let feat = branch("feat");

        let fork = vcs.tip(&main);
        vcs.create_branch(&feat, &main);
        vcs.commit(&feat);
        // The base advances after the fork; the record must still point at
        // the fork, not the new tip.
        vcs.commit(&main);

        let mut store =
            StateStore::init(dir.path(), &main, None, Duration::ZERO).unwrap();
        track_branch(&mut store, &vcs, &quiet_ctx(), &feat, &main).unwrap();

        let record = store.get(&feat).unwrap();
        assert_eq!(record.base.name, "main");
        assert_eq!(record.base.hash, fork.to_string());
    }

    #[test]
    fn track_rejects_trunk_duplicates_and_unknown_base() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = chain_fixture(&dir);
        let ctx = quiet_ctx();

        assert!(matches!(
            track_branch(&mut store, &vcs, &ctx, &branch("main"), &branch("main")),
            Err(EngineError::TrunkNotTracked(_))
        ));
        assert!(matches!(
            track_branch(&mut store, &vcs, &ctx, &branch("a"), &branch("main")),
            Err(EngineError::Internal(_))
        ));

        let loose = branch("loose");
        vcs.create_branch(&loose, &branch("main"));
        assert!(matches!(
            track_branch(&mut store, &vcs, &ctx, &loose, &branch("ghost")),
            Err(EngineError::UnknownBranch(_))
        ));
    }

    #[test]
    fn untrack_reparents_children_in_one_batch() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = chain_fixture(&dir);
        let b = branch("b");
        let c = branch("c");

        // b's recorded base hash, which c must inherit.
        let b_base_hash = store.get(&b).unwrap().base.hash.clone();

        untrack_branch(&mut store, &quiet_ctx(), &b).unwrap();

        assert!(!store.contains(&b));
        let c_record = store.get(&c).unwrap();
        assert_eq!(c_record.base.name, "a");
        assert_eq!(c_record.base.hash, b_base_hash);
        // The repository itself was not touched.
        assert!(vcs.resolve(&b).is_ok());
        assert!(store.state().violations().is_empty());
    }

    #[test]
    fn delete_cascades_children_onto_former_base() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = chain_fixture(&dir);
        let a = branch("a");
        let b = branch("b");
        let c = branch("c");

        delete_branch(&mut store, &vcs, &quiet_ctx(), &b, true).unwrap();

        assert!(!store.contains(&b));
        assert!(vcs.resolve(&b).is_err());

        // c now sits directly on a, at a's tip.
        let c_record = store.get(&c).unwrap();
        assert_eq!(c_record.base.name, "a");
        assert_eq!(c_record.base.hash, vcs.tip(&a).to_string());
        assert_eq!(vcs.merge_base(&c, &a).unwrap(), Some(vcs.tip(&a)));
        assert!(store.state().violations().is_empty());
    }

    #[test]
    fn delete_vacates_checked_out_branch() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = chain_fixture(&dir);
        let a = branch("a");
        let b = branch("b");

        vcs.checkout(&b).unwrap();
        delete_branch(&mut store, &vcs, &quiet_ctx(), &b, true).unwrap();
        assert_eq!(vcs.current_branch().unwrap(), Some(a));
    }

    #[test]
    fn delete_without_force_respects_unmerged() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = chain_fixture(&dir);
        let c = branch("c");

        vcs.mark_unmerged(&c);
        let err = delete_branch(&mut store, &vcs, &quiet_ctx(), &c, false).unwrap_err();
        assert!(matches!(err, EngineError::Git(_)));
        // Record survives the refused deletion.
        assert!(store.contains(&c));
    }

    #[test]
    fn lifecycle_guards_trunk() {
        let dir = TempDir::new().unwrap();
        let (mut store, vcs) = chain_fixture(&dir);
        let main = branch("main");
        let ctx = quiet_ctx();

        assert!(matches!(
            untrack_branch(&mut store, &ctx, &main),
            Err(EngineError::TrunkNotTracked(_))
        ));
        assert!(matches!(
            delete_branch(&mut store, &vcs, &ctx, &main, true),
            Err(EngineError::TrunkNotTracked(_))
        ));
    }
}
