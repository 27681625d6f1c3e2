//! engine::edit
//!
//! Editor-driven downstack reordering.
//!
//! # Protocol
//!
//! 1. Serialise the downstack of the chosen leaf (top of stack first)
//!    into a temporary document with an instructional footer.
//! 2. Hand the document to the editor (a trait, so tests inject a script).
//! 3. Parse the result: `#` lines and blanks are ignored, every name must
//!    come from the original chain at most once, omitted names are left
//!    unmodified, an empty document aborts the edit.
//! 4. Re-parent bottom-up: the last listed branch lands on trunk, each
//!    next one on its predecessor. Every re-parent is its own atomic step.
//! 5. Check out the new top of the chain.
//!
//! The document lives in a RAII temp file, so it is removed on every exit
//! path, including errors and editor failures.

use std::collections::HashSet;
use std::io::Write as _;
use std::path::Path;
use std::process::Command;

use crate::core::state::StateStore;
use crate::core::types::BranchName;
use crate::git::Vcs;
use crate::stack::StackService;
use crate::ui::output;

use super::onto::onto;
use super::{Context, EngineError};

/// Footer appended to the editable document.
const EDIT_FOOTER: &str = "\
# Edit the order of branches by moving lines above.
# The branch at the bottom of the list lands on trunk first;
# branches above it stack on top in the order they appear.
# Branches removed from the list are left unmodified.
#
# Save and quit to apply. Delete all lines to abort.
";

/// Launches an editor on a document and waits for it to finish.
///
/// The subprocess implementation is [`CommandEditor`]; tests substitute a
/// scripted one.
pub trait Editor {
    /// Edit the file in place.
    ///
    /// # Errors
    ///
    /// [`EngineError::EditorFailed`] when the editor exits non-zero.
    fn edit(&self, path: &Path) -> Result<(), EngineError>;
}

/// Editor run as a subprocess, e.g. `vi` or `code --wait`.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    command: String,
}

impl CommandEditor {
    /// Use the given command line (program plus whitespace-separated args).
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Editor for CommandEditor {
    fn edit(&self, path: &Path) -> Result<(), EngineError> {
        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            EngineError::Internal("empty editor command".to_string())
        })?;
        let status = Command::new(program)
            .args(parts)
            .arg(path)
            .status()
            .map_err(|e| EngineError::Internal(format!("failed to launch '{program}': {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(EngineError::EditorFailed {
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

/// Outcome of a downstack edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The new order was applied, top of stack first.
    Applied { order: Vec<BranchName> },
    /// The chain had a single branch; there was nothing to reorder.
    NothingToEdit,
    /// The user emptied the document; nothing changed.
    Aborted,
}

/// Reorder the downstack of `leaf` through the editor.
///
/// # Errors
///
/// - [`EngineError::TrunkNotTracked`] when `leaf` is the trunk
/// - [`EngineError::InvalidEdit`] for unknown or duplicated names
/// - [`EngineError::EditorFailed`] when the editor exits non-zero
/// - [`EngineError::Conflict`] when a re-parent stops on conflicts;
///   completed re-parents stay in effect
pub fn edit_downstack(
    store: &mut StateStore,
    vcs: &dyn Vcs,
    ctx: &Context,
    leaf: &BranchName,
    editor: &dyn Editor,
) -> Result<EditOutcome, EngineError> {
    let chain = StackService::new(store)?.list_downstack(leaf)?;
    debug_assert_eq!(chain.first(), Some(leaf), "downstack starts at the leaf");
    if chain.len() == 1 {
        output::print(format!("nothing to edit below {leaf}"), ctx.verbosity());
        return Ok(EditOutcome::NothingToEdit);
    }

    // Scoped document: deleted on every exit path once this drops.
    let mut file = tempfile::Builder::new()
        .prefix("arbor-edit-")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(render_edit_document(&chain).as_bytes())?;
    file.flush()?;

    editor.edit(file.path())?;

    let edited = std::fs::read_to_string(file.path())?;
    let order = parse_edit_document(&chain, &edited)?;
    if order.is_empty() {
        output::print("downstack edit aborted, nothing to do", ctx.verbosity());
        return Ok(EditOutcome::Aborted);
    }

    // Bottom-up: the branch that should sit on trunk is processed first,
    // then each next one lands on the freshly moved predecessor.
    let mut base = store.trunk().clone();
    for branch in order.iter().rev() {
        ctx.ensure_live()?;
        onto(store, vcs, ctx, branch, &base)?;
        base = branch.clone();
    }

    let new_top = order[0].clone();
    ctx.ensure_live()?;
    vcs.checkout(&new_top)?;
    Ok(EditOutcome::Applied { order })
}

/// Render the chain (top of stack first) plus the footer.
fn render_edit_document(chain: &[BranchName]) -> String {
    let mut doc = String::new();
    for branch in chain {
        doc.push_str(branch.as_str());
        doc.push('\n');
    }
    doc.push('\n');
    doc.push_str(EDIT_FOOTER);
    doc
}

/// Parse an edited document against the original chain.
///
/// Returns the listed names in document order. Every name must come from
/// `original` and appear at most once; anything else is an
/// [`EngineError::InvalidEdit`]. An empty result means the user aborted.
fn parse_edit_document(
    original: &[BranchName],
    text: &str,
) -> Result<Vec<BranchName>, EngineError> {
    let mut remaining: HashSet<&BranchName> = original.iter().collect();
    let mut order = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let name = BranchName::new(line)
            .map_err(|e| EngineError::InvalidEdit(e.to_string()))?;
        if !remaining.remove(&name) {
            return Err(EngineError::InvalidEdit(format!(
                "branch '{name}' is not in the downstack, or is duplicated"
            )));
        }
        order.push(name);
    }
    Ok(order)
}
