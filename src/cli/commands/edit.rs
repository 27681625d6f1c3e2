//! edit command - reorder the downstack in an editor

use anyhow::{Context as _, Result};

use crate::cli::commands::{named_or_current, open_repo};
use crate::core::config::Config;
use crate::engine::bootstrap::ensure_store;
use crate::engine::edit::{edit_downstack, CommandEditor, EditOutcome};
use crate::engine::Context;
use crate::ui::output;

/// Open the downstack of a branch in an editor and apply the new order.
///
/// Editor selection: `--editor`, then config, then `$VISUAL`, `$EDITOR`,
/// and finally `vi`.
pub fn edit(ctx: &Context, branch: Option<&str>, editor: Option<&str>) -> Result<()> {
    let git = open_repo(ctx)?;
    let config = Config::load(Some(&git.common_dir())).context("failed to load configuration")?;
    let mut store = ensure_store(&git.common_dir(), &git, &config)?;

    let leaf = named_or_current(&git, branch)?;
    let editor_cmd = editor
        .map(String::from)
        .or_else(|| config.editor().map(String::from))
        .or_else(|| std::env::var("VISUAL").ok())
        .or_else(|| std::env::var("EDITOR").ok())
        .unwrap_or_else(|| "vi".to_string());
    let editor = CommandEditor::new(editor_cmd);

    match edit_downstack(&mut store, &git, ctx, &leaf, &editor)? {
        EditOutcome::Applied { order } => {
            output::print(
                format!("reordered {} branches; now on {}", order.len(), order[0]),
                ctx.verbosity(),
            );
        }
        EditOutcome::NothingToEdit | EditOutcome::Aborted => {}
    }
    Ok(())
}
