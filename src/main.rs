//! arbor binary entry point.

use arbor::engine::EngineError;
use arbor::ui::output;

/// Exit codes: 0 success, 1 error, 2 conflict awaiting user action.
fn main() {
    let code = match arbor::cli::run() {
        Ok(()) => 0,
        Err(err) => {
            output::error(format!("{err:#}"));
            match err.downcast_ref::<EngineError>() {
                Some(e) if e.is_conflict() => 2,
                _ => 1,
            }
        }
    };
    std::process::exit(code);
}
