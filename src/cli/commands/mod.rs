//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod run;
pub mod show;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::PhaselogError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub fn dispatch(cli: Cli) -> Result<(), PhaselogError> {
    match cli.command {
        Commands::Run(args) => run::run(&args),
        Commands::Show(args) => show::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
