//! `show` command.

use std::fmt::Write as _;
use std::time::Duration;

use crate::cli::args::{OutputFormat, ShowArgs};
use crate::error::PhaselogError;
use crate::phase::PhaseTimer;
use crate::registry::PhaseRegistry;

/// Prints a registry file written by `run`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold a valid
/// registry.
pub fn run(args: &ShowArgs) -> Result<(), PhaselogError> {
    let text = std::fs::read_to_string(&args.file)?;
    let registry: PhaseRegistry = serde_json::from_str(&text)?;

    match args.format {
        OutputFormat::Human => print!("{}", render_table(&registry)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&registry)?),
    }
    Ok(())
}

/// Renders one line per phase in registry order, then a total.
#[must_use]
pub fn render_table(registry: &PhaseRegistry) -> String {
    let width = registry
        .ids()
        .map(|id| id.as_str().len())
        .chain(["PHASE".len(), "total".len()])
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:<11}  {:>12}  FIELDS", "PHASE", "STATUS", "ELAPSED");
    for phase in registry.phases() {
        let elapsed = phase.elapsed().map_or_else(|| "-".to_owned(), format_elapsed);
        let _ = writeln!(
            out,
            "{:<width$}  {:<11}  {:>12}  {}",
            phase.id(),
            phase.status(),
            elapsed,
            format_fields(phase)
        );
    }
    let _ = writeln!(
        out,
        "{:<width$}  {:<11}  {:>12}",
        "total",
        "",
        format_elapsed(registry.total_elapsed())
    );
    out
}

fn format_elapsed(elapsed: Duration) -> String {
    let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    if millis == 0 {
        return "0ms".to_owned();
    }
    humantime::format_duration(Duration::from_millis(millis)).to_string()
}

fn format_fields(phase: &PhaseTimer) -> String {
    phase
        .data()
        .items()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}
