//! `tracing` subscriber setup for the `phaselog` binary.
//!
//! Logs always go to stderr so that registry JSON printed on stdout stays
//! machine-readable.

use std::io::{self, IsTerminal};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable holding filter directives that replace `-v`.
pub const LOG_LEVEL_ENV: &str = "PHASELOG_LOG_LEVEL";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Plain text, colored when stderr is a terminal.
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Level used when `PHASELOG_LOG_LEVEL` is unset. Each `-v` lowers the
/// threshold by one step, from `warn` down to `trace`.
#[must_use]
pub const fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn env_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .with_env_var(LOG_LEVEL_ENV)
        .from_env_lossy()
}

/// Whether ANSI colors should be written to stderr.
fn wants_ansi(color: ColorChoice, stderr_is_tty: bool, no_color: bool) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => stderr_is_tty && !no_color,
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = env_filter(verbosity);
    // module paths only help once phase transitions are logged
    let with_target = verbosity >= 2;

    let installed = match format {
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(wants_ansi(
                color,
                io::stderr().is_terminal(),
                std::env::var_os("NO_COLOR").is_some(),
            ))
            .with_target(with_target)
            .with_writer(io::stderr)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(with_target)
            .with_current_span(false)
            .with_writer(io::stderr)
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_steps_down_with_verbosity() {
        let levels: Vec<_> = (0..=4).map(level_for).collect();
        assert_eq!(
            levels,
            [
                LevelFilter::WARN,
                LevelFilter::INFO,
                LevelFilter::DEBUG,
                LevelFilter::TRACE,
                LevelFilter::TRACE
            ]
        );
        assert_eq!(level_for(u8::MAX), LevelFilter::TRACE);
    }

    #[test]
    fn test_ansi_resolution() {
        assert!(wants_ansi(ColorChoice::Always, false, true));
        assert!(!wants_ansi(ColorChoice::Never, true, false));
        assert!(wants_ansi(ColorChoice::Auto, true, false));
        assert!(!wants_ansi(ColorChoice::Auto, true, true));
        assert!(!wants_ansi(ColorChoice::Auto, false, false));
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_logging(LogFormat::Json, 3, ColorChoice::Never);
        init_logging(LogFormat::Human, 0, ColorChoice::Auto);
    }
}
