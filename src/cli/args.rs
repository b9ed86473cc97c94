//! CLI argument definitions.
//!
//! All Clap derive structs for `phaselog` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Time named phases of a job and record them as ordered JSON.
#[derive(Parser, Debug)]
#[command(name = "phaselog", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "PHASELOG_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "PHASELOG_LOG_FORMAT"
    )]
    pub log_format: LogFormat,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a run plan, timing each command as a phase.
    Run(RunArgs),

    /// Print a recorded phase registry.
    Show(ShowArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the YAML run plan.
    #[arg(env = "PHASELOG_PLAN")]
    pub plan: PathBuf,

    /// Where to write the phase registry as JSON (overrides the plan's `output`).
    #[arg(short, long, env = "PHASELOG_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Write JSONL phase events to this file (`-` for stdout).
    #[arg(long, env = "PHASELOG_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Write a Prometheus text snapshot of phase metrics to this file.
    #[arg(long, env = "PHASELOG_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,

    /// Keep running remaining phases after a command fails.
    #[arg(long)]
    pub keep_going: bool,
}

/// Arguments for `show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Path to a registry JSON file written by `run`.
    pub file: PathBuf,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================
