//! Run plan schema.
//!
//! A run plan lists phases to execute in order, each with a command and
//! static data fields to attach to the resulting phase record.
//!
//! ```yaml
//! name: nightly
//! output: timings.json
//! phases:
//!   - id: build
//!     command: cargo build --release
//!     fields:
//!       profile: release
//!   - id: test
//!     command: [cargo, test]
//! ```

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A sequence of commands, each timed as one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunPlan {
    /// Human-readable plan name.
    #[serde(default)]
    pub name: Option<String>,

    /// Where to write the resulting registry (JSON).
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Abort remaining phases after the first failed command.
    #[serde(default = "default_true")]
    pub stop_on_failure: bool,

    /// Environment variables set for every command.
    #[serde(default)]
    pub env: IndexMap<String, String>,

    /// Phases, executed in order.
    #[serde(default)]
    pub phases: Vec<PlannedPhase>,
}

const fn default_true() -> bool {
    true
}

/// One phase of a run plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannedPhase {
    /// Phase id.
    pub id: String,

    /// Command to run while the phase is open.
    pub command: CommandSpec,

    /// Static data attached to the phase before it starts.
    #[serde(default)]
    pub fields: IndexMap<String, Value>,

    /// Extra environment variables for this command.
    #[serde(default)]
    pub env: IndexMap<String, String>,

    /// Working directory for this command.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

/// A command, either as a shell-style line or as an argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// `"cargo build --release"`, split with shell quoting rules.
    Line(String),
    /// `["cargo", "build", "--release"]`.
    Argv(Vec<String>),
}

impl CommandSpec {
    /// Splits the command into program and arguments.
    ///
    /// Returns `None` for an empty command or unbalanced quoting.
    #[must_use]
    pub fn argv(&self) -> Option<Vec<String>> {
        let argv = match self {
            Self::Line(line) => shlex::split(line)?,
            Self::Argv(argv) => argv.clone(),
        };
        if argv.first().is_none_or(|program| program.trim().is_empty()) {
            return None;
        }
        Some(argv)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(line) => f.write_str(line),
            Self::Argv(argv) => match shlex::try_join(argv.iter().map(String::as_str)) {
                Ok(joined) => f.write_str(&joined),
                Err(_) => f.write_str(&argv.join(" ")),
            },
        }
    }
}
