//! Error types for `phaselog`
//!
//! One error enum per domain (records, phases, run plans), aggregated by
//! [`PhaselogError`] which also maps each failure to a CLI exit code.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::phase::PhaseId;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `phaselog` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// Run plan error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Phase lifecycle or record error
    pub const PHASE_ERROR: i32 = 5;

    /// A planned command exited unsuccessfully
    pub const COMMAND_FAILED: i32 = 6;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `phaselog` operations.
#[derive(Debug, Error)]
pub enum PhaselogError {
    /// Record field access error
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Phase lifecycle or reconstruction error
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// Run plan loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A planned command did not succeed
    #[error("phase '{phase_id}' failed: {reason}")]
    CommandFailed {
        /// Phase whose command failed
        phase_id: PhaseId,
        /// Exit status or spawn failure description
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PhaselogError {
    /// Returns the exit code matching this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Record(_) | Self::Phase(_) | Self::Json(_) => ExitCode::PHASE_ERROR,
            Self::CommandFailed { .. } => ExitCode::COMMAND_FAILED,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Record Errors
// ============================================================================

/// Errors raised by [`OrderedRecord`](crate::record::OrderedRecord) access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// More than one initialization form was supplied to a record seed
    #[error("only one of initial pairs or initial mapping may be provided")]
    AmbiguousInitialization,

    /// The field was never set
    #[error("unknown field '{key}'")]
    UnknownField {
        /// Name of the missing field
        key: String,
    },

    /// The field name belongs to the owning phase's own state
    #[error("field '{key}' is reserved and cannot be used for phase data")]
    ReservedField {
        /// The reserved name that was written
        key: String,
    },
}

impl RecordError {
    /// Shorthand for an [`UnknownField`](Self::UnknownField) error.
    pub fn unknown(key: impl Into<String>) -> Self {
        Self::UnknownField { key: key.into() }
    }
}

// ============================================================================
// Phase Errors
// ============================================================================

/// The lifecycle command a phase rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseCommand {
    /// `start()`
    Start,
    /// `stop()`
    Stop,
}

impl fmt::Display for PhaseCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
        }
    }
}

/// Phase lifecycle and reconstruction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    /// `start()` on a phase that was already started
    #[error(
        "phase '{phase_id}' was already started; use start(force = true) to discard the first start and start it again"
    )]
    InvalidStartCommand {
        /// Phase that rejected the command
        phase_id: PhaseId,
    },

    /// `stop()` on a phase that was already stopped or never started
    #[error(
        "phase '{phase_id}' cannot be stopped (already stopped or never started); use stop(force = true) to stop it again"
    )]
    InvalidStopCommand {
        /// Phase that rejected the command
        phase_id: PhaseId,
    },

    /// A serialized phase carried no identifier
    #[error("serialized phase has no 'id' field")]
    MissingId,

    /// A serialized timing field could not be interpreted
    #[error("malformed field '{key}': {reason}")]
    MalformedField {
        /// Name of the offending field
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// A registry entry's key disagrees with the phase's own id
    #[error("registry key '{key}' does not match phase id '{id}'")]
    IdMismatch {
        /// Key the phase was stored under
        key: String,
        /// Id found in the phase record
        id: String,
    },

    /// Underlying record access failure
    #[error(transparent)]
    Record(#[from] RecordError),
}

impl PhaseError {
    /// Returns the rejected command for start/stop errors.
    #[must_use]
    pub const fn command(&self) -> Option<PhaseCommand> {
        match self {
            Self::InvalidStartCommand { .. } => Some(PhaseCommand::Start),
            Self::InvalidStopCommand { .. } => Some(PhaseCommand::Stop),
            _ => None,
        }
    }

    /// Returns the id of the phase that rejected a start/stop command.
    #[must_use]
    pub const fn phase_id(&self) -> Option<&PhaseId> {
        match self {
            Self::InvalidStartCommand { phase_id } | Self::InvalidStopCommand { phase_id } => {
                Some(phase_id)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Run Plan Errors
// ============================================================================

/// Run plan loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the plan file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Plan validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path to the plan file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Plan file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Plan file exceeds the configured size limit
    #[error("plan file {path} is {size} bytes (limit: {limit})")]
    TooLarge {
        /// Path to the plan file
        path: PathBuf,
        /// Actual size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// Environment variable referenced with `${VAR:?message}` is not set
    #[error("environment variable '{var}' not set ({location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Message attached to the reference
        location: String,
    },
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single issue found while validating a run plan.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "phases[2].command")
    pub path: String,
    /// Description of the issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the plan from being used
    Error,
    /// Reported but does not block loading
    Warning,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `phaselog` operations.
pub type Result<T> = std::result::Result<T, PhaselogError>;

// ============================================================================
// Tests
// ============================================================================
