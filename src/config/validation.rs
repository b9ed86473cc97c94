//! Run plan validation.
//!
//! Collects every issue in one pass instead of stopping at the first, so a
//! user sees all problems of a plan at once.

use std::collections::HashSet;

use crate::config::schema::RunPlan;
use crate::error::{Severity, ValidationIssue};
use crate::phase::is_reserved;

/// Field names the `run` command fills in after each command.
pub const RUN_FIELDS: [&str; 4] = ["command", "exit_code", "success", "error"];

/// Outcome of validating a plan.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Issues that make the plan unusable.
    pub errors: Vec<ValidationIssue>,
    /// Issues reported but tolerated.
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Whether the plan can be used.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: String, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path,
            message: message.into(),
            severity: Severity::Error,
        });
    }

    fn warning(&mut self, path: String, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path,
            message: message.into(),
            severity: Severity::Warning,
        });
    }
}

/// Run plan validator.
#[derive(Debug, Default)]
pub struct Validator;

impl Validator {
    /// Creates a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates `plan`.
    #[must_use]
    pub fn validate(&self, plan: &RunPlan) -> ValidationResult {
        let mut result = ValidationResult::default();

        if plan.phases.is_empty() {
            result.error("phases".to_owned(), "plan has no phases");
        }

        let mut seen = HashSet::new();
        for (i, phase) in plan.phases.iter().enumerate() {
            let at = |field: &str| format!("phases[{i}].{field}");

            if phase.id.trim().is_empty() {
                result.error(at("id"), "phase id is empty");
            } else if !seen.insert(phase.id.as_str()) {
                result.warning(
                    at("id"),
                    format!("duplicate phase id '{}' replaces the earlier phase", phase.id),
                );
            }

            if phase.command.argv().is_none() {
                result.error(at("command"), "command is empty or has unbalanced quotes");
            }

            for key in phase.fields.keys() {
                if is_reserved(key) {
                    result.error(
                        at(&format!("fields.{key}")),
                        format!("'{key}' is reserved for phase timing"),
                    );
                } else if RUN_FIELDS.contains(&key.as_str()) {
                    result.warning(
                        at(&format!("fields.{key}")),
                        format!("'{key}' is overwritten with the command result"),
                    );
                }
            }

            if let Some(cwd) = &phase.cwd {
                if cwd.as_os_str().is_empty() {
                    result.error(at("cwd"), "working directory is empty");
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(yaml: &str) -> RunPlan {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_plan() {
        let result = Validator::new().validate(&plan(
            "phases:\n  - id: a\n    command: make\n  - id: b\n    command: [make, test]\n",
        ));
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_empty_plan() {
        let result = Validator::new().validate(&plan("name: nothing\n"));
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].path, "phases");
    }

    #[test]
    fn test_empty_id_and_command() {
        let result = Validator::new().validate(&plan(
            "phases:\n  - id: ''\n    command: ''\n",
        ));
        let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["phases[0].id", "phases[0].command"]);
    }

    #[test]
    fn test_duplicate_id_is_warning() {
        let result = Validator::new().validate(&plan(
            "phases:\n  - id: a\n    command: make\n  - id: a\n    command: make\n",
        ));
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, "phases[1].id");
    }

    #[test]
    fn test_reserved_field_is_error() {
        let result = Validator::new().validate(&plan(
            "phases:\n  - id: a\n    command: make\n    fields:\n      start_time: now\n      exit_code: 0\n",
        ));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "phases[0].fields.start_time");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, "phases[0].fields.exit_code");
    }
}
