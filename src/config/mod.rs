//! Run plan configuration.
//!
//! Loads and validates YAML run plans for the `run` command.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{LoadResult, LoadWarning, LoaderOptions, PlanLoader};
pub use schema::{CommandSpec, PlannedPhase, RunPlan};
pub use validation::{RUN_FIELDS, ValidationResult, Validator};
