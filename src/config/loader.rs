//! Run plan loader.
//!
//! Loading pipeline:
//! 1. Size check and read
//! 2. Environment variable expansion (on raw text, before parsing)
//! 3. YAML parsing into [`RunPlan`]
//! 4. Validation

use std::path::Path;

use crate::config::schema::RunPlan;
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Options for the plan loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum plan file size in bytes.
    pub max_plan_size: u64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_plan_size: env_or("PHASELOG_MAX_PLAN_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a plan.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated plan.
    pub plan: RunPlan,

    /// Warnings encountered during loading and validation.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during plan loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Run plan loader.
#[derive(Debug, Default)]
pub struct PlanLoader {
    options: LoaderOptions,
}

impl PlanLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads and validates the plan at `path`, expanding variables from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file is missing or exceeds the size limit
    /// - A `${VAR:?message}` reference is unset
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        self.load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Like [`load`](Self::load) but resolves variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_with_env<F>(&self, path: &Path, lookup: F) -> Result<LoadResult, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        if metadata.len() > self.options.max_plan_size {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.options.max_plan_size,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

        Self::parse_str(raw, path, lookup)
    }

    /// Expands, parses and validates plan text. `path` is only used in
    /// error messages.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus file access.
    pub fn parse_str<F>(
        raw: &str,
        path: &Path,
        lookup: F,
    ) -> Result<LoadResult, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_sub = EnvSubstitution::new(lookup);
        let substituted = env_sub.substitute(raw, path)?;
        let mut warnings = env_sub.warnings;

        let plan: RunPlan =
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        let validation = Validator::new().validate(&plan);
        if !validation.is_valid() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: validation.errors,
            });
        }
        warnings.extend(validation.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        for warning in &warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or(""),
                "{}",
                warning.message
            );
        }
        tracing::debug!(path = %path.display(), phases = plan.phases.len(), "plan loaded");

        Ok(LoadResult { plan, warnings })
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution on raw YAML text.
struct EnvSubstitution<F> {
    lookup: F,
    warnings: Vec<LoadWarning>,
}

impl<F> EnvSubstitution<F>
where
    F: Fn(&str) -> Option<String>,
{
    const fn new(lookup: F) -> Self {
        Self {
            lookup,
            warnings: Vec::new(),
        }
    }

    /// Substitutes variables in `raw`.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset, with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw: &str, source_path: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let reference = parse_reference(&mut chars, source_path)?;
                    match (self.lookup)(&reference.name) {
                        Some(value) => result.push_str(&value),
                        None => match reference.fallback {
                            Fallback::Default(default) => result.push_str(&default),
                            Fallback::Required(message) => {
                                return Err(ConfigError::EnvVarNotSet {
                                    var: reference.name,
                                    location: message,
                                });
                            }
                            Fallback::Empty => self.warnings.push(LoadWarning {
                                message: format!(
                                    "environment variable '{}' is not set, using empty string",
                                    reference.name
                                ),
                                location: Some(source_path.display().to_string()),
                            }),
                        },
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }
}

struct Reference {
    name: String,
    fallback: Fallback,
}

enum Fallback {
    Empty,
    Default(String),
    Required(String),
}

/// Parses the inside of `${...}`; the opening brace is already consumed.
fn parse_reference(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source_path: &Path,
) -> Result<Reference, ConfigError> {
    let mut name = String::new();

    while let Some(c) = chars.next() {
        match c {
            '}' => {
                return Ok(Reference {
                    name,
                    fallback: Fallback::Empty,
                });
            }
            ':' if matches!(chars.peek(), Some('-' | '?')) => {
                let required = chars.next() == Some('?');
                let text = read_until_close(chars, source_path, &name)?;
                let fallback = if required {
                    Fallback::Required(text)
                } else {
                    Fallback::Default(text)
                };
                return Ok(Reference { name, fallback });
            }
            _ => name.push(c),
        }
    }

    Err(unclosed(source_path, &name))
}

/// Reads up to the matching `}`, keeping nested braces.
fn read_until_close(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source_path: &Path,
    name: &str,
) -> Result<String, ConfigError> {
    let mut value = String::new();
    let mut depth = 1;

    for c in chars.by_ref() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(value);
                }
            }
            _ => {}
        }
        value.push(c);
    }

    Err(unclosed(source_path, name))
}

fn unclosed(source_path: &Path, name: &str) -> ConfigError {
    ConfigError::ParseError {
        path: source_path.to_path_buf(),
        line: None,
        message: format!("unclosed environment variable reference: ${{{name}"),
    }
}

/// Parses an environment variable with a default value.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
