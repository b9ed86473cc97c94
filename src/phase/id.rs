//! Phase identifiers.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, caller-supplied phase identifier.
///
/// Used as the registry key, so it borrows as `str` for lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseId(String);

impl PhaseId {
    /// Creates a new `PhaseId`.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for PhaseId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PhaseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for PhaseId {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl Borrow<str> for PhaseId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PhaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_raw_string() {
        assert_eq!(PhaseId::new("load data").to_string(), "load data");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = PhaseId::from("first");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""first""#);
        let back: PhaseId = serde_json::from_str(r#""first""#).unwrap();
        assert_eq!(back, id);
    }
}
