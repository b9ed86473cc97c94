//! Ordered key/value records.
//!
//! [`OrderedRecord`] is the storage behind every phase: a string-keyed map
//! whose iteration order is the order in which keys were first inserted.
//! Field-style access (`set`/`get`/`delete`) and map-style access
//! (`items`, `IntoIterator`, serde) operate on the same `IndexMap`, so the
//! two views can never diverge.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RecordError;

/// Ordered, dynamically extensible string-keyed record.
///
/// Equality compares contents only: two records holding the same keys with
/// equal values are equal whatever order the keys were inserted in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedRecord {
    fields: IndexMap<String, Value>,
}

/// Initial contents for [`OrderedRecord::from_seed`].
///
/// At most one of `pairs` and `mapping` may be provided.
#[derive(Debug, Clone, Default)]
pub struct RecordSeed {
    /// Ordered sequence of key/value pairs.
    pub pairs: Option<Vec<(String, Value)>>,
    /// Ordered mapping of keys to values.
    pub mapping: Option<IndexMap<String, Value>>,
}

impl RecordSeed {
    /// Seed from an ordered sequence of pairs.
    #[must_use]
    pub fn pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            pairs: Some(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            mapping: None,
        }
    }

    /// Seed from an ordered mapping.
    #[must_use]
    pub fn mapping(mapping: IndexMap<String, Value>) -> Self {
        Self {
            pairs: None,
            mapping: Some(mapping),
        }
    }
}

impl OrderedRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record from ordered pairs. A key repeated later in the
    /// sequence overwrites the earlier value but keeps the earlier position.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        pairs.into_iter().collect()
    }

    /// Creates a record from a seed.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::AmbiguousInitialization`] when the seed carries
    /// both pairs and a mapping.
    pub fn from_seed(seed: RecordSeed) -> Result<Self, RecordError> {
        match (seed.pairs, seed.mapping) {
            (Some(_), Some(_)) => Err(RecordError::AmbiguousInitialization),
            (Some(pairs), None) => Ok(Self::from_pairs(pairs)),
            (None, Some(mapping)) => Ok(Self::from(mapping)),
            (None, None) => Ok(Self::new()),
        }
    }

    /// Inserts or overwrites `key`.
    ///
    /// New keys are appended; existing keys keep their position. Returns the
    /// previous value, if any.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Returns the current value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::UnknownField`] if `key` was never set.
    pub fn get(&self, key: &str) -> Result<&Value, RecordError> {
        self.fields
            .get(key)
            .ok_or_else(|| RecordError::unknown(key))
    }

    /// Returns a mutable reference to the value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::UnknownField`] if `key` was never set.
    pub fn get_mut(&mut self, key: &str) -> Result<&mut Value, RecordError> {
        self.fields
            .get_mut(key)
            .ok_or_else(|| RecordError::unknown(key))
    }

    /// Removes `key`, preserving the relative order of the remaining keys.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::UnknownField`] if `key` is absent.
    pub fn delete(&mut self, key: &str) -> Result<Value, RecordError> {
        self.fields
            .shift_remove(key)
            .ok_or_else(|| RecordError::unknown(key))
    }

    /// Whether `key` is currently set.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Ordered `(key, value)` pairs. Does not consume the record.
    pub fn items(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Borrows the underlying ordered map.
    #[must_use]
    pub const fn as_map(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    /// Consumes the record, returning the underlying ordered map.
    #[must_use]
    pub fn into_map(self) -> IndexMap<String, Value> {
        self.fields
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for OrderedRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        record.extend(iter);
        record
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for OrderedRecord {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl From<IndexMap<String, Value>> for OrderedRecord {
    fn from(fields: IndexMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl<'a> IntoIterator for &'a OrderedRecord {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl IntoIterator for OrderedRecord {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl fmt::Display for OrderedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, self.items())
    }
}

/// Renders `{"key": value, ...}` with keys and values as compact JSON.
pub(crate) fn write_fields<'a>(
    f: &mut fmt::Formatter<'_>,
    fields: impl Iterator<Item = (&'a str, &'a Value)>,
) -> fmt::Result {
    f.write_str("{")?;
    for (i, (key, value)) in fields.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {value}", Value::from(key))?;
    }
    f.write_str("}")
}
