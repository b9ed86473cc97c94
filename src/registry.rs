//! Ordered phase registry.
//!
//! [`PhaseRegistry`] keeps phases in registration order, keyed by
//! [`PhaseId`]. Registering an id that is already present replaces the
//! stored phase in place; new ids are appended.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::error::PhaseError;
use crate::observability::PhaseObserver;
use crate::phase::{ID_FIELD, PhaseId, PhaseTimer};
use crate::record::OrderedRecord;

/// Ordered collection of phases keyed by id.
///
/// Two registries are equal when they hold equal phases in the same order.
#[derive(Debug, Clone, Default)]
pub struct PhaseRegistry {
    phases: IndexMap<PhaseId, PhaseTimer>,
}

impl PhaseRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a phase, optionally starts it, registers it and returns it.
    pub fn add_new(
        &mut self,
        id: impl Into<PhaseId>,
        start: bool,
        observer: Option<Arc<dyn PhaseObserver>>,
    ) -> &mut PhaseTimer {
        let mut phase = PhaseTimer::new(id);
        phase.set_observer(observer);
        if start {
            phase = phase.started();
        }
        self.insert(phase)
    }

    /// Registers an existing phase and returns it.
    ///
    /// When `stop` is set and the phase is running, it is stopped first.
    /// Phases that were never started, or are already stopped, are stored
    /// untouched.
    ///
    /// # Errors
    ///
    /// Propagates a failed stop; the registry is left unchanged in that case.
    pub fn add_existing(
        &mut self,
        mut phase: PhaseTimer,
        stop: bool,
    ) -> Result<&mut PhaseTimer, PhaseError> {
        if stop && phase.is_started() && !phase.is_stopped() {
            phase.stop(false)?;
        }
        Ok(self.insert(phase))
    }

    /// Applies [`add_existing`](Self::add_existing) to each phase in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing phase; phases before it stay registered.
    pub fn add_existing_many(
        &mut self,
        phases: impl IntoIterator<Item = PhaseTimer>,
        stop: bool,
    ) -> Result<(), PhaseError> {
        for phase in phases {
            self.add_existing(phase, stop)?;
        }
        Ok(())
    }

    fn insert(&mut self, phase: PhaseTimer) -> &mut PhaseTimer {
        let id = phase.id().clone();
        let (index, previous) = self.phases.insert_full(id, phase);
        if previous.is_some() {
            debug!(phase = %self.phases[index].id(), "replaced registered phase");
        }
        &mut self.phases[index]
    }

    /// Looks up a phase by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PhaseTimer> {
        self.phases.get(id)
    }

    /// Looks up a phase by id for modification.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut PhaseTimer> {
        self.phases.get_mut(id)
    }

    /// Whether a phase with this id is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.phases.contains_key(id)
    }

    /// Number of registered phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Whether no phase is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Phases with their ids, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&PhaseId, &PhaseTimer)> + '_ {
        self.phases.iter()
    }

    /// Ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &PhaseId> + '_ {
        self.phases.keys()
    }

    /// Phases in registration order.
    pub fn phases(&self) -> impl Iterator<Item = &PhaseTimer> + '_ {
        self.phases.values()
    }

    /// Sum of the elapsed time of all stopped phases, saturating at
    /// [`Duration::MAX`].
    #[must_use]
    pub fn total_elapsed(&self) -> Duration {
        self.phases
            .values()
            .filter_map(PhaseTimer::elapsed)
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Flattens every phase into an ordered record, keyed by id.
    #[must_use]
    pub fn to_ordered_map(&self) -> IndexMap<PhaseId, OrderedRecord> {
        self.phases
            .iter()
            .map(|(id, phase)| (id.clone(), phase.to_record()))
            .collect()
    }

    /// Rebuilds a registry from [`to_ordered_map`](Self::to_ordered_map)
    /// output. A record without an `id` takes its key as id. Observers are
    /// neither attached nor notified.
    ///
    /// # Errors
    ///
    /// - [`PhaseError::IdMismatch`] when a record's `id` differs from its key
    /// - any error from [`PhaseTimer::from_record`]
    pub fn from_ordered_map(
        map: impl IntoIterator<Item = (PhaseId, OrderedRecord)>,
    ) -> Result<Self, PhaseError> {
        let mut registry = Self::new();
        for (key, mut record) in map {
            match record.get(ID_FIELD) {
                Err(_) | Ok(Value::Null) => {
                    record.set(ID_FIELD, key.as_str());
                }
                Ok(id) => {
                    let id = id.as_str().map_or_else(|| id.to_string(), str::to_owned);
                    if id != key.as_str() {
                        return Err(PhaseError::IdMismatch {
                            key: key.to_string(),
                            id,
                        });
                    }
                }
            }
            registry.insert(PhaseTimer::from_record(record)?);
        }
        Ok(registry)
    }
}

impl PartialEq for PhaseRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.phases.iter().eq(other.phases.iter())
    }
}

impl<'a> IntoIterator for &'a PhaseRegistry {
    type Item = (&'a PhaseId, &'a PhaseTimer);
    type IntoIter = indexmap::map::Iter<'a, PhaseId, PhaseTimer>;

    fn into_iter(self) -> Self::IntoIter {
        self.phases.iter()
    }
}

impl fmt::Display for PhaseRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PhaseRegistry - [")?;
        for (i, phase) in self.phases.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{phase}")?;
        }
        f.write_str("]")
    }
}

impl Serialize for PhaseRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.phases.len()))?;
        for (id, phase) in &self.phases {
            map.serialize_entry(id, phase)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PhaseRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = IndexMap::<PhaseId, OrderedRecord>::deserialize(deserializer)?;
        Self::from_ordered_map(map).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::timer::Timing;
    use serde_json::json;

    #[test]
    fn test_add_new_starts_by_default() {
        let mut registry = PhaseRegistry::new();
        let phase = registry.add_new("first", true, None);
        assert!(phase.is_started());
        assert!(!phase.is_stopped());

        let phase = registry.add_new("second", false, None);
        assert!(!phase.is_started());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registration_order() {
        let mut registry = PhaseRegistry::new();
        for id in ["c", "a", "b"] {
            registry.add_new(id, false, None);
        }
        let ids: Vec<_> = registry.ids().map(PhaseId::as_str).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_same_id_replaces_in_place() {
        let mut registry = PhaseRegistry::new();
        registry.add_new("a", false, None).set("v", 1).unwrap();
        registry.add_new("b", false, None);
        registry.add_new("a", false, None).set("v", 2).unwrap();

        let ids: Vec<_> = registry.ids().map(PhaseId::as_str).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(registry.get("a").unwrap().get("v").unwrap().as_ref(), &json!(2));
    }

    #[test]
    fn test_add_existing_stops_running_phase() {
        let mut registry = PhaseRegistry::new();
        let phase = PhaseTimer::new("p").started();
        let stored = registry.add_existing(phase, true).unwrap();
        assert!(stored.is_stopped());
    }

    #[test]
    fn test_add_existing_without_stop_keeps_running() {
        let mut registry = PhaseRegistry::new();
        let stored = registry
            .add_existing(PhaseTimer::new("p").started(), false)
            .unwrap();
        assert!(!stored.is_stopped());
    }

    #[test]
    fn test_add_existing_leaves_stopped_phase_alone() {
        let mut phase = PhaseTimer::new("p").started();
        phase.stop(false).unwrap();
        let before = phase.clone();

        let mut registry = PhaseRegistry::new();
        let stored = registry.add_existing(phase, true).unwrap();
        assert_eq!(*stored, before);
    }

    #[test]
    fn test_lookup() {
        let mut registry = PhaseRegistry::new();
        registry.add_new("x", false, None);
        assert!(registry.contains("x"));
        assert!(!registry.contains("y"));
        registry.get_mut("x").unwrap().set("k", "v").unwrap();
        assert_eq!(registry.get("x").unwrap().data().len(), 1);
        assert!(registry.get("y").is_none());
    }

    #[test]
    fn test_total_elapsed_ignores_running() {
        let mut registry = PhaseRegistry::new();
        registry.add_new("running", true, None);
        assert_eq!(registry.total_elapsed(), Duration::ZERO);
        registry.get_mut("running").unwrap().stop(false).unwrap();
        assert_eq!(
            registry.total_elapsed(),
            registry.get("running").unwrap().elapsed().unwrap()
        );
    }

    #[test]
    fn test_total_elapsed_saturates() {
        let huge = Timing {
            elapsed_seconds: Some(1.0e19),
            ..Timing::default()
        };
        let mut registry = PhaseRegistry::new();
        for id in ["a", "b"] {
            registry.insert(PhaseTimer::from_parts(
                PhaseId::new(id),
                OrderedRecord::new(),
                huge,
            ));
        }
        assert_eq!(registry.total_elapsed(), Duration::MAX);
    }

    #[test]
    fn test_inconsistent_elapsed_is_rejected() {
        let text = r#"{
            "a": {"id": "a", "start_time": "2024-01-01T00:00:00Z",
                  "end_time": "2024-01-01T00:00:01Z", "elapsed_seconds": 1.0e19},
            "b": {"id": "b", "start_time": "2024-01-01T00:00:00Z",
                  "end_time": "2024-01-01T00:00:01Z", "elapsed_seconds": 1.0e19}
        }"#;
        let err = serde_json::from_str::<PhaseRegistry>(text).unwrap_err();
        assert!(err.to_string().contains("elapsed_seconds"));
    }

    #[test]
    fn test_display_lists_phases() {
        let mut registry = PhaseRegistry::new();
        registry.add_new("first", false, None).set("hello", "world").unwrap();
        registry.add_new("second", false, None).set("foo", "bar").unwrap();
        let first = registry.get("first").unwrap().to_string();
        let second = registry.get("second").unwrap().to_string();
        assert_eq!(
            registry.to_string(),
            format!("PhaseRegistry - [{first}, {second}]")
        );
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let mut ab = PhaseRegistry::new();
        ab.add_new("a", false, None);
        ab.add_new("b", false, None);
        let mut ba = PhaseRegistry::new();
        ba.add_new("b", false, None);
        ba.add_new("a", false, None);
        assert_ne!(ab, ba);
        assert_eq!(ab, ab.clone());
    }

    #[test]
    fn test_from_ordered_map_fills_missing_id() {
        let mut map = IndexMap::new();
        map.insert(PhaseId::new("load"), OrderedRecord::from_pairs([("rows", 3)]));
        let registry = PhaseRegistry::from_ordered_map(map).unwrap();
        assert_eq!(registry.get("load").unwrap().id().as_str(), "load");
    }

    #[test]
    fn test_from_ordered_map_rejects_mismatched_id() {
        let mut map = IndexMap::new();
        map.insert(
            PhaseId::new("load"),
            OrderedRecord::from_pairs([("id", "save")]),
        );
        assert_eq!(
            PhaseRegistry::from_ordered_map(map),
            Err(PhaseError::IdMismatch {
                key: "load".to_owned(),
                id: "save".to_owned()
            })
        );
    }
}
