mod common;

use common::RecordingObserver;
use indexmap::IndexMap;
use phaselog::{OrderedRecord, PhaseError, PhaseId, PhaseRegistry, PhaseTimer};
use serde_json::{Value, json};

fn two_phase_registry(observer: &std::sync::Arc<RecordingObserver>) -> PhaseRegistry {
    let mut registry = PhaseRegistry::new();

    let compile = registry.add_new("compile", true, Some(observer.clone()));
    compile.set("files", 120).unwrap();
    compile.set("warnings", json!(["unused import"])).unwrap();
    compile.stop(false).unwrap();

    let link = registry.add_new("link", true, Some(observer.clone()));
    link.set("target", "x86_64").unwrap();

    registry
}

#[test]
fn ordered_map_round_trip_is_silent() {
    let observer = RecordingObserver::new();
    let registry = two_phase_registry(&observer);
    let seen = observer.count();

    let map = registry.to_ordered_map();
    let keys: Vec<&str> = map.keys().map(PhaseId::as_str).collect();
    assert_eq!(keys, ["compile", "link"]);

    let record_keys: Vec<&str> = map["compile"].keys().collect();
    assert_eq!(
        record_keys,
        ["id", "start_time", "end_time", "elapsed_seconds", "files", "warnings"]
    );

    let restored = PhaseRegistry::from_ordered_map(map).unwrap();
    assert_eq!(restored, registry);
    assert!(restored.phases().all(|p| p.observer().is_none()));
    assert_eq!(observer.count(), seen);
}

#[test]
fn json_text_round_trip() {
    let observer = RecordingObserver::new();
    let registry = two_phase_registry(&observer);
    let seen = observer.count();

    let text = serde_json::to_string_pretty(&registry).unwrap();
    let restored: PhaseRegistry = serde_json::from_str(&text).unwrap();

    assert_eq!(restored, registry);
    assert!(restored.get("link").unwrap().end_time().is_none());
    assert_eq!(observer.count(), seen);

    // the JSON keeps registration order
    let compile_at = text.find("\"compile\"").unwrap();
    let link_at = text.find("\"link\"").unwrap();
    assert!(compile_at < link_at);
}

#[test]
fn reordered_registry_is_not_equal() {
    let observer = RecordingObserver::new();
    let registry = two_phase_registry(&observer);

    let mut reversed: Vec<(PhaseId, OrderedRecord)> = registry.to_ordered_map().into_iter().collect();
    reversed.reverse();
    let reversed = PhaseRegistry::from_ordered_map(reversed).unwrap();

    assert_ne!(reversed, registry);
}

#[test]
fn single_phase_record_round_trip() {
    let mut phase = PhaseTimer::new("solo").started();
    phase.set("attempt", 1).unwrap();
    phase.stop(false).unwrap();

    let restored = PhaseTimer::from_record(phase.to_record()).unwrap();
    assert_eq!(restored, phase);
    assert_eq!(restored.start_time(), phase.start_time());
    assert_eq!(restored.elapsed_seconds(), phase.elapsed_seconds());
}

#[test]
fn missing_id_is_taken_from_key() {
    let mut map = IndexMap::new();
    map.insert(
        PhaseId::from("fetch"),
        OrderedRecord::from_pairs([("bytes", json!(512))]),
    );

    let registry = PhaseRegistry::from_ordered_map(map).unwrap();
    let fetch = registry.get("fetch").unwrap();
    assert_eq!(fetch.id().as_str(), "fetch");
    assert!(!fetch.is_started());
    assert_eq!(*fetch.get("bytes").unwrap(), json!(512));
}

#[test]
fn mismatched_id_is_rejected() {
    let mut map = IndexMap::new();
    map.insert(
        PhaseId::from("fetch"),
        OrderedRecord::from_pairs([("id", Value::from("store"))]),
    );

    let err = PhaseRegistry::from_ordered_map(map).unwrap_err();
    assert!(matches!(err, PhaseError::IdMismatch { .. }));
}

#[test]
fn numeric_ids_match_their_keys() {
    let text = r#"{"7": {"id": 7, "start_time": "2024-05-01T10:00:00Z"}}"#;
    let registry: PhaseRegistry = serde_json::from_str(text).unwrap();
    assert_eq!(registry.get("7").unwrap().id().as_str(), "7");
}

#[test]
fn malformed_records_are_rejected() {
    let cases = [
        r#"{"a": {"id": "a", "end_time": "2024-05-01T10:00:00Z"}}"#,
        r#"{"a": {"id": "a", "start_time": "yesterday"}}"#,
        r#"{"a": {"id": "a", "start_time": "2024-05-01T10:00:00Z", "elapsed_seconds": 3.0}}"#,
    ];
    for text in cases {
        assert!(
            serde_json::from_str::<PhaseRegistry>(text).is_err(),
            "accepted {text}"
        );
    }
}
