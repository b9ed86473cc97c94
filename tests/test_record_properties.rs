//! Property tests for ordered record semantics.

use phaselog::OrderedRecord;
use proptest::prelude::*;
use serde_json::Value;

#[derive(Debug, Clone)]
enum Op {
    Set(String, i64),
    Delete(String),
}

fn key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]).prop_map(str::to_owned)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (key(), any::<i64>()).prop_map(|(k, v)| Op::Set(k, v)),
        1 => key().prop_map(Op::Delete),
    ]
}

/// Applies `ops` and returns the expected key order: a key joins the end
/// when first set after being absent and leaves when deleted.
fn apply(ops: &[Op]) -> (OrderedRecord, Vec<String>) {
    let mut record = OrderedRecord::new();
    let mut order: Vec<String> = Vec::new();
    for op in ops {
        match op {
            Op::Set(k, v) => {
                record.set(k.clone(), *v);
                if !order.contains(k) {
                    order.push(k.clone());
                }
            }
            Op::Delete(k) => {
                let removed = record.delete(k);
                assert_eq!(removed.is_ok(), order.contains(k));
                order.retain(|o| o != k);
            }
        }
    }
    (record, order)
}

proptest! {
    /// `keys()` follows first-insertion order of surviving keys.
    #[test]
    fn keys_follow_first_insertion(ops in prop::collection::vec(op(), 0..40)) {
        let (record, order) = apply(&ops);
        let keys: Vec<&str> = record.keys().collect();
        prop_assert_eq!(keys, order.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert_eq!(record.len(), order.len());
    }

    /// Overwriting an existing key keeps its position and updates the value.
    #[test]
    fn reset_never_moves_key(
        ops in prop::collection::vec(op(), 1..40),
        value in any::<i64>(),
    ) {
        let (mut record, order) = apply(&ops);
        prop_assume!(!order.is_empty());
        let target = order[order.len() / 2].clone();

        record.set(target.clone(), value);

        let keys: Vec<&str> = record.keys().collect();
        prop_assert_eq!(keys, order.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert_eq!(record.get(&target).unwrap(), &Value::from(value));
    }

    /// Equality compares content only.
    #[test]
    fn equality_ignores_order(pairs in prop::collection::btree_map(key(), any::<i64>(), 0..6)) {
        let forward: OrderedRecord = pairs.iter().map(|(k, v)| (k.clone(), Value::from(*v))).collect();
        let backward: OrderedRecord = pairs.iter().rev().map(|(k, v)| (k.clone(), Value::from(*v))).collect();
        prop_assert_eq!(&forward, &backward);

        let text = serde_json::to_string(&backward).unwrap();
        let parsed: OrderedRecord = serde_json::from_str(&text).unwrap();
        let parsed_keys: Vec<&str> = parsed.keys().collect();
        let backward_keys: Vec<&str> = backward.keys().collect();
        prop_assert_eq!(parsed_keys, backward_keys);
    }
}
