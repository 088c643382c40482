use proptest::prelude::*;
use serde_json::{Map, Value};

use plandag::cache::fingerprint;

fn object_from(pairs: &[(String, i64)]) -> Value {
    let map: Map<String, Value> = pairs
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(*v)))
        .collect();
    Value::Object(map)
}

proptest! {
    #[test]
    fn key_is_independent_of_insertion_order(
        pairs in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8),
        seed in any::<u64>(),
    ) {
        let pairs: Vec<(String, i64)> = pairs.into_iter().collect();
        let mut shuffled = pairs.clone();
        // Deterministic rotation stands in for a shuffle.
        if !shuffled.is_empty() {
            let by = (seed as usize) % shuffled.len();
            shuffled.rotate_left(by);
            shuffled.reverse();
        }

        let a = object_from(&pairs);
        let b = object_from(&shuffled);
        prop_assert_eq!(fingerprint([("args", &a)]), fingerprint([("args", &b)]));
    }

    #[test]
    fn key_shape_is_stable(s in ".*") {
        let v = Value::String(s);
        let key = fingerprint([("q", &v)]);
        prop_assert!(key.starts_with("plandag:"));
        prop_assert_eq!(key.len(), "plandag:".len() + 8);
    }
}
