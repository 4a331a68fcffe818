// Fingerprint determinism property tests
// Author: json2sheet contributors

use json2sheet::cache::fingerprint::{canonical_json, content_hash, estimate_tokens};
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

fn object_from(pairs: impl Iterator<Item = (String, i64)>) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert(key, Value::from(value));
    }
    Value::Object(map)
}

proptest! {
    #[test]
    fn hash_ignores_key_insertion_order(fields in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..12)) {
        let forward = object_from(fields.clone().into_iter());
        let reversed = object_from(fields.clone().into_iter().rev());
        let nested_forward = serde_json::json!({"role": "user", "content": forward.clone()});
        let nested_reversed = serde_json::json!({"content": reversed.clone(), "role": "user"});

        prop_assert_eq!(canonical_json(&forward), canonical_json(&reversed));
        prop_assert_eq!(content_hash(&[nested_forward]), content_hash(&[nested_reversed]));
    }

    #[test]
    fn hash_is_stable_across_calls(text in ".{0,200}") {
        let content = vec![serde_json::json!({"role": "system", "content": text})];
        let first = content_hash(&content);
        prop_assert_eq!(first.len(), 64);
        prop_assert_eq!(first, content_hash(&content.clone()));
    }

    #[test]
    fn non_ascii_chars_weigh_six(text in "[\u{4e00}-\u{9fa5}]{1,300}") {
        let count = text.chars().count();
        let content = vec![serde_json::json!(text)];
        // ["\uXXXX..."]
        prop_assert_eq!(estimate_tokens(&content), (4 + 6 * count) / 4);
    }

    #[test]
    fn distinct_values_give_distinct_hashes(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(a != b);
        let left = content_hash(&[serde_json::json!({"v": a})]);
        let right = content_hash(&[serde_json::json!({"v": b})]);
        prop_assert_ne!(left, right);
    }

    #[test]
    fn token_estimate_tracks_serialized_length(fields in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 1..12)) {
        let field_count = fields.len();
        let block = object_from(fields.into_iter());
        // compact form plus one space after each colon and comma, inside [ ]
        let chars = canonical_json(&block).chars().count() + 2 * field_count - 1;
        prop_assert_eq!(estimate_tokens(&[block]), (chars + 2) / 4);
    }
}

#[test]
fn test_reordered_document_same_hash() {
    let a: Value = serde_json::from_str(
        r#"{"schema": {"type": "object", "properties": {"b": {}, "a": {}}}, "role": "user"}"#,
    )
    .unwrap();
    let b: Value = serde_json::from_str(
        r#"{"role": "user", "schema": {"properties": {"a": {}, "b": {}}, "type": "object"}}"#,
    )
    .unwrap();
    assert_eq!(content_hash(&[a]), content_hash(&[b]));

    let unused: BTreeMap<String, i64> = BTreeMap::new();
    assert_eq!(canonical_json(&object_from(unused.into_iter())), "{}");
}
