// Content fingerprinting and token estimation
// Author: json2sheet contributors

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize `value` with object keys sorted at every depth.
///
/// Array order is preserved; it is part of the content.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Serializing a string cannot fail
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// SHA-256 hex digest of the canonical serialization of `content`.
pub fn content_hash(content: &[Value]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"[");
    for (i, block) in content.iter().enumerate() {
        if i > 0 {
            hasher.update(b",");
        }
        hasher.update(canonical_json(block).as_bytes());
    }
    hasher.update(b"]");
    hex::encode(hasher.finalize())
}

/// Estimate token count (rough approximation: 1 token ≈ 4 characters)
///
/// Characters are counted in the escaped ASCII form with `", "` and `": "`
/// separators, so every non-ASCII code unit weighs six (`\uXXXX`).
pub fn estimate_tokens(content: &[Value]) -> usize {
    let items: usize = content.iter().map(escaped_len).sum();
    let separators = 2 * content.len().saturating_sub(1);
    (2 + items + separators) / 4
}

fn escaped_len(value: &Value) -> usize {
    match value {
        Value::String(s) => escaped_str_len(s),
        Value::Array(items) => {
            let inner: usize = items.iter().map(escaped_len).sum();
            2 + inner + 2 * items.len().saturating_sub(1)
        }
        Value::Object(map) => {
            let inner: usize = map
                .iter()
                .map(|(key, value)| escaped_str_len(key) + 2 + escaped_len(value))
                .sum();
            2 + inner + 2 * map.len().saturating_sub(1)
        }
        scalar => scalar.to_string().len(),
    }
}

fn escaped_str_len(s: &str) -> usize {
    let body: usize = s
        .chars()
        .map(|c| match c {
            '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0c}' => 2,
            c if (c as u32) < 0x20 => 6,
            c if c.is_ascii() => 1,
            c => 6 * c.len_utf16(),
        })
        .sum();
    body + 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"b": 1, "a": {"d": [3, 1], "c": null}});
        assert_eq!(canonical_json(&value), r#"{"a":{"c":null,"d":[3,1]},"b":1}"#);
    }

    #[test]
    fn test_hash_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"role":"system","content":"x"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"content":"x","role":"system"}"#).unwrap();
        assert_eq!(content_hash(&[a]), content_hash(&[b]));
    }

    #[test]
    fn test_hash_respects_block_order() {
        let a = json!({"role": "system"});
        let b = json!({"role": "user"});
        assert_ne!(
            content_hash(&[a.clone(), b.clone()]),
            content_hash(&[b, a])
        );
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = content_hash(&[json!("hello")]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_estimate_tokens_counts_serialized_length() {
        // ["<4000 x's>"] serializes to 4004 characters
        let content = vec![Value::String("x".repeat(4000))];
        assert_eq!(estimate_tokens(&content), 1001);
        assert_eq!(estimate_tokens(&[]), 0);
    }

    #[test]
    fn test_estimate_tokens_escapes_non_ascii() {
        // ["\u00e9\u00e9"] is 16 characters
        assert_eq!(estimate_tokens(&[json!("éé")]), 4);
        // an astral char is a surrogate pair: ["\ud83d\ude00"] is 16 characters
        assert_eq!(estimate_tokens(&[json!("😀")]), 4);
        // [{"a": 1, "b": "q\"x"}] is 23 characters
        assert_eq!(estimate_tokens(&[json!({"a": 1, "b": "q\"x"})]), 5);
    }
}
