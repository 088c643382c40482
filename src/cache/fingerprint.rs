// src/cache/fingerprint.rs

//! Stable, order-independent cache keys.
//!
//! A key is `plandag:` followed by the 32-bit FNV-1a digest (8 lowercase hex
//! digits) of the canonical JSON form of the key parts. Canonical means
//! object keys sorted at every level, so argument insertion order never
//! matters. Both cache backends use exactly this function.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::tools::ToolCall;

pub const KEY_PREFIX: &str = "plandag:";

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Key for an arbitrary set of named parts.
pub fn fingerprint<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let sorted: BTreeMap<&str, Value> = parts
        .into_iter()
        .map(|(k, v)| (k, canonicalize(v)))
        .collect();

    let mut canonical = String::from("{");
    for (i, (k, v)) in sorted.iter().enumerate() {
        if i > 0 {
            canonical.push(',');
        }
        canonical.push_str(&Value::String((*k).to_string()).to_string());
        canonical.push(':');
        canonical.push_str(&v.to_string());
    }
    canonical.push('}');

    format!("{KEY_PREFIX}{:08x}", fnv1a_32(canonical.as_bytes()))
}

/// Key for a task: tool name, the tool's normalised required argument and
/// the normalised description. Nothing else from the argument map is used.
pub fn task_fingerprint(call: &ToolCall, description: &str) -> String {
    let tool = Value::String(call.kind().as_str().to_string());
    let primary = Value::String(call.cache_identity());
    let description = Value::String(normalize_description(description));

    fingerprint([
        ("tool", &tool),
        (call.kind().required_field(), &primary),
        ("description", &description),
    ])
}

/// Lowercase, trimmed, inner whitespace collapsed to single spaces.
pub fn normalize_description(description: &str) -> String {
    description
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rebuild a value with every object's keys in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
