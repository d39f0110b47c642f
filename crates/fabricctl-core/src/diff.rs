//! The diff engine: shallow field-level comparison between a desired and a
//! current record, with key exclusion, plus the right-biased merge that turns a
//! diff back into a full payload.
//!
//! Comparison is intentionally shallow (top-level keys only). Keys absent from
//! the desired record are never touched, so callers can manage a subset of
//! attributes without clobbering the rest. Excluded keys are never compared nor
//! overwritten regardless of presence on either side; they belong to
//! independent reconciliation flows (e.g. subnet lists, contract relationships).

use serde_json::{Map, Value};

/// Computes the set of top-level keys where `desired` differs from `current`.
///
/// A key appears in the result iff it is present in `desired`, not listed in
/// `excluded`, and its value differs from `current`'s. An empty result means no
/// operation is needed.
pub fn diff(
    desired: &Map<String, Value>,
    current: &Map<String, Value>,
    excluded: &[&str],
) -> Map<String, Value> {
    let mut changed = Map::new();
    for (key, value) in desired {
        if excluded.contains(&key.as_str()) {
            continue;
        }
        if current.get(key) != Some(value) {
            changed.insert(key.clone(), value.clone());
        }
    }
    changed
}

/// One-level-deep right-biased merge: every key in `diff` overwrites the same
/// key in `current`; all other keys of `current` are preserved unchanged. The
/// returned record is the new authoritative payload.
pub fn merge_payload(diff: &Map<String, Value>, current: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = current.clone();
    for (key, value) in diff {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// [`diff`] over `serde_json::Value`s; non-object inputs yield an empty diff.
pub fn diff_values(desired: &Value, current: &Value, excluded: &[&str]) -> Map<String, Value> {
    match (desired.as_object(), current.as_object()) {
        (Some(d), Some(c)) => diff(d, c, excluded),
        (Some(d), None) => diff(d, &Map::new(), excluded),
        _ => Map::new(),
    }
}
