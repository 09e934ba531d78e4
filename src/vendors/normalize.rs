//! Search-response normalization.
//!
//! Different vector-search backends wrap their results differently. This
//! module resolves any of the known wrapper shapes into a flat list of
//! vendor records by trying a prioritized chain of shape matchers; the
//! first matcher that yields a non-empty array wins. Unrecognized input
//! normalizes to an empty list, never an error.

use serde_json::{Map, Value};

/// One recognized response shape: a name for logging plus an extractor
/// that returns the vendor array when the shape applies.
struct ShapeMatcher {
    name: &'static str,
    extract: fn(&Value) -> Option<Vec<Value>>,
}

/// Priority order matters: wrapper keys first, then scored match/hit
/// shapes, then a bare top-level array.
const MATCHERS: &[ShapeMatcher] = &[
    ShapeMatcher {
        name: "vendors",
        extract: vendors_wrapper,
    },
    ShapeMatcher {
        name: "results",
        extract: results_wrapper,
    },
    ShapeMatcher {
        name: "items",
        extract: items_wrapper,
    },
    ShapeMatcher {
        name: "matches",
        extract: matches_shape,
    },
    ShapeMatcher {
        name: "hits",
        extract: hits_shape,
    },
    ShapeMatcher {
        name: "bare-array",
        extract: bare_array,
    },
];

/// Resolve a raw search response into vendor records. Total: any input
/// yields a (possibly empty) list. Null entries are dropped.
pub fn normalize(raw: &Value) -> Vec<Value> {
    for matcher in MATCHERS {
        if let Some(vendors) = (matcher.extract)(raw) {
            tracing::debug!(
                "search response matched shape '{}' with {} entries",
                matcher.name,
                vendors.len()
            );
            return vendors.into_iter().filter(|v| !v.is_null()).collect();
        }
    }
    Vec::new()
}

fn non_empty_array(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) if !items.is_empty() => Some(items),
        _ => None,
    }
}

fn wrapped_array(raw: &Value, key: &str) -> Option<Vec<Value>> {
    non_empty_array(raw.get(key)?).cloned()
}

fn vendors_wrapper(raw: &Value) -> Option<Vec<Value>> {
    wrapped_array(raw, "vendors")
}

fn results_wrapper(raw: &Value) -> Option<Vec<Value>> {
    wrapped_array(raw, "results")
}

fn items_wrapper(raw: &Value) -> Option<Vec<Value>> {
    wrapped_array(raw, "items")
}

/// Pinecone-style `{matches: [{id, score|similarity, metadata}]}`.
/// Each match flattens to its metadata fields plus `_score` and `_id`.
fn matches_shape(raw: &Value) -> Option<Vec<Value>> {
    let items = non_empty_array(raw.get("matches")?)?;
    Some(
        items
            .iter()
            .map(|m| {
                let mut record = object_fields(m.get("metadata"));
                let score = m.get("score").or_else(|| m.get("similarity"));
                annotate(&mut record, score, m.get("id"));
                Value::Object(record)
            })
            .collect(),
    )
}

/// Generic hit shape `{hits: [{id, score|_score, document|payload|metadata}]}`.
/// The first non-null field source wins; the hit object itself is the last
/// resort.
fn hits_shape(raw: &Value) -> Option<Vec<Value>> {
    let items = non_empty_array(raw.get("hits")?)?;
    Some(
        items
            .iter()
            .map(|h| {
                let source = ["document", "payload", "metadata"]
                    .iter()
                    .find_map(|k| h.get(k).filter(|v| !v.is_null()))
                    .unwrap_or(h);
                let mut record = object_fields(Some(source));
                let score = h.get("score").or_else(|| h.get("_score"));
                annotate(&mut record, score, h.get("id"));
                Value::Object(record)
            })
            .collect(),
    )
}

fn bare_array(raw: &Value) -> Option<Vec<Value>> {
    non_empty_array(raw).cloned()
}

fn object_fields(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

fn annotate(record: &mut Map<String, Value>, score: Option<&Value>, id: Option<&Value>) {
    if let Some(score) = score.filter(|s| !s.is_null()) {
        record.insert("_score".to_string(), score.clone());
    }
    if let Some(id) = id.filter(|i| !i.is_null()) {
        record.insert("_id".to_string(), id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ─── Wrapper shapes ──────────────────────────────────

    #[test]
    fn test_vendors_wrapper() {
        let raw = json!({"vendors": [{"name": "A"}, {"name": "B"}]});
        let out = normalize(&raw);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["name"], "A");
    }

    #[test]
    fn test_results_wrapper() {
        let raw = json!({"results": [{"name": "A"}]});
        assert_eq!(normalize(&raw).len(), 1);
    }

    #[test]
    fn test_items_wrapper() {
        let raw = json!({"items": [{"name": "A"}]});
        assert_eq!(normalize(&raw).len(), 1);
    }

    #[test]
    fn test_vendors_takes_priority_over_results() {
        let raw = json!({
            "vendors": [{"name": "from-vendors"}],
            "results": [{"name": "from-results"}],
        });
        let out = normalize(&raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "from-vendors");
    }

    #[test]
    fn test_empty_wrapper_falls_through() {
        // An empty vendors array must not shadow a populated later shape
        let raw = json!({"vendors": [], "results": [{"name": "A"}]});
        let out = normalize(&raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "A");
    }

    // ─── Scored shapes ───────────────────────────────────

    #[test]
    fn test_matches_shape_flattens_metadata() {
        let raw = json!({"matches": [
            {"id": "v1", "score": 0.9, "metadata": {"name": "Foo", "city": "Mumbai"}},
        ]});
        let out = normalize(&raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "Foo");
        assert_eq!(out[0]["city"], "Mumbai");
        assert_eq!(out[0]["_score"], 0.9);
        assert_eq!(out[0]["_id"], "v1");
    }

    #[test]
    fn test_matches_shape_accepts_similarity() {
        let raw = json!({"matches": [{"id": "v1", "similarity": 0.7, "metadata": {"name": "X"}}]});
        let out = normalize(&raw);
        assert_eq!(out[0]["_score"], 0.7);
    }

    #[test]
    fn test_matches_without_metadata_keeps_score_and_id() {
        let raw = json!({"matches": [{"id": "v1", "score": 0.5}]});
        let out = normalize(&raw);
        assert_eq!(out[0]["_id"], "v1");
        assert_eq!(out[0]["_score"], 0.5);
        assert!(out[0].get("name").is_none());
    }

    #[test]
    fn test_hits_shape_prefers_document() {
        let raw = json!({"hits": [
            {"id": "1", "score": 0.9, "document": {"name": "Doc"}, "payload": {"name": "Pay"}},
        ]});
        let out = normalize(&raw);
        assert_eq!(out[0]["name"], "Doc");
        assert_eq!(out[0]["_score"], 0.9);
        assert_eq!(out[0]["_id"], "1");
    }

    #[test]
    fn test_hits_shape_falls_back_to_payload_then_metadata() {
        let raw = json!({"hits": [{"id": "1", "payload": {"name": "Pay"}}]});
        assert_eq!(normalize(&raw)[0]["name"], "Pay");

        let raw = json!({"hits": [{"id": "1", "document": null, "metadata": {"name": "Meta"}}]});
        assert_eq!(normalize(&raw)[0]["name"], "Meta");
    }

    #[test]
    fn test_hits_shape_uses_hit_itself_last() {
        let raw = json!({"hits": [{"id": "1", "_score": 0.4, "name": "Inline"}]});
        let out = normalize(&raw);
        assert_eq!(out[0]["name"], "Inline");
        assert_eq!(out[0]["_score"], 0.4);
    }

    // ─── Bare array and degenerate input ─────────────────

    #[test]
    fn test_bare_array() {
        let raw = json!([{"name": "A"}, {"name": "B"}]);
        assert_eq!(normalize(&raw).len(), 2);
    }

    #[test]
    fn test_null_entries_are_dropped() {
        let raw = json!({"vendors": [{"name": "A"}, null, {"name": "B"}]});
        assert_eq!(normalize(&raw).len(), 2);
    }

    #[test]
    fn test_total_over_degenerate_input() {
        assert!(normalize(&json!({})).is_empty());
        assert!(normalize(&json!(null)).is_empty());
        assert!(normalize(&json!("a string")).is_empty());
        assert!(normalize(&json!(42)).is_empty());
        assert!(normalize(&json!({"unrelated": {"vendors": "nope"}})).is_empty());
        assert!(normalize(&json!([])).is_empty());
    }
}
