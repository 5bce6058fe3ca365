//! Render compaction: bounding string and array lengths by semantic path.
//!
//! Limits key on the last path segment, not the full path - the synthesis
//! nests the same field names at many depths. Chart-data arrays are never
//! compacted: trimming a series distorts geometry.

use crate::text::truncate_chars;
use deckforge_model::CompactionMode;
use serde_json::{Map, Value};

/// Path segments whose arrays must never be trimmed
const CHART_DATA_KEYS: &[&str] = &["series", "dataPoints", "values", "labels", "segments"];

/// String length limit for a path segment, `None` when unbounded
fn string_limit(segment: &str, mode: CompactionMode) -> Option<usize> {
    let bounded = match segment {
        "url" | "sourceUrl" | "link" => 2048,
        "slideTitle" | "title" => 320,
        "subtitle" => 700,
        "description" => 900,
        "analysis" | "narrative" | "assessment" | "rationale" => 1500,
        "summary" | "insight" | "implication" => 1200,
        _ => return None,
    };

    match mode {
        CompactionMode::Off => None,
        CompactionMode::Bounded => Some(bounded),
        // The legacy limits were roughly a third of the bounded ones
        CompactionMode::Legacy => Some((bounded / 3).max(80)),
    }
}

/// Array item cap for a path segment, `None` when unbounded.
///
/// Company arrays (`players`, `companies`) are deliberately absent: their
/// capacity is the table flex engine's decision, which folds overflow into a
/// visible summary row instead of silently dropping entries.
fn array_limit(segment: &str, mode: CompactionMode) -> Option<usize> {
    if CHART_DATA_KEYS.contains(&segment) {
        return None;
    }

    let bounded = match segment {
        "acts" | "regulations" | "incentives" | "restrictions" => 10,
        "criteria" | "insights" | "lessons" => 8,
        "opportunities" | "obstacles" | "barriers" => 7,
        "citations" | "sources" => 14,
        "nextSteps" | "recommendations" => 5,
        _ => return None,
    };

    match mode {
        CompactionMode::Off => None,
        CompactionMode::Bounded => Some(bounded),
        CompactionMode::Legacy => Some((bounded / 2).max(3)),
    }
}

/// Bound string and array lengths across a payload.
///
/// `path_segment` is the key under which `node` was reached; pass the block
/// key at the root. Returns a new value.
pub fn compact(node: &Value, path_segment: &str, mode: CompactionMode) -> Value {
    if mode == CompactionMode::Off {
        return node.clone();
    }

    match node {
        Value::String(s) => match string_limit(path_segment, mode) {
            Some(limit) => Value::String(truncate_chars(s, limit)),
            None => node.clone(),
        },
        Value::Array(items) => {
            let kept: &[Value] = match array_limit(path_segment, mode) {
                Some(limit) if items.len() > limit => &items[..limit],
                _ => items.as_slice(),
            };
            Value::Array(
                kept.iter()
                    .map(|item| compact(item, path_segment, mode))
                    .collect(),
            )
        }
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                out.insert(key.clone(), compact(inner, key, mode));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}
