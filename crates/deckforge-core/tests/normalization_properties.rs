//! Property-style tests for the input-side stages.

use deckforge_core::{
    classify_sections, ensure_string, is_transient_key, normalize_section, safe_cell, sanitize,
    CELL_HARD_CAP,
};
use deckforge_model::{CompactionMode, Section};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A spread of awkward strings: glyphs, controls, long runs, mixed scripts
fn awkward_samples() -> Vec<String> {
    let mut samples = vec![
        String::new(),
        "plain".to_string(),
        "tabs\tand\nnewlines\r\n".to_string(),
        "\u{201C}smart\u{201D} \u{2018}quotes\u{2019} \u{2013} dashes \u{2014} everywhere".to_string(),
        "arrows \u{2192} here \u{2190} and \u{2194} there".to_string(),
        "nb\u{00A0}space zero\u{200B}width bom\u{FEFF}mark".to_string(),
        "controls \u{0001}\u{0002}\u{000B}\u{000C}\u{001F} stripped".to_string(),
        "survivors \t \n \r stay".to_string(),
        "\u{6771}\u{4EAC} mixed with ASCII and 42%".to_string(),
        "x".repeat(5000),
    ];
    // A string of every low codepoint
    samples.push(('\u{0000}'..='\u{007F}').collect());
    samples
}

#[test]
fn ensure_string_is_idempotent_on_awkward_input() {
    for sample in awkward_samples() {
        let once = ensure_string(&sample);
        let twice = ensure_string(&once);
        assert_eq!(once, twice, "not idempotent for {sample:?}");
    }
}

#[test]
fn ensure_string_output_is_always_xml_safe() {
    for sample in awkward_samples() {
        for ch in ensure_string(&sample).chars() {
            let invalid = matches!(
                ch,
                '\u{0000}'..='\u{0008}' | '\u{000B}' | '\u{000C}' | '\u{000E}'..='\u{001F}'
            );
            assert!(!invalid, "invalid char {ch:?} from {sample:?}");
        }
    }
}

#[test]
fn safe_cell_never_exceeds_hard_cap() {
    for sample in awkward_samples() {
        for max_len in [None, Some(10), Some(40), Some(120), Some(260), Some(9999)] {
            for strict in [false, true] {
                let cell = safe_cell(&sample, max_len, strict);
                assert!(cell.chars().count() <= CELL_HARD_CAP);
            }
        }
    }
}

#[test]
fn sanitize_leaves_no_transient_keys_at_any_depth() {
    let input = json!({
        "_synthesisError": "x",
        "level1": {
            "confidenceScore": 1,
            "level2": [
                {"dataType": "t", "keep": true},
                {"_wasArray": true, "nested": {"_deep": 1, "value": 2}}
            ]
        }
    });

    fn assert_clean(value: &Value) {
        match value {
            Value::Object(map) => {
                for (key, inner) in map {
                    assert!(!is_transient_key(key), "transient key survived: {key}");
                    assert_clean(inner);
                }
            }
            Value::Array(items) => items.iter().for_each(assert_clean),
            _ => {}
        }
    }

    assert_clean(&sanitize(&input));
}

#[test]
fn canonical_payload_is_a_fixed_point_of_normalization() {
    let canonical = json!({
        "foundationalActs": {"acts": [{"name": "Act"}]},
        "keyIncentives": {"incentives": [{"name": "FIT"}]},
        "regulatoryPathway": {"steps": ["license"]}
    });

    let first = normalize_section(Section::Policy, &canonical, true).unwrap();
    let again =
        normalize_section(Section::Policy, &Value::Object(first.data.clone()), true).unwrap();

    assert_eq!(first.data, again.data);
    assert!(again.dropped_keys.is_empty());
}

#[test]
fn classification_is_stable_across_runs() {
    let mut sections = BTreeMap::new();
    sections.insert(
        Section::Market.input_key(),
        normalize_section(
            Section::Market,
            &json!({
                "tpes": {"series": [{"year": 2020, "value": 1.0}]},
                "pricing": {"series": [{"year": 2020, "value": 9.0}]}
            }),
            true,
        )
        .unwrap(),
    );

    let first = classify_sections(&sections, &Value::Null, CompactionMode::Bounded);
    let second = classify_sections(&sections, &Value::Null, CompactionMode::Bounded);

    assert_eq!(first.keys(), second.keys());
    assert_eq!(first.blocks.len(), 2);
}
