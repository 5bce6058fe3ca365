//! Block classification: normalized sections -> ordered typed blocks.
//!
//! The deck length is part of the fidelity contract, so classification is
//! deterministic: per section, a fixed key sequence, each key emitting at
//! most one block. A dynamic-discovery mode exists for debugging new
//! synthesis schemas and is off in production.

use crate::compact::compact;
use crate::normalize::{has_meaningful_content, NormalizedSection};
use deckforge_model::{Block, BlockKey, CompactionMode, DataQuality, Section};
use serde_json::Value;
use std::collections::BTreeMap;

/// Dynamic block discovery walks unknown payload keys and invents blocks for
/// them. Debugging aid only; deterministic slide count requires this off.
pub const ENABLE_DYNAMIC_BLOCK_DISCOVERY: bool = false;

/// Classification output: renderable blocks in deck order, plus the keys
/// skipped for lack of meaningful content.
#[derive(Debug, Clone)]
pub struct ClassifiedDeck {
    /// Blocks in deck order
    pub blocks: Vec<Block>,

    /// Keys skipped, with the reason
    pub skipped: Vec<(BlockKey, &'static str)>,
}

impl ClassifiedDeck {
    /// Keys of the classified blocks, in order
    pub fn keys(&self) -> Vec<BlockKey> {
        self.blocks.iter().map(|b| b.key).collect()
    }
}

/// Classify all sections into an ordered block list.
///
/// `enrichment` is the sanitized Stage-3 synthesis payload
/// (`marketOpportunityAssessment`, `keyInsights`, `nextSteps`, ...); it backs
/// Depth keys that the section itself left empty.
pub fn classify_sections(
    sections: &BTreeMap<&'static str, NormalizedSection>,
    enrichment: &Value,
    compaction: CompactionMode,
) -> ClassifiedDeck {
    let mut blocks = Vec::new();
    let mut skipped = Vec::new();

    for section in Section::all() {
        let normalized = sections.get(section.input_key());

        for key in BlockKey::all().iter().filter(|k| k.section() == section) {
            match block_payload(*key, normalized, enrichment) {
                Some(payload) if has_meaningful_content(&payload) => {
                    let payload = compact(&payload, key.as_str(), compaction);
                    blocks.push(build_block(*key, payload));
                }
                Some(_) => skipped.push((*key, "semantically empty")),
                None => skipped.push((*key, "absent from synthesis")),
            }
        }
    }

    log::info!(
        "classified {} blocks ({} skipped)",
        blocks.len(),
        skipped.len()
    );

    ClassifiedDeck { blocks, skipped }
}

/// Assemble the payload for one key, merging section data with enrichment
/// where the key calls for it.
fn block_payload(
    key: BlockKey,
    normalized: Option<&NormalizedSection>,
    enrichment: &Value,
) -> Option<Value> {
    let section_value = normalized.and_then(|n| n.data.get(key.as_str()).cloned());

    match key {
        // Regulation slides carry the licensing pathway as a callout
        BlockKey::FoundationalActs => {
            let mut value = section_value?;
            if let Some(pathway) = normalized.and_then(|n| n.data.get("regulatoryPathway")) {
                if let Value::Object(map) = &mut value {
                    map.insert("regulatoryPathway".to_string(), pathway.clone());
                }
            }
            Some(value)
        }

        // Depth keys fall back to Stage-3 enrichment
        BlockKey::KeyInsights => {
            section_value.or_else(|| enrichment.get("keyInsights").cloned())
        }
        BlockKey::OpportunitiesObstacles => {
            let mut value = section_value
                .or_else(|| enrichment.get("marketOpportunityAssessment").cloned())?;
            if let (Value::Object(map), Some(steps)) = (&mut value, enrichment.get("nextSteps")) {
                map.entry("nextSteps".to_string())
                    .or_insert_with(|| steps.clone());
            }
            Some(value)
        }

        _ => section_value,
    }
}

/// Build a block, lifting title/subtitle/citations/quality out of the payload
fn build_block(key: BlockKey, payload: Value) -> Block {
    let title = payload
        .get("slideTitle")
        .or_else(|| payload.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| key.default_title().to_string());

    let subtitle = payload
        .get("subtitle")
        .and_then(Value::as_str)
        .map(str::to_string);

    let citations = extract_citations(&payload);

    let quality = payload
        .get("dataQuality")
        .and_then(Value::as_str)
        .map(DataQuality::parse)
        .unwrap_or_default();

    Block {
        key,
        data_type: key.default_data_type(),
        data: payload,
        title,
        subtitle,
        citations,
        data_quality: quality,
        route: None,
    }
}

/// Pull citation strings from `citations` or `sources` arrays; entries may be
/// bare strings or objects with `url`/`source`/`title` fields.
fn extract_citations(payload: &Value) -> Vec<String> {
    let array = payload
        .get("citations")
        .or_else(|| payload.get("sources"))
        .and_then(Value::as_array);

    let Some(items) = array else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(map) => map
                .get("url")
                .or_else(|| map.get("source"))
                .or_else(|| map.get("title"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_section;
    use serde_json::json;

    fn sections_from(pairs: &[(Section, Value)]) -> BTreeMap<&'static str, NormalizedSection> {
        pairs
            .iter()
            .map(|(section, raw)| {
                (
                    section.input_key(),
                    normalize_section(*section, raw, true).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_deterministic_order() {
        let sections = sections_from(&[
            (
                Section::Market,
                json!({"tpes": {"series": [1]}, "electricity": {"series": [2]}}),
            ),
            (
                Section::Policy,
                json!({"foundationalActs": {"acts": [{"name": "Energy Act"}]}}),
            ),
        ]);

        let deck = classify_sections(&sections, &Value::Null, CompactionMode::Off);

        // Policy before Market regardless of map ordering
        assert_eq!(
            deck.keys(),
            vec![BlockKey::FoundationalActs, BlockKey::Tpes, BlockKey::Electricity]
        );
    }

    #[test]
    fn test_empty_payloads_skipped() {
        let sections = sections_from(&[(
            Section::Market,
            json!({"tpes": {"note": "insufficient research data"}}),
        )]);

        let deck = classify_sections(&sections, &Value::Null, CompactionMode::Off);
        assert!(deck.blocks.is_empty());
        assert!(deck
            .skipped
            .iter()
            .any(|(k, reason)| *k == BlockKey::Tpes && *reason == "semantically empty"));
    }

    #[test]
    fn test_title_lifted_from_payload() {
        let sections = sections_from(&[(
            Section::Depth,
            json!({"goNoGo": {"slideTitle": "Vietnam: Go", "criteria": [{"name": "size", "met": true}]}}),
        )]);

        let deck = classify_sections(&sections, &Value::Null, CompactionMode::Off);
        assert_eq!(deck.blocks[0].title, "Vietnam: Go");
    }

    #[test]
    fn test_regulatory_pathway_attached_to_acts() {
        let sections = sections_from(&[(
            Section::Policy,
            json!({
                "foundationalActs": {"acts": [{"name": "Act 1"}]},
                "regulatoryPathway": {"steps": ["license", "permit"]}
            }),
        )]);

        let deck = classify_sections(&sections, &Value::Null, CompactionMode::Off);
        let block = &deck.blocks[0];
        assert_eq!(block.key, BlockKey::FoundationalActs);
        assert!(block.data.get("regulatoryPathway").is_some());
    }

    #[test]
    fn test_enrichment_backs_depth_keys() {
        let sections = sections_from(&[]);
        let enrichment = json!({
            "keyInsights": {"insights": ["entry window is 2026-2028"]},
            "marketOpportunityAssessment": {"opportunities": ["esco demand"]},
            "nextSteps": ["secure local partner"]
        });

        let deck = classify_sections(&sections, &enrichment, CompactionMode::Off);
        let keys = deck.keys();
        assert!(keys.contains(&BlockKey::KeyInsights));
        assert!(keys.contains(&BlockKey::OpportunitiesObstacles));

        let opp = deck
            .blocks
            .iter()
            .find(|b| b.key == BlockKey::OpportunitiesObstacles)
            .unwrap();
        assert!(opp.data.get("nextSteps").is_some());
    }

    #[test]
    fn test_citations_extraction() {
        let sections = sections_from(&[(
            Section::Competitors,
            json!({"japanesePlayers": {
                "players": [{"name": "Marubeni"}],
                "citations": ["https://example.com/a", {"url": "https://example.com/b"}]
            }}),
        )]);

        let deck = classify_sections(&sections, &Value::Null, CompactionMode::Off);
        assert_eq!(
            deck.blocks[0].citations,
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_dynamic_discovery_disabled() {
        assert!(!ENABLE_DYNAMIC_BLOCK_DISCOVERY);
    }
}
