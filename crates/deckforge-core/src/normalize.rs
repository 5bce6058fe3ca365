//! Section normalization against the closed schema.
//!
//! Each synthesis section has a canonical-key -> alias list map; the first
//! alias that resolves wins. Anything not consumed is a dropped key, and in
//! strict mode dropped keys abort the run before any layout decision is made.
//!
//! The Market section carries a legacy fallback: decks from the earlier
//! pipeline used a fixed schema that predates the canonical keys, and those
//! decks still need to normalize. Kept as legacy compatibility.

use crate::error::{CoreError, Result};
use crate::sanitize::sanitize;
use deckforge_model::Section;
use serde_json::{Map, Value};

/// Phrases that mean "there is no data here" regardless of casing
const SEMANTIC_EMPTY_PHRASES: &[&str] = &[
    "insufficient research data",
    "data unavailable",
    "no data available",
    "not available",
    "tbd",
    "n/a",
    "none identified",
    "unknown",
];

/// Artifacts a failed JSON parse leaves behind in string fields
const PARSER_ARTIFACTS: &[&str] = &[
    "unterminated string",
    "expected ',' or '}'",
    "expected ',' or ']'",
    "parse error",
    "unexpected token",
    "unexpected end of json",
];

/// A normalized section: canonical-keyed data plus everything dropped
#[derive(Debug, Clone)]
pub struct NormalizedSection {
    /// Canonical-keyed payload
    pub data: Map<String, Value>,

    /// Input keys that resolved to no canonical key
    pub dropped_keys: Vec<String>,
}

/// Canonical key -> accepted aliases, per section. The canonical name itself
/// always resolves first.
fn alias_map(section: Section) -> &'static [(&'static str, &'static [&'static str])] {
    match section {
        Section::Policy => &[
            (
                "foundationalActs",
                &["foundational_acts", "keyLegislation", "regulatoryActs"],
            ),
            (
                "keyIncentives",
                &["key_incentives", "incentivePrograms", "incentives"],
            ),
            (
                "investmentRestrictions",
                &[
                    "investment_restrictions",
                    "foreignInvestmentRestrictions",
                    "ownershipRestrictions",
                ],
            ),
            (
                "regulatoryPathway",
                &["regulatory_pathway", "licensingPathway"],
            ),
        ],
        Section::Market => &[
            (
                "tpes",
                &[
                    "totalPrimaryEnergySupply",
                    "primaryEnergySupply",
                    "marketSizeAndGrowth",
                ],
            ),
            (
                "finalDemand",
                &[
                    "final_demand",
                    "finalEnergyDemand",
                    "supplyAndDemandDynamics",
                ],
            ),
            ("electricity", &["electricityMarket", "powerMarket"]),
            ("gasLng", &["gas_lng", "gasAndLng", "lngMarket"]),
            ("pricing", &["energyPricing", "priceTrends", "tariffs"]),
            ("escoMarket", &["esco", "energyServices", "esco_market"]),
        ],
        Section::Competitors => &[
            (
                "japanesePlayers",
                &["japanese_players", "japaneseCompanies"],
            ),
            (
                "localMajor",
                &["local_major", "localMajorPlayers", "domesticPlayers"],
            ),
            (
                "foreignPlayers",
                &["foreign_players", "foreignEntrants", "internationalPlayers"],
            ),
            (
                "partnerAssessment",
                &[
                    "partner_assessment",
                    "potentialPartners",
                    "partnershipAssessment",
                ],
            ),
        ],
        Section::Depth => &[
            ("caseStudy", &["case_study", "caseStudies", "marketEntryCase"]),
            (
                "lessonsLearned",
                &["lessons_learned", "lessons", "keyLessons"],
            ),
            (
                "goNoGo",
                &["go_no_go", "goNoGoAssessment", "marketEntryDecision"],
            ),
            (
                "opportunitiesObstacles",
                &[
                    "opportunities_obstacles",
                    "opportunitiesAndObstacles",
                    "opportunitiesBarriers",
                ],
            ),
            ("keyInsights", &["key_insights", "insights", "strategicInsights"]),
            (
                "timingIntelligence",
                &["timing_intelligence", "timing", "marketTiming"],
            ),
        ],
    }
}

/// Legacy Market schema: fixed keys from the earlier pipeline, each mapping
/// directly onto one canonical key.
const MARKET_LEGACY_KEYS: &[(&str, &str)] = &[
    ("marketSize", "tpes"),
    ("demandOutlook", "finalDemand"),
    ("powerSector", "electricity"),
    ("gasSector", "gasLng"),
    ("priceEnvironment", "pricing"),
];

/// Resolve the first alias (canonical name first) that is present with a
/// non-null value. Returns the matched input key alongside the value.
fn select_first_alias_value<'a>(
    canonical: &str,
    aliases: &[&str],
    input: &'a Map<String, Value>,
) -> Option<(String, &'a Value)> {
    std::iter::once(canonical)
        .chain(aliases.iter().copied())
        .find_map(|name| {
            input
                .get(name)
                .filter(|v| !v.is_null())
                .map(|v| (name.to_string(), v))
        })
}

/// Normalize one section payload.
///
/// The input is transient-sanitized first, then alias-resolved against the
/// closed schema. In strict mode any unconsumed key is an error.
pub fn normalize_section(
    section: Section,
    raw: &Value,
    strict: bool,
) -> Result<NormalizedSection> {
    let cleaned = sanitize(raw);
    let input = match cleaned {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(CoreError::InvalidSectionShape {
                section: section.input_key().to_string(),
                found: json_type_name(&other),
            })
        }
    };

    let mut data = Map::new();
    let mut consumed: Vec<String> = Vec::new();

    for (canonical, aliases) in alias_map(section) {
        if let Some((matched, value)) = select_first_alias_value(canonical, aliases, &input) {
            data.insert(canonical.to_string(), value.clone());
            consumed.push(matched);
        }
    }

    // Legacy compatibility: decks from the earlier pipeline
    if section == Section::Market && data.is_empty() {
        for (legacy, canonical) in MARKET_LEGACY_KEYS {
            if let Some(value) = input.get(*legacy).filter(|v| !v.is_null()) {
                data.insert(canonical.to_string(), value.clone());
                consumed.push(legacy.to_string());
            }
        }
        if !data.is_empty() {
            log::debug!(
                "section '{}' normalized via legacy schema ({} keys)",
                section.input_key(),
                data.len()
            );
        }
    }

    let dropped_keys: Vec<String> = input
        .keys()
        .filter(|k| !consumed.contains(k))
        .cloned()
        .collect();

    if strict && !dropped_keys.is_empty() {
        return Err(CoreError::non_template_keys(
            section.input_key(),
            dropped_keys,
        ));
    }

    if !dropped_keys.is_empty() {
        log::warn!(
            "section '{}' dropped non-template keys: {:?}",
            section.input_key(),
            dropped_keys
        );
    }

    Ok(NormalizedSection { data, dropped_keys })
}

/// True when a string carries no renderable meaning: a known no-data phrase
/// or a JSON-parser artifact (optionally with `line N column N` positions).
pub fn is_semantically_empty(text: &str) -> bool {
    let normalized = text.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return true;
    }

    if SEMANTIC_EMPTY_PHRASES.iter().any(|p| normalized == *p) {
        return true;
    }

    if PARSER_ARTIFACTS.iter().any(|p| normalized.contains(p)) {
        return true;
    }

    // "line 3 column 17" style position reports
    if normalized.starts_with("line ") && normalized.contains(" column ") {
        let rest = &normalized[5..];
        if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return true;
        }
    }

    false
}

/// True when a value has any renderable content at all
pub fn has_meaningful_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => !is_semantically_empty(s),
        Value::Array(items) => items.iter().any(has_meaningful_content),
        Value::Object(map) => map.values().any(has_meaningful_content),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_payload_is_fixed_point() {
        let raw = json!({
            "tpes": {"series": [1, 2]},
            "finalDemand": {"series": [3]},
            "pricing": {"note": "rising"}
        });

        let normalized = normalize_section(Section::Market, &raw, true).unwrap();
        assert!(normalized.dropped_keys.is_empty());
        assert_eq!(normalized.data.len(), 3);
        assert_eq!(normalized.data["tpes"], raw["tpes"]);
    }

    #[test]
    fn test_alias_resolution_first_wins() {
        let raw = json!({
            "marketSizeAndGrowth": {"a": 1},
            "supplyAndDemandDynamics": {"b": 2}
        });

        let normalized = normalize_section(Section::Market, &raw, true).unwrap();
        assert_eq!(normalized.data["tpes"], json!({"a": 1}));
        assert_eq!(normalized.data["finalDemand"], json!({"b": 2}));
    }

    #[test]
    fn test_strict_rejects_unknown_keys() {
        let raw = json!({
            "tpes": {"a": 1},
            "mysteryBlob": {"x": 9}
        });

        let err = normalize_section(Section::Market, &raw, true).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("mysteryBlob"));
        assert!(msg.contains("rejected non-template/transient keys"));
    }

    #[test]
    fn test_lenient_collects_dropped_keys() {
        let raw = json!({
            "tpes": {"a": 1},
            "mysteryBlob": {"x": 9}
        });

        let normalized = normalize_section(Section::Market, &raw, false).unwrap();
        assert_eq!(normalized.dropped_keys, vec!["mysteryBlob".to_string()]);
        assert!(normalized.data.contains_key("tpes"));
    }

    #[test]
    fn test_transient_keys_dropped_before_matching() {
        let raw = json!({
            "tpes": {"_synthesisError": "fail", "series": [1]},
            "confidenceScore": 0.3
        });

        // confidenceScore is transient, so strict mode does not see it
        let normalized = normalize_section(Section::Market, &raw, true).unwrap();
        assert!(normalized.data["tpes"].get("_synthesisError").is_none());
    }

    #[test]
    fn test_market_legacy_fallback() {
        let raw = json!({
            "marketSize": {"value": 120},
            "powerSector": {"capacity": "54 GW"}
        });

        let normalized = normalize_section(Section::Market, &raw, true).unwrap();
        assert_eq!(normalized.data["tpes"], json!({"value": 120}));
        assert_eq!(normalized.data["electricity"], json!({"capacity": "54 GW"}));
    }

    #[test]
    fn test_legacy_fallback_not_used_when_canonical_present() {
        let raw = json!({
            "tpes": {"value": 1},
            "marketSize": {"value": 2}
        });

        // Canonical resolved, so marketSize stays unconsumed and strict fails
        assert!(normalize_section(Section::Market, &raw, true).is_err());
    }

    #[test]
    fn test_semantic_empty_phrases() {
        assert!(is_semantically_empty("  Insufficient research data "));
        assert!(is_semantically_empty("N/A"));
        assert!(is_semantically_empty("TBD"));
        assert!(is_semantically_empty(""));
        assert!(!is_semantically_empty("Vietnam ESCO market grew 12%"));
    }

    #[test]
    fn test_parser_artifacts_are_empty() {
        assert!(is_semantically_empty("Unterminated string at position 84"));
        assert!(is_semantically_empty("expected ',' or '}' somewhere"));
        assert!(is_semantically_empty("line 3 column 17"));
        assert!(!is_semantically_empty("line managers expect growth"));
    }

    #[test]
    fn test_meaningful_content_detection() {
        assert!(!has_meaningful_content(&json!({"a": "n/a", "b": null})));
        assert!(has_meaningful_content(&json!({"a": "n/a", "b": 3})));
        assert!(!has_meaningful_content(&json!([])));
        assert!(has_meaningful_content(&json!(["real data"])));
    }

    #[test]
    fn test_non_object_section_rejected() {
        let err = normalize_section(Section::Policy, &json!("not an object"), true).unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }
}
