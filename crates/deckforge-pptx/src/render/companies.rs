//! Company-comparison slides: Japanese, local, foreign players, partners.
//!
//! An enrichment pass flattens player records and composes a usable
//! description from whatever metrics are present; a global cross-array
//! dedupe on normalized name keys runs once for the whole deck before any
//! company slide renders.

use crate::error::{PptxError, Result};
use crate::render::table::flexed_table;
use crate::render::{
    array_of, callout_box, push_rule_lines, scalar_text, source_box, str_of, title_box,
    RenderContext,
};
use crate::spec::{ShapeSpec, SlideKind, SlideSpec};
use deckforge_model::{Block, BlockKey, Rect, RunContext};
use deckforge_template::StyleProfileCache;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Minimum words an enriched description should reach
const MIN_DESCRIPTION_WORDS: usize = 45;

/// Keys under which player arrays live, in lookup order
const PLAYER_ARRAY_KEYS: &[&str] = &["players", "companies", "partners", "entries"];

pub(crate) fn render(
    block: &Block,
    ctx: &RenderContext<'_>,
    run: &mut RunContext,
    styles: &mut StyleProfileCache,
) -> Result<SlideSpec> {
    let players = array_of(&block.data, PLAYER_ARRAY_KEYS)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            PptxError::invalid_payload(block.key.as_str(), "no player entries in payload")
        })?;

    let enriched: Vec<Value> = players.iter().map(enrich_player).collect();

    let (header, weights) = columns_for(block.key);
    let body: Vec<Vec<String>> = enriched
        .iter()
        .map(|p| player_row(block.key, p))
        .collect();

    let table = flexed_table(block, ctx, run, styles, header, body, &weights)?;
    let table_bottom = table.rect.bottom();

    let mut slide = SlideSpec::new(SlideKind::Content)
        .with_block_key(block.key.as_str())
        .with_template_slide(ctx.template_slide);

    slide.push(ShapeSpec::TextBox(title_box(ctx.contract, &block.title)));
    push_rule_lines(&mut slide, ctx.contract);
    slide.push(ShapeSpec::Table(table));

    push_trailing_callouts(&mut slide, block, ctx, table_bottom);

    slide.push(ShapeSpec::TextBox(source_box(
        ctx.contract,
        ctx.layout,
        &block.citations,
        block.data_quality,
    )));

    Ok(slide)
}

/// Columns and width weights per company key
fn columns_for(key: BlockKey) -> (Vec<String>, Vec<f64>) {
    let (names, weights): (&[&str], Vec<f64>) = match key {
        BlockKey::JapanesePlayers => (
            &["Company", "Segment", "Local Presence", "Strategy & Description"],
            vec![0.18, 0.16, 0.22, 0.44],
        ),
        BlockKey::LocalMajor => (
            &["Company", "Segment", "Revenue", "Profile"],
            vec![0.18, 0.16, 0.14, 0.52],
        ),
        BlockKey::ForeignPlayers => (
            &["Company", "Origin", "Entry Mode", "Profile"],
            vec![0.18, 0.12, 0.18, 0.52],
        ),
        BlockKey::PartnerAssessment => (
            &["Partner", "Strengths", "Fit", "Assessment"],
            vec![0.18, 0.26, 0.12, 0.44],
        ),
        other => (
            &["Company", "Segment", "Notes", "Profile"],
            {
                log::debug!("generic company columns for '{}'", other.as_str());
                vec![0.2, 0.2, 0.2, 0.4]
            },
        ),
    };
    (names.iter().map(|s| s.to_string()).collect(), weights)
}

/// First non-empty scalar under any of the given keys, as display text
fn field_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(k))
        .map(scalar_text)
        .find(|s| !s.trim().is_empty())
}

fn player_row(key: BlockKey, player: &Value) -> Vec<String> {
    let name = field_text(player, &["name", "company"]).unwrap_or_else(|| "(unnamed)".to_string());
    let description = field_text(player, &["description"]).unwrap_or_else(|| "-".to_string());

    let second = match key {
        BlockKey::ForeignPlayers => field_text(player, &["origin", "country", "hq"]),
        BlockKey::PartnerAssessment => field_text(player, &["strengths", "segment"]),
        _ => field_text(player, &["segment", "focus", "sector"]),
    }
    .unwrap_or_else(|| "-".to_string());

    let third = match key {
        BlockKey::JapanesePlayers => field_text(player, &["presence", "localPresence"]),
        BlockKey::LocalMajor => field_text(player, &["revenue", "sales"]),
        BlockKey::ForeignPlayers => field_text(player, &["entryMode", "mode"]),
        BlockKey::PartnerAssessment => field_text(player, &["fit", "fitRating"]),
        _ => field_text(player, &["notes"]),
    }
    .unwrap_or_else(|| "-".to_string());

    vec![name, second, third, description]
}

/// Flatten nested profile records and compose a description of at least
/// [`MIN_DESCRIPTION_WORDS`] words from available metrics.
fn enrich_player(player: &Value) -> Value {
    let mut flat = match player {
        Value::Object(map) => flatten_profile(map),
        Value::String(name) => {
            let mut map = Map::new();
            map.insert("name".to_string(), Value::String(name.clone()));
            map
        }
        _ => Map::new(),
    };

    let existing = flat
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("");
    if existing.split_whitespace().count() < MIN_DESCRIPTION_WORDS {
        let composed = compose_description(&flat, existing);
        flat.insert("description".to_string(), Value::String(composed));
    }

    Value::Object(flat)
}

/// Pull nested `profile`/`details` objects up to the top level
fn flatten_profile(map: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for (key, value) in map {
        match (key.as_str(), value) {
            ("profile", Value::Object(inner)) | ("details", Value::Object(inner)) => {
                for (k, v) in inner {
                    flat.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
            _ => {
                flat.insert(key.clone(), value.clone());
            }
        }
    }
    flat
}

/// Compose a sentence-per-metric description from whatever is present
fn compose_description(flat: &Map<String, Value>, existing: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !existing.trim().is_empty() {
        parts.push(existing.trim().trim_end_matches('.').to_string());
    }

    let name = flat
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("The company");

    let metric_sentences: &[(&str, fn(&str, &str) -> String)] = &[
        ("segment", |n, v| format!("{n} operates in the {v} segment")),
        ("revenue", |n, v| format!("{n} reports revenue of {v}")),
        ("employees", |n, v| format!("{n} employs {v} staff")),
        ("founded", |n, v| format!("{n} was founded in {v}")),
        ("presence", |n, v| format!("Local presence: {v}")),
        ("strategy", |_, v| format!("Strategy: {v}")),
        ("strengths", |_, v| format!("Key strengths include {v}")),
        ("partnershipPotential", |_, v| {
            format!("Partnership potential: {v}")
        }),
    ];

    for (key, compose) in metric_sentences {
        if parts.join(" ").split_whitespace().count() >= MIN_DESCRIPTION_WORDS {
            break;
        }
        let value = match flat.get(*key) {
            Some(v) => scalar_text(v),
            None => continue,
        };
        if value.is_empty() {
            continue;
        }
        parts.push(compose(name, &value));
    }

    let mut text = parts.join(". ");
    if !text.is_empty() && !text.ends_with('.') {
        text.push('.');
    }
    text
}

/// Normalized dedupe key for a company name
fn name_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Deduplicate players across every company block by normalized name.
///
/// First occurrence wins across the whole deck in block order; non-company
/// blocks pass through untouched. Idempotent and order-preserving.
pub fn dedupe_global_company_list(blocks: &[Block]) -> Vec<Block> {
    let company_keys = [
        BlockKey::JapanesePlayers,
        BlockKey::LocalMajor,
        BlockKey::ForeignPlayers,
        BlockKey::PartnerAssessment,
    ];

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut out: Vec<Block> = Vec::with_capacity(blocks.len());

    for block in blocks {
        if !company_keys.contains(&block.key) {
            out.push(block.clone());
            continue;
        }

        let mut block = block.clone();
        if let Value::Object(map) = &mut block.data {
            for array_key in PLAYER_ARRAY_KEYS {
                let Some(Value::Array(players)) = map.get_mut(*array_key) else {
                    continue;
                };
                players.retain(|player| {
                    let name = str_of(player, &["name", "company"])
                        .map(str::to_string)
                        .or_else(|| player.as_str().map(str::to_string));
                    match name {
                        Some(name) => seen.insert(name_key(&name)),
                        // Nameless entries are kept; nothing to key on
                        None => true,
                    }
                });
            }
        }
        out.push(block);
    }

    out
}

/// Trailing callouts in the strip below the table
fn push_trailing_callouts(
    slide: &mut SlideSpec,
    block: &Block,
    ctx: &RenderContext<'_>,
    table_bottom: f64,
) {
    let strip_top = table_bottom + 0.08;
    let strip_height = ctx.layout.source.y - 0.02 - strip_top;
    if strip_height < 0.45 {
        return;
    }

    let mut callouts: Vec<(&str, String)> = Vec::new();

    if let Some(text) = collapse_text(&block.data, &["competitiveInsights", "insights"]) {
        callouts.push(("Competitive Insight", text));
    }
    if let Some(text) = collapse_text(&block.data, &["potentialPartners"]) {
        callouts.push(("Potential Partners", text));
    }
    if let Some(text) = collapse_text(&block.data, &["strategicAssessments", "assessment"]) {
        callouts.push(("Strategic Assessment", text));
    }

    if callouts.is_empty() {
        return;
    }

    let count = callouts.len().min(3);
    let gap = 0.2;
    let width = (ctx.layout.content.w - gap * (count as f64 - 1.0)) / count as f64;

    for (i, (heading, body)) in callouts.into_iter().take(count).enumerate() {
        let x = ctx.layout.content.x + i as f64 * (width + gap);
        slide.push(ShapeSpec::TextBox(callout_box(
            ctx.contract,
            Rect::new(x, strip_top, width, strip_height),
            heading,
            &body,
        )));
    }
}

/// Collapse a string or string-array field into one line
fn collapse_text(data: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match data.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Array(items)) => {
                let joined: Vec<String> = items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                        Value::Object(_) => str_of(v, &["text", "insight", "name"])
                            .map(str::to_string),
                        _ => None,
                    })
                    .collect();
                if !joined.is_empty() {
                    return Some(joined.join("; "));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn company_block(key: BlockKey, players: Value) -> Block {
        Block::new(key, json!({ "players": players }))
    }

    #[test]
    fn test_dedupe_across_blocks_first_wins() {
        let blocks = vec![
            company_block(
                BlockKey::JapanesePlayers,
                json!([{"name": "Marubeni"}, {"name": "Itochu"}]),
            ),
            company_block(
                BlockKey::ForeignPlayers,
                json!([{"name": "MARUBENI"}, {"name": "Engie"}]),
            ),
        ];

        let deduped = dedupe_global_company_list(&blocks);

        let first = deduped[0].data["players"].as_array().unwrap();
        let second = deduped[1].data["players"].as_array().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0]["name"], "Engie");
    }

    #[test]
    fn test_dedupe_idempotent_and_order_preserving() {
        let blocks = vec![company_block(
            BlockKey::LocalMajor,
            json!([{"name": "EVN"}, {"name": "PetroVietnam"}, {"name": "evn"}]),
        )];

        let once = dedupe_global_company_list(&blocks);
        let twice = dedupe_global_company_list(&once);

        let names: Vec<&str> = once[0].data["players"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["EVN", "PetroVietnam"]);
        assert_eq!(
            serde_json::to_string(&once[0].data).unwrap(),
            serde_json::to_string(&twice[0].data).unwrap()
        );
    }

    #[test]
    fn test_dedupe_leaves_other_blocks_alone() {
        let blocks = vec![Block::new(
            BlockKey::Tpes,
            json!({"players": [{"name": "not a company table"}]}),
        )];
        let out = dedupe_global_company_list(&blocks);
        assert_eq!(out[0].data["players"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_enrich_composes_long_description() {
        let player = json!({
            "name": "Marubeni",
            "segment": "power & infrastructure",
            "revenue": "$60B",
            "employees": "45,000",
            "founded": "1858",
            "presence": "Hanoi representative office since 1991",
            "strategy": "IPP investments and ESCO pilots with local utilities and industrial parks"
        });

        let enriched = enrich_player(&player);
        let description = enriched["description"].as_str().unwrap();
        assert!(
            description.split_whitespace().count() >= 30,
            "description too short: {description}"
        );
        assert!(description.contains("Marubeni"));
    }

    #[test]
    fn test_enrich_flattens_profile() {
        let player = json!({
            "name": "Engie",
            "profile": {"segment": "energy services", "revenue": "EUR 70B"}
        });

        let enriched = enrich_player(&player);
        assert_eq!(enriched["segment"], "energy services");
    }

    #[test]
    fn test_name_key_normalization() {
        assert_eq!(name_key("Marubeni Corp."), name_key("marubeni-corp"));
        assert_ne!(name_key("Itochu"), name_key("Marubeni"));
    }

    #[test]
    fn test_collapse_text_from_array() {
        let data = json!({"competitiveInsights": ["price pressure", "local JVs dominate"]});
        assert_eq!(
            collapse_text(&data, &["competitiveInsights"]).unwrap(),
            "price pressure; local JVs dominate"
        );
    }
}
