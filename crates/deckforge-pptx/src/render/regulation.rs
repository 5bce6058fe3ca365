//! Regulation-list slides: foundational acts, incentives, restrictions.
//!
//! Header row plus one row per act, with requirements and penalties merged
//! into a single cell. A key-message caption and a regulatory-pathway callout
//! fill the strip between the table and the source line when present.

use crate::error::{PptxError, Result};
use crate::render::table::flexed_table;
use crate::render::{
    array_of, callout_box, push_rule_lines, scalar_text, source_box, str_of, title_box,
    RenderContext,
};
use crate::spec::{ShapeSpec, SlideKind, SlideSpec};
use deckforge_model::{Block, Rect, RunContext};
use deckforge_template::StyleProfileCache;
use serde_json::Value;

const COLUMN_WEIGHTS: [f64; 4] = [0.25, 0.08, 0.37, 0.30];

pub(crate) fn render(
    block: &Block,
    ctx: &RenderContext<'_>,
    run: &mut RunContext,
    styles: &mut StyleProfileCache,
) -> Result<SlideSpec> {
    let items = array_of(&block.data, &["acts", "incentives", "restrictions", "items"])
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            PptxError::invalid_payload(block.key.as_str(), "no regulation entries in payload")
        })?;

    let header = vec![
        "Act / Program".to_string(),
        "Year".to_string(),
        "Summary".to_string(),
        "Requirements & Penalties".to_string(),
    ];

    let body: Vec<Vec<String>> = items.iter().map(regulation_row).collect();

    let table = flexed_table(block, ctx, run, styles, header, body, &COLUMN_WEIGHTS)?;
    let table_bottom = table.rect.bottom();

    let mut slide = SlideSpec::new(SlideKind::Content)
        .with_block_key(block.key.as_str())
        .with_template_slide(ctx.template_slide);

    slide.push(ShapeSpec::TextBox(title_box(ctx.contract, &block.title)));
    push_rule_lines(&mut slide, ctx.contract);
    slide.push(ShapeSpec::Table(table));

    // Caption strip between the table and the source line
    let strip_top = table_bottom + 0.08;
    let strip_height = ctx.layout.source.y - 0.02 - strip_top;
    if strip_height >= 0.45 {
        let key_message = str_of(&block.data, &["keyMessage", "key_message"]);
        let pathway = pathway_summary(&block.data);

        match (key_message, pathway) {
            (Some(message), Some(pathway)) => {
                let half = ctx.layout.content.w / 2.0 - 0.1;
                slide.push(ShapeSpec::TextBox(callout_box(
                    ctx.contract,
                    Rect::new(ctx.layout.content.x, strip_top, half, strip_height),
                    "Key Message",
                    message,
                )));
                slide.push(ShapeSpec::TextBox(callout_box(
                    ctx.contract,
                    Rect::new(
                        ctx.layout.content.x + half + 0.2,
                        strip_top,
                        half,
                        strip_height,
                    ),
                    "Regulatory Pathway",
                    &pathway,
                )));
            }
            (Some(message), None) => {
                slide.push(ShapeSpec::TextBox(callout_box(
                    ctx.contract,
                    Rect::new(
                        ctx.layout.content.x,
                        strip_top,
                        ctx.layout.content.w,
                        strip_height,
                    ),
                    "Key Message",
                    message,
                )));
            }
            (None, Some(pathway)) => {
                slide.push(ShapeSpec::TextBox(callout_box(
                    ctx.contract,
                    Rect::new(
                        ctx.layout.content.x,
                        strip_top,
                        ctx.layout.content.w,
                        strip_height,
                    ),
                    "Regulatory Pathway",
                    &pathway,
                )));
            }
            (None, None) => {}
        }
    }

    slide.push(ShapeSpec::TextBox(source_box(
        ctx.contract,
        ctx.layout,
        &block.citations,
        block.data_quality,
    )));

    Ok(slide)
}

/// One table row from a regulation entry
fn regulation_row(item: &Value) -> Vec<String> {
    let name = str_of(item, &["name", "title", "act"]).unwrap_or("(unnamed)");
    let year = item
        .get("year")
        .map(scalar_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "-".to_string());
    let summary = str_of(item, &["description", "summary", "scope"]).unwrap_or("-");

    let mut obligations = String::new();
    if let Some(req) = str_of(item, &["requirements", "obligations"]) {
        obligations.push_str(req);
    }
    if let Some(pen) = str_of(item, &["penalties", "sanctions"]) {
        if !obligations.is_empty() {
            obligations.push_str(" | Penalties: ");
        }
        obligations.push_str(pen);
    }
    if obligations.is_empty() {
        obligations.push('-');
    }

    vec![
        name.to_string(),
        year,
        summary.to_string(),
        obligations,
    ]
}

/// Flatten the regulatory pathway into a one-line summary
fn pathway_summary(data: &Value) -> Option<String> {
    let pathway = data.get("regulatoryPathway")?;

    if let Some(text) = pathway.as_str() {
        return Some(text.to_string()).filter(|s| !s.trim().is_empty());
    }

    if let Some(steps) = array_of(pathway, &["steps", "stages"]) {
        let listed: Vec<String> = steps
            .iter()
            .map(|s| match s {
                Value::String(text) => text.clone(),
                other => str_of(other, &["name", "step"]).unwrap_or_default().to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect();
        if !listed.is_empty() {
            return Some(listed.join(" -> "));
        }
    }

    str_of(pathway, &["summary", "description"]).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_regulation_row_merges_obligations() {
        let item = json!({
            "name": "Energy Efficiency Act",
            "year": 2019,
            "description": "Mandatory audits for large consumers",
            "requirements": "Annual reporting",
            "penalties": "Fines up to $50k"
        });

        let row = regulation_row(&item);
        assert_eq!(row[0], "Energy Efficiency Act");
        assert_eq!(row[1], "2019");
        assert!(row[3].contains("Annual reporting"));
        assert!(row[3].contains("Penalties: Fines up to $50k"));
    }

    #[test]
    fn test_regulation_row_defaults() {
        let row = regulation_row(&json!({}));
        assert_eq!(row, vec!["(unnamed)", "-", "-", "-"]);
    }

    #[test]
    fn test_pathway_from_steps() {
        let data = json!({"regulatoryPathway": {"steps": ["ESCO license", "Energy audit permit"]}});
        assert_eq!(
            pathway_summary(&data).unwrap(),
            "ESCO license -> Energy audit permit"
        );
    }

    #[test]
    fn test_pathway_from_string() {
        let data = json!({"regulatoryPathway": "License via MOIT"});
        assert_eq!(pathway_summary(&data).unwrap(), "License via MOIT");
        assert!(pathway_summary(&json!({})).is_none());
    }
}
