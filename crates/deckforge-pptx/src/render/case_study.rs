//! Case-study slides: market-entry precedents and lessons learned.
//!
//! A vertical key-value block (company, year, entry mode, outcome) on the
//! left; lesson panels narrow the content column when present. The
//! applicability callout is clamped so it never overlaps the footer.

use crate::error::{PptxError, Result};
use crate::render::{
    array_of, callout_box, push_rule_lines, scalar_text, source_box, str_of, title_box,
    RenderContext,
};
use crate::spec::{Align, ParagraphSpec, RunSpec, ShapeSpec, SlideKind, SlideSpec, TextBoxSpec};
use deckforge_model::{Block, Rect, RunContext};
use serde_json::Value;

pub(crate) fn render(
    block: &Block,
    ctx: &RenderContext<'_>,
    _run: &mut RunContext,
) -> Result<SlideSpec> {
    let mut slide = SlideSpec::new(SlideKind::Content)
        .with_block_key(block.key.as_str())
        .with_template_slide(ctx.template_slide);

    slide.push(ShapeSpec::TextBox(title_box(ctx.contract, &block.title)));
    push_rule_lines(&mut slide, ctx.contract);

    let lessons = extract_lessons(&block.data);
    let facts = extract_facts(block)?;

    // Lessons narrow the fact column
    let content = ctx.layout.content;
    let fact_width = if lessons.is_empty() {
        content.w
    } else {
        content.w * 0.55
    };

    let mut fact_box = TextBoxSpec::new(
        Rect::new(content.x, content.y + 0.1, fact_width, content.h * 0.55),
        "Case Facts",
    );
    for (label, value) in &facts {
        fact_box.paragraphs.push(ParagraphSpec {
            runs: vec![
                RunSpec::bold(format!("{label}: "))
                    .with_size(12)
                    .with_color(ctx.contract.palette.secondary.clone()),
                RunSpec::plain(value.clone()).with_size(12),
            ],
            align: Align::Left,
            ..Default::default()
        });
    }
    slide.push(ShapeSpec::TextBox(fact_box));

    if !lessons.is_empty() {
        let panel_x = content.x + fact_width + 0.2;
        let panel_w = content.right() - panel_x;
        let mut lesson_box = TextBoxSpec::new(
            Rect::new(panel_x, content.y + 0.1, panel_w, content.h * 0.7),
            "Lessons",
        )
        .with_fill(ctx.contract.palette.table_alt_row.clone())
        .with_outline(ctx.contract.palette.secondary.clone());

        lesson_box.paragraphs.push(ParagraphSpec {
            runs: vec![RunSpec::bold("Lessons Learned")
                .with_size(13)
                .with_color(ctx.contract.palette.secondary.clone())],
            ..Default::default()
        });
        for lesson in lessons.iter().take(5) {
            lesson_box.paragraphs.push(ParagraphSpec {
                runs: vec![RunSpec::plain(lesson.clone()).with_size(11)],
                bullet: true,
                ..Default::default()
            });
        }
        slide.push(ShapeSpec::TextBox(lesson_box));
    }

    // Applicability callout, clamped above the source line
    if let Some(applicability) = str_of(&block.data, &["applicability", "relevance"]) {
        let top = content.y + content.h * 0.62;
        let max_bottom = ctx.layout.source.y - 0.02;
        let height = (max_bottom - top).min(1.0);
        if height >= 0.4 {
            slide.push(ShapeSpec::TextBox(callout_box(
                ctx.contract,
                Rect::new(content.x, top, content.w, height),
                "Applicability",
                applicability,
            )));
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

/// The key-value facts of the case, in display order
fn extract_facts(block: &Block) -> Result<Vec<(String, String)>> {
    let data = &block.data;

    // Accept a nested caseStudies array by taking the first entry
    let subject: &Value = array_of(data, &["caseStudies", "cases"])
        .and_then(|a| a.first())
        .unwrap_or(data);

    let fields: &[(&str, &[&str])] = &[
        ("Company", &["company", "name"]),
        ("Year", &["year", "entryYear"]),
        ("Entry Mode", &["mode", "entryMode"]),
        ("Investment", &["investment", "dealSize"]),
        ("Outcome", &["outcome", "result"]),
        ("Summary", &["summary", "description", "narrative"]),
    ];

    let mut facts = Vec::new();
    for (label, keys) in fields {
        let value = keys
            .iter()
            .filter_map(|k| subject.get(*k))
            .map(scalar_text)
            .find(|s| !s.trim().is_empty());
        if let Some(value) = value {
            facts.push((label.to_string(), value));
        }
    }

    if facts.is_empty() {
        return Err(PptxError::invalid_payload(
            block.key.as_str(),
            "no case facts in payload",
        ));
    }
    Ok(facts)
}

fn extract_lessons(data: &Value) -> Vec<String> {
    let Some(items) = array_of(data, &["lessons", "lessonsLearned", "keyLessons"]) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(_) => str_of(item, &["lesson", "text"]).map(str::to_string),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckforge_model::BlockKey;
    use serde_json::json;

    #[test]
    fn test_extract_facts_direct() {
        let block = Block::new(
            BlockKey::CaseStudy,
            json!({
                "company": "Osaka Gas",
                "year": 2018,
                "mode": "JV with local distributor",
                "outcome": "Profitable from year 3"
            }),
        );

        let facts = extract_facts(&block).unwrap();
        assert_eq!(facts[0], ("Company".to_string(), "Osaka Gas".to_string()));
        assert!(facts.iter().any(|(l, _)| l == "Outcome"));
    }

    #[test]
    fn test_extract_facts_from_nested_array() {
        let block = Block::new(
            BlockKey::CaseStudy,
            json!({"caseStudies": [{"company": "Tokyo Gas", "year": 2020}]}),
        );

        let facts = extract_facts(&block).unwrap();
        assert_eq!(facts[0].1, "Tokyo Gas");
    }

    #[test]
    fn test_no_facts_is_error() {
        let block = Block::new(BlockKey::CaseStudy, json!({"unrelated": true}));
        assert!(extract_facts(&block).is_err());
    }

    #[test]
    fn test_extract_lessons_mixed_shapes() {
        let lessons = extract_lessons(&json!({
            "lessons": ["move early", {"lesson": "partner locally"}, 42]
        }));
        assert_eq!(lessons, vec!["move early", "partner locally"]);
    }
}
