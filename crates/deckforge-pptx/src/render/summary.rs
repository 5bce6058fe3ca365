//! Summary slides: go/no-go, opportunities & obstacles, insights, timing.
//!
//! Criteria tables carry tick/cross/question status marks color-coded
//! green/red/orange. Opportunities and obstacles render as a paired layout
//! followed by rating and recommendation callouts.

use crate::error::{PptxError, Result};
use crate::render::table::flexed_table;
use crate::render::{
    array_of, callout_box, push_rule_lines, source_box, str_of, title_box, RenderContext,
};
use crate::spec::{ParagraphSpec, RunSpec, ShapeSpec, SlideKind, SlideSpec, TextBoxSpec};
use deckforge_model::{Block, BlockKey, Rect, RunContext};
use deckforge_template::StyleProfileCache;
use serde_json::Value;

/// Status mark for a criterion: glyph plus palette role
fn status_mark(met: Option<bool>) -> (&'static str, StatusColor) {
    match met {
        Some(true) => ("\u{2713}", StatusColor::Green),
        Some(false) => ("\u{2717}", StatusColor::Red),
        None => ("?", StatusColor::Orange),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusColor {
    Green,
    Red,
    Orange,
}

impl StatusColor {
    fn hex<'a>(&self, ctx: &'a RenderContext<'_>) -> &'a str {
        match self {
            StatusColor::Green => &ctx.contract.palette.accent_green,
            StatusColor::Red => &ctx.contract.palette.accent_red,
            StatusColor::Orange => &ctx.contract.palette.accent_orange,
        }
    }
}

pub(crate) fn render(
    block: &Block,
    ctx: &RenderContext<'_>,
    run: &mut RunContext,
    styles: &mut StyleProfileCache,
) -> Result<SlideSpec> {
    match block.key {
        BlockKey::GoNoGo => render_go_no_go(block, ctx, run, styles),
        BlockKey::OpportunitiesObstacles => render_opportunities(block, ctx, run, styles),
        BlockKey::KeyInsights | BlockKey::TimingIntelligence => render_bullets(block, ctx),
        other => Err(PptxError::invalid_payload(
            other.as_str(),
            "not a summary-family key",
        )),
    }
}

fn render_go_no_go(
    block: &Block,
    ctx: &RenderContext<'_>,
    run: &mut RunContext,
    styles: &mut StyleProfileCache,
) -> Result<SlideSpec> {
    let criteria = array_of(&block.data, &["criteria", "factors"])
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            PptxError::invalid_payload(block.key.as_str(), "no criteria in payload")
        })?;

    let header = vec![
        "Criterion".to_string(),
        "Status".to_string(),
        "Rationale".to_string(),
    ];

    let mut marks: Vec<StatusColor> = Vec::with_capacity(criteria.len());
    let body: Vec<Vec<String>> = criteria
        .iter()
        .map(|c| {
            let name = str_of(c, &["name", "criterion"]).unwrap_or("(criterion)");
            let met = c.get("met").and_then(Value::as_bool);
            let (glyph, color) = status_mark(met);
            marks.push(color);
            let rationale = str_of(c, &["rationale", "notes", "evidence"]).unwrap_or("-");
            vec![name.to_string(), glyph.to_string(), rationale.to_string()]
        })
        .collect();

    let mut table = flexed_table(
        block,
        ctx,
        run,
        styles,
        header,
        body,
        &[0.28, 0.10, 0.62],
    )?;

    // Color the status column; capacity rows past the criteria list stay plain
    for (i, row) in table.rows.iter_mut().enumerate().skip(1) {
        let Some(color) = marks.get(i - 1) else { break };
        if let Some(cell) = row.get_mut(1) {
            cell.color = Some(color.hex(ctx).to_string());
            cell.bold = true;
        }
    }

    let table_bottom = table.rect.bottom();
    let mut slide = content_slide(block, ctx);
    slide.push(ShapeSpec::Table(table));

    push_verdict_callouts(&mut slide, block, ctx, table_bottom);
    slide.push(ShapeSpec::TextBox(source_box(
        ctx.contract,
        ctx.layout,
        &block.citations,
        block.data_quality,
    )));
    Ok(slide)
}

fn render_opportunities(
    block: &Block,
    ctx: &RenderContext<'_>,
    run: &mut RunContext,
    styles: &mut StyleProfileCache,
) -> Result<SlideSpec> {
    let opportunities = string_list(&block.data, &["opportunities"]);
    let obstacles = string_list(&block.data, &["obstacles", "barriers"]);

    if opportunities.is_empty() && obstacles.is_empty() {
        return Err(PptxError::invalid_payload(
            block.key.as_str(),
            "neither opportunities nor obstacles in payload",
        ));
    }

    // Paired rows: opportunity | obstacle
    let header = vec!["Opportunities".to_string(), "Obstacles".to_string()];
    let rows = opportunities.len().max(obstacles.len());
    let body: Vec<Vec<String>> = (0..rows)
        .map(|i| {
            vec![
                opportunities.get(i).cloned().unwrap_or_else(|| "-".to_string()),
                obstacles.get(i).cloned().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let table = flexed_table(block, ctx, run, styles, header, body, &[0.5, 0.5])?;
    let table_bottom = table.rect.bottom();

    let mut slide = content_slide(block, ctx);
    slide.push(ShapeSpec::Table(table));

    push_verdict_callouts(&mut slide, block, ctx, table_bottom);
    slide.push(ShapeSpec::TextBox(source_box(
        ctx.contract,
        ctx.layout,
        &block.citations,
        block.data_quality,
    )));
    Ok(slide)
}

fn render_bullets(block: &Block, ctx: &RenderContext<'_>) -> Result<SlideSpec> {
    let items = string_list(
        &block.data,
        &["insights", "windows", "factors", "points", "items"],
    );
    if items.is_empty() {
        return Err(PptxError::invalid_payload(
            block.key.as_str(),
            "no list content in payload",
        ));
    }

    let mut slide = content_slide(block, ctx);

    let content = ctx.layout.content;
    let mut body = TextBoxSpec::new(
        Rect::new(content.x, content.y + 0.1, content.w, content.h * 0.75),
        "Insight List",
    );
    for item in items.iter().take(8) {
        body.paragraphs.push(ParagraphSpec {
            runs: vec![RunSpec::plain(item.clone()).with_size(14)],
            bullet: true,
            ..Default::default()
        });
    }
    slide.push(ShapeSpec::TextBox(body));

    if let Some(recommendation) = str_of(&block.data, &["recommendation", "conclusion"]) {
        let top = content.y + content.h * 0.78;
        let height = (ctx.layout.source.y - 0.02 - top).min(0.9);
        if height >= 0.4 {
            slide.push(ShapeSpec::TextBox(callout_box(
                ctx.contract,
                Rect::new(content.x, top, content.w, height),
                "Recommendation",
                recommendation,
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

/// Common slide shell: title plus header/footer rules
fn content_slide(block: &Block, ctx: &RenderContext<'_>) -> SlideSpec {
    let mut slide = SlideSpec::new(SlideKind::Content)
        .with_block_key(block.key.as_str())
        .with_template_slide(ctx.template_slide);
    slide.push(ShapeSpec::TextBox(title_box(ctx.contract, &block.title)));
    push_rule_lines(&mut slide, ctx.contract);
    slide
}

/// Rating and recommendation callouts under a summary table
fn push_verdict_callouts(
    slide: &mut SlideSpec,
    block: &Block,
    ctx: &RenderContext<'_>,
    table_bottom: f64,
) {
    let strip_top = table_bottom + 0.08;
    let strip_height = ctx.layout.source.y - 0.02 - strip_top;
    if strip_height < 0.4 {
        return;
    }

    let rating = block
        .data
        .get("rating")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .filter(|s| !s.trim().is_empty());
    let recommendation = str_of(&block.data, &["recommendation", "verdict"]);

    match (rating, recommendation) {
        (Some(rating), Some(recommendation)) => {
            let third = ctx.layout.content.w / 3.0;
            slide.push(ShapeSpec::TextBox(callout_box(
                ctx.contract,
                Rect::new(ctx.layout.content.x, strip_top, third - 0.1, strip_height),
                "Rating",
                &rating,
            )));
            slide.push(ShapeSpec::TextBox(callout_box(
                ctx.contract,
                Rect::new(
                    ctx.layout.content.x + third + 0.1,
                    strip_top,
                    ctx.layout.content.w - third - 0.1,
                    strip_height,
                ),
                "Recommendation",
                recommendation,
            )));
        }
        (Some(rating), None) => slide.push(ShapeSpec::TextBox(callout_box(
            ctx.contract,
            Rect::new(ctx.layout.content.x, strip_top, ctx.layout.content.w, strip_height),
            "Rating",
            &rating,
        ))),
        (None, Some(recommendation)) => slide.push(ShapeSpec::TextBox(callout_box(
            ctx.contract,
            Rect::new(ctx.layout.content.x, strip_top, ctx.layout.content.w, strip_height),
            "Recommendation",
            recommendation,
        ))),
        (None, None) => {}
    }
}

/// Flatten a string-or-object array field into display strings
fn string_list(data: &Value, keys: &[&str]) -> Vec<String> {
    let Some(items) = array_of(data, keys) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(_) => str_of(item, &["text", "name", "insight", "description"])
                .map(str::to_string),
            _ => None,
        })
        .collect()
}
