//! Slide renderers: one per block key, dispatched exhaustively.
//!
//! `build_deck` assembles the fixed deck skeleton - cover, TOC, executive
//! summary, the opportunities & barriers slide, per-section dividers with
//! content, appendix TOC, closing - and renders each routed block onto its
//! template geometry. A renderer that fails is replaced by a placeholder
//! slide so the deck length stays deterministic; strict mode re-raises
//! instead.

mod case_study;
mod companies;
mod market;
mod regulation;
mod summary;
mod table;

pub use companies::dedupe_global_company_list;

use crate::assets::Assets;
use crate::error::{PptxError, Result};
use crate::spec::{
    Align, ImageSpec, LineSpec, ParagraphSpec, RunSpec, ShapeSpec, SlideKind, SlideSpec,
    TextBoxSpec,
};
use deckforge_model::{Block, BlockKey, DataQuality, Rect, RunContext, Scope};
use deckforge_template::{
    CellVAlign, StyleProfileCache, TemplateContract, TemplateLayout,
};
use serde_json::Value;

/// Placeholder body for a failed slide; long enough to clear the sparse
/// audit so one failure does not cascade into a second class of error.
const RENDER_FAILURE_PLACEHOLDER: &str =
    "Content rendering failed for this section. The underlying research data could not be \
     laid out on the template geometry and requires manual review.";

/// Everything a renderer needs about its slide
pub struct RenderContext<'a> {
    pub contract: &'a TemplateContract,
    pub layout: &'a TemplateLayout,
    pub template_slide: u32,
    pub strict: bool,
}

/// The rendered deck plus the clone-overlay input map
#[derive(Debug)]
pub struct RenderedDeck {
    /// Slides in final order
    pub slides: Vec<SlideSpec>,

    /// `(generated slide number, template slide number)` pairs, recorded as
    /// slides are appended
    pub clone_map: Vec<(usize, u32)>,
}

/// Input to deck assembly. Blocks must already be routed.
pub struct DeckInput<'a> {
    pub blocks: &'a [Block],
    pub contract: &'a TemplateContract,
    pub scope: &'a Scope,
    pub country: &'a str,
    pub executive_summary: Option<&'a str>,
    pub assets: &'a Assets,
}

/// Assemble the full deck.
pub fn build_deck(
    input: DeckInput<'_>,
    run: &mut RunContext,
    styles: &mut StyleProfileCache,
) -> Result<RenderedDeck> {
    let contract = input.contract;

    let mut slides: Vec<SlideSpec> = Vec::new();
    let mut clone_map: Vec<(usize, u32)> = Vec::new();

    let append = |slides: &mut Vec<SlideSpec>,
                  clone_map: &mut Vec<(usize, u32)>,
                  slide: SlideSpec| {
        let template = slide.template_slide;
        slides.push(slide);
        // Map entry goes in after the push so the length names the slide
        if let Some(template) = template {
            clone_map.push((slides.len(), template));
        }
    };

    // Fixed head: cover, TOC, executive summary
    append(
        &mut slides,
        &mut clone_map,
        cover_slide(contract, input.scope, input.country, input.assets),
    );
    append(&mut slides, &mut clone_map, toc_slide(contract));
    append(
        &mut slides,
        &mut clone_map,
        exec_summary_slide(contract, input.country, input.executive_summary),
    );

    // Company dedupe runs once across all company blocks
    let blocks = dedupe_global_company_list(input.blocks);

    // Opportunities & barriers leads the content when present
    let mut rendered_keys: Vec<BlockKey> = Vec::new();
    if let Some(block) = blocks.iter().find(|b| b.key == BlockKey::OpportunitiesObstacles) {
        render_block_guarded(block, contract, styles, run, &mut slides, &mut clone_map)?;
        rendered_keys.push(block.key);
    }

    // Sections: divider then content
    for section in deckforge_model::Section::all() {
        let section_blocks: Vec<&Block> = blocks
            .iter()
            .filter(|b| b.key.section() == section && !rendered_keys.contains(&b.key))
            .collect();
        if section_blocks.is_empty() {
            continue;
        }

        append(
            &mut slides,
            &mut clone_map,
            divider_slide(contract, section.divider_title(), section.input_key()),
        );

        for block in section_blocks {
            render_block_guarded(block, contract, styles, run, &mut slides, &mut clone_map)?;
            rendered_keys.push(block.key);
        }
    }

    // Fixed tail: appendix divider, appendix TOC, closing
    append(
        &mut slides,
        &mut clone_map,
        divider_slide(contract, "Appendix", "appendix"),
    );
    append(&mut slides, &mut clone_map, appendix_toc_slide(contract));
    append(
        &mut slides,
        &mut clone_map,
        closing_slide(contract, input.scope),
    );

    // Abort when more than half the resolved blocks failed
    let resolved = rendered_keys.len();
    let failed = run.metrics.slide_render_failures.len();
    if resolved > 0 && failed * 2 > resolved {
        return Err(PptxError::invalid_payload(
            "deck",
            format!("{failed} of {resolved} blocks failed to render"),
        ));
    }

    log::info!(
        "deck assembled: {} slides, {} blocks, {} failures",
        slides.len(),
        resolved,
        failed
    );

    Ok(RenderedDeck { slides, clone_map })
}

/// Render one block, trapping per-slide failures into a placeholder.
fn render_block_guarded(
    block: &Block,
    contract: &TemplateContract,
    styles: &mut StyleProfileCache,
    run: &mut RunContext,
    slides: &mut Vec<SlideSpec>,
    clone_map: &mut Vec<(usize, u32)>,
) -> Result<()> {
    let route = block.route.as_ref().ok_or_else(|| {
        PptxError::invalid_payload(block.key.as_str(), "block reached renderer unrouted")
    })?;
    let layout = contract.layout(route.slide).ok_or_else(|| {
        PptxError::missing_geometry(block.key.as_str(), "layout record")
    })?;

    run.metrics.record_template_use(&route.pattern);

    let ctx = RenderContext {
        contract,
        layout,
        template_slide: route.slide,
        strict: run.strict(),
    };

    let slide = match render_block(block, &ctx, run, styles) {
        Ok(slide) => slide,
        Err(err) => {
            if ctx.strict {
                return Err(err);
            }
            run.metrics
                .record_render_failure(block.key.as_str(), err.to_string());
            log::error!("render failure for '{}': {}", block.key.as_str(), err);
            placeholder_slide(block, &ctx)
        }
    };

    let template = slide.template_slide;
    slides.push(slide);
    if let Some(template) = template {
        clone_map.push((slides.len(), template));
    }
    Ok(())
}

/// Exhaustive dispatch: every key renders or the crate does not compile.
fn render_block(
    block: &Block,
    ctx: &RenderContext<'_>,
    run: &mut RunContext,
    styles: &mut StyleProfileCache,
) -> Result<SlideSpec> {
    use BlockKey::*;
    match block.key {
        FoundationalActs | KeyIncentives | InvestmentRestrictions => {
            regulation::render(block, ctx, run, styles)
        }
        JapanesePlayers | LocalMajor | ForeignPlayers | PartnerAssessment => {
            companies::render(block, ctx, run, styles)
        }
        Tpes | FinalDemand | Electricity | GasLng | Pricing | EscoMarket => {
            market::render(block, ctx, run)
        }
        CaseStudy | LessonsLearned => case_study::render(block, ctx, run),
        GoNoGo | OpportunitiesObstacles | KeyInsights | TimingIntelligence => {
            summary::render(block, ctx, run, styles)
        }
    }
}

// ---------------------------------------------------------------------------
// Structural slides
// ---------------------------------------------------------------------------

fn cover_slide(
    contract: &TemplateContract,
    scope: &Scope,
    country: &str,
    assets: &Assets,
) -> SlideSpec {
    let mut slide = SlideSpec::new(SlideKind::Cover).with_template_slide(contract.cover_slide);

    if let Some(bg) = assets.cover_background() {
        slide.push(ShapeSpec::Image(ImageSpec {
            name: "cover-bg.png".to_string(),
            rect: Rect::new(0.0, 0.0, 13.333, 7.5),
            data: bg.to_vec(),
        }));
    }

    let title = if scope.project_name.is_empty() {
        format!("{country} Market Assessment")
    } else {
        format!("{}: {}", scope.project_name, country)
    };

    slide.push(ShapeSpec::TextBox(
        TextBoxSpec::new(Rect::new(0.9, 2.6, 11.5, 1.4), "Cover Title")
            .with_anchor(CellVAlign::Middle)
            .with_paragraph(ParagraphSpec {
                runs: vec![RunSpec::bold(title)
                    .with_size(36)
                    .with_color(contract.palette.primary.clone())],
                align: Align::Left,
                ..Default::default()
            }),
    ));

    let mut subtitle_lines = Vec::new();
    if !scope.industry.is_empty() {
        subtitle_lines.push(scope.industry.clone());
    }
    if !scope.client_name.is_empty() {
        subtitle_lines.push(format!("Prepared for {}", scope.client_name));
    }
    if !subtitle_lines.is_empty() {
        let mut tb = TextBoxSpec::new(Rect::new(0.9, 4.1, 11.5, 1.0), "Cover Subtitle");
        for line in subtitle_lines {
            tb.paragraphs.push(ParagraphSpec::plain(line));
        }
        slide.push(ShapeSpec::TextBox(tb));
    }

    slide
}

fn toc_slide(contract: &TemplateContract) -> SlideSpec {
    let mut slide = SlideSpec::new(SlideKind::Toc).with_template_slide(contract.toc_slide);

    slide.push(ShapeSpec::TextBox(title_box(contract, "Table of Contents")));

    let mut body = TextBoxSpec::new(rect_content(contract), "TOC Body");
    for section in deckforge_model::Section::all() {
        body.paragraphs
            .push(ParagraphSpec::bullet(section.divider_title()));
    }
    body.paragraphs.push(ParagraphSpec::bullet("Appendix"));
    slide.push(ShapeSpec::TextBox(body));

    slide
}

fn exec_summary_slide(
    contract: &TemplateContract,
    country: &str,
    summary: Option<&str>,
) -> SlideSpec {
    let mut slide =
        SlideSpec::new(SlideKind::ExecSummary).with_template_slide(contract.exec_summary_slide);

    slide.push(ShapeSpec::TextBox(title_box(contract, "Executive Summary")));
    push_rule_lines(&mut slide, contract);

    let text = summary
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "This assessment evaluates {country} as a market-entry candidate across \
                 policy, market fundamentals, the competitive landscape, and entry depth."
            )
        });

    let mut body = TextBoxSpec::new(rect_content(contract), "Summary Body");
    for para in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
        body.paragraphs.push(ParagraphSpec::plain(para.trim()));
    }
    slide.push(ShapeSpec::TextBox(body));

    slide
}

fn divider_slide(contract: &TemplateContract, title: &str, section_key: &str) -> SlideSpec {
    let template = contract
        .divider_slide(section_key)
        .unwrap_or(contract.toc_slide);
    let mut slide = SlideSpec::new(SlideKind::SectionDivider).with_template_slide(template);

    slide.push(ShapeSpec::TextBox(
        TextBoxSpec::new(Rect::new(0.9, 3.0, 11.5, 1.5), "Divider Title")
            .with_anchor(CellVAlign::Middle)
            .with_paragraph(ParagraphSpec {
                runs: vec![RunSpec::bold(title)
                    .with_size(32)
                    .with_color(contract.palette.primary.clone())],
                align: Align::Left,
                ..Default::default()
            }),
    ));

    slide
}

fn appendix_toc_slide(contract: &TemplateContract) -> SlideSpec {
    let mut slide =
        SlideSpec::new(SlideKind::AppendixToc).with_template_slide(contract.appendix_toc_slide);

    slide.push(ShapeSpec::TextBox(title_box(contract, "Appendix")));

    let mut body = TextBoxSpec::new(rect_content(contract), "Appendix TOC");
    body.paragraphs
        .push(ParagraphSpec::bullet("Methodology & sources"));
    body.paragraphs
        .push(ParagraphSpec::bullet("Data quality notes"));
    slide.push(ShapeSpec::TextBox(body));

    slide
}

fn closing_slide(contract: &TemplateContract, scope: &Scope) -> SlideSpec {
    let mut slide = SlideSpec::new(SlideKind::Closing).with_template_slide(contract.closing_slide);

    let line = if scope.client_name.is_empty() {
        "Thank You".to_string()
    } else {
        format!("Thank You - {}", scope.client_name)
    };

    slide.push(ShapeSpec::TextBox(
        TextBoxSpec::new(Rect::new(0.9, 3.1, 11.5, 1.2), "Closing")
            .with_anchor(CellVAlign::Middle)
            .with_paragraph(ParagraphSpec {
                runs: vec![RunSpec::bold(line)
                    .with_size(32)
                    .with_color(contract.palette.primary.clone())],
                align: Align::Center,
                ..Default::default()
            }),
    ));

    slide
}

fn placeholder_slide(block: &Block, ctx: &RenderContext<'_>) -> SlideSpec {
    let mut slide = SlideSpec::new(SlideKind::Content)
        .with_block_key(block.key.as_str())
        .with_template_slide(ctx.template_slide);

    slide.push(ShapeSpec::TextBox(title_box(ctx.contract, &block.title)));
    push_rule_lines(&mut slide, ctx.contract);
    slide.push(ShapeSpec::TextBox(
        TextBoxSpec::new(rect_content(ctx.contract), "Placeholder")
            .with_paragraph(ParagraphSpec::plain(RENDER_FAILURE_PLACEHOLDER)),
    ));

    slide
}

// ---------------------------------------------------------------------------
// Shared shape helpers
// ---------------------------------------------------------------------------

/// The contract's default content rect (layouts agree on it)
fn rect_content(contract: &TemplateContract) -> Rect {
    contract
        .layouts
        .values()
        .next()
        .map(|l| l.content)
        .unwrap_or(Rect::new(0.45, 1.15, 12.43, 5.45))
}

/// Standard title box at the layout title rect
pub(crate) fn title_box(contract: &TemplateContract, title: &str) -> TextBoxSpec {
    let rect = contract
        .layouts
        .values()
        .next()
        .map(|l| l.title)
        .unwrap_or(Rect::new(0.45, 0.28, 12.43, 0.72));

    TextBoxSpec::new(rect, "Title")
        .with_anchor(CellVAlign::Middle)
        .with_paragraph(ParagraphSpec {
            runs: vec![RunSpec::bold(title)
                .with_size(22)
                .with_color(contract.palette.primary.clone())],
            ..Default::default()
        })
}

/// Header and footer rules at the contract's Y offsets
pub(crate) fn push_rule_lines(slide: &mut SlideSpec, contract: &TemplateContract) {
    let width = contract.slide_width_emu - 2 * 411_480; // 0.45" side margins

    slide.push(ShapeSpec::Line(LineSpec {
        x_emu: 411_480,
        y_emu: contract.header_line_y_emu,
        cx_emu: width,
        cy_emu: 0,
        width_emu: 12_700,
        color: contract.palette.primary.clone(),
        name: "Header Rule".to_string(),
    }));
    slide.push(ShapeSpec::Line(LineSpec {
        x_emu: 411_480,
        y_emu: contract.footer_line_y_emu,
        cx_emu: width,
        cy_emu: 0,
        width_emu: 6_350,
        color: contract.palette.table_border.clone(),
        name: "Footer Rule".to_string(),
    }));
}

/// Source line at the layout's source rect: citations plus data quality
pub(crate) fn source_box(
    contract: &TemplateContract,
    layout: &TemplateLayout,
    citations: &[String],
    quality: DataQuality,
) -> TextBoxSpec {
    let mut text = String::from("Source: ");
    if citations.is_empty() {
        text.push_str("desk research");
    } else {
        let shown: Vec<&str> = citations.iter().take(3).map(String::as_str).collect();
        text.push_str(&shown.join("; "));
        if citations.len() > 3 {
            text.push_str(&format!(" (+{} more)", citations.len() - 3));
        }
    }
    if quality != DataQuality::Unknown {
        text.push_str(&format!(" | Data quality: {:?}", quality).to_lowercase());
    }

    TextBoxSpec::new(layout.source, "Source").with_paragraph(ParagraphSpec {
        runs: vec![RunSpec::plain(text)
            .with_size(9)
            .with_color(contract.palette.text.clone())],
        ..Default::default()
    })
}

/// A filled callout box
pub(crate) fn callout_box(
    contract: &TemplateContract,
    rect: Rect,
    heading: &str,
    body: &str,
) -> TextBoxSpec {
    TextBoxSpec::new(rect, heading)
        .with_fill(contract.palette.table_alt_row.clone())
        .with_outline(contract.palette.secondary.clone())
        .with_paragraph(ParagraphSpec {
            runs: vec![RunSpec::bold(heading)
                .with_size(12)
                .with_color(contract.palette.secondary.clone())],
            ..Default::default()
        })
        .with_paragraph(ParagraphSpec {
            runs: vec![RunSpec::plain(body).with_size(11)],
            ..Default::default()
        })
}

// ---------------------------------------------------------------------------
// JSON helpers shared by the family renderers
// ---------------------------------------------------------------------------

/// First string value found under any of the given keys
pub(crate) fn str_of<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| value.get(k).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

/// First array found under any of the given keys
pub(crate) fn array_of<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|k| value.get(k).and_then(Value::as_array))
}

/// Render a JSON scalar as display text
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
