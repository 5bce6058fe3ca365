//! Market-chart slides: supply, demand, electricity, gas, pricing, ESCO.
//!
//! Left 60% chart, right 40% insight panels. The dual-chart variant fires
//! when the routed pattern is `chart_callout_dual` and the slide carries two
//! chart rectangles.

use crate::error::{PptxError, Result};
use crate::render::{
    array_of, callout_box, push_rule_lines, scalar_text, source_box, str_of, title_box,
    RenderContext,
};
use crate::spec::{ChartSpec, SeriesSpec, ShapeSpec, SlideKind, SlideSpec};
use deckforge_model::{Block, BlockKey, Rect, RunContext};
use deckforge_template::ChartKind;
use serde_json::Value;

pub(crate) fn render(
    block: &Block,
    ctx: &RenderContext<'_>,
    _run: &mut RunContext,
) -> Result<SlideSpec> {
    if ctx.layout.charts.is_empty() {
        return Err(PptxError::missing_geometry(block.key.as_str(), "chart"));
    }

    let extracted = extract_chart_data(block)?;

    let mut slide = SlideSpec::new(SlideKind::Content)
        .with_block_key(block.key.as_str())
        .with_template_slide(ctx.template_slide);

    slide.push(ShapeSpec::TextBox(title_box(ctx.contract, &block.title)));
    push_rule_lines(&mut slide, ctx.contract);

    let dual = block
        .route
        .as_ref()
        .is_some_and(|r| r.pattern == "chart_callout_dual")
        && ctx.layout.charts.len() >= 2
        && extracted.series.len() >= 2;

    if dual {
        // Split series across the two designed rectangles
        let split = extracted.series.len() / 2;
        let (left, right) = extracted.series.split_at(split.max(1));

        slide.push(ShapeSpec::Chart(ChartSpec {
            kind: chart_kind_for(block.key),
            title: extracted.title.clone(),
            categories: extracted.categories.clone(),
            series: left.to_vec(),
            rect: ctx.layout.charts[0],
        }));
        slide.push(ShapeSpec::Chart(ChartSpec {
            kind: secondary_chart_kind(block.key),
            title: format!("{} (detail)", extracted.title),
            categories: extracted.categories.clone(),
            series: right.to_vec(),
            rect: ctx.layout.charts[1],
        }));
    } else {
        slide.push(ShapeSpec::Chart(ChartSpec {
            kind: chart_kind_for(block.key),
            title: extracted.title.clone(),
            categories: extracted.categories.clone(),
            series: extracted.series.clone(),
            rect: ctx.layout.charts[0],
        }));
    }

    // Right 40%: insight panels
    if !dual {
        push_insight_panels(&mut slide, block, ctx);
    }

    slide.push(ShapeSpec::TextBox(source_box(
        ctx.contract,
        ctx.layout,
        &block.citations,
        block.data_quality,
    )));

    Ok(slide)
}

struct ExtractedChart {
    title: String,
    categories: Vec<String>,
    series: Vec<SeriesSpec>,
}

/// Chart flavor per market key
fn chart_kind_for(key: BlockKey) -> ChartKind {
    match key {
        BlockKey::Tpes => ChartKind::StackedBar,
        BlockKey::FinalDemand => ChartKind::Bar,
        BlockKey::Electricity => ChartKind::Line,
        BlockKey::GasLng => ChartKind::Bar,
        BlockKey::Pricing => ChartKind::Line,
        BlockKey::EscoMarket => ChartKind::Pie,
        _ => ChartKind::Bar,
    }
}

/// The second chart of a dual slide trends over time
fn secondary_chart_kind(key: BlockKey) -> ChartKind {
    match key {
        BlockKey::GasLng => ChartKind::Line,
        _ => ChartKind::Line,
    }
}

/// Chart title derived from block key and unit
fn chart_title(block: &Block) -> String {
    let unit = str_of(&block.data, &["unit", "units"]);
    match unit {
        Some(unit) => format!("{} ({})", block.key.default_title(), unit),
        None => block.key.default_title().to_string(),
    }
}

/// Accepts either a flat `series: [{label|year, value}]` list or the
/// multi-series `{labels: [...], series: [{name, values|dataPoints}]}` shape.
fn extract_chart_data(block: &Block) -> Result<ExtractedChart> {
    let data = &block.data;
    let title = chart_title(block);

    // Multi-series shape first
    if let (Some(labels), Some(series_list)) = (
        array_of(data, &["labels", "categories"]),
        array_of(data, &["series"]),
    ) {
        if series_list.iter().all(|s| s.is_object()) {
            let categories: Vec<String> = labels.iter().map(scalar_text).collect();
            let series: Vec<SeriesSpec> = series_list
                .iter()
                .filter_map(|s| {
                    let name = str_of(s, &["name", "label"]).unwrap_or("Series").to_string();
                    let values = array_of(s, &["values", "dataPoints", "data"])?;
                    Some(SeriesSpec {
                        name,
                        values: values.iter().filter_map(Value::as_f64).collect(),
                    })
                })
                .filter(|s| !s.values.is_empty())
                .collect();

            if !series.is_empty() {
                return Ok(ExtractedChart {
                    title,
                    categories,
                    series,
                });
            }
        }
    }

    // Flat point list
    if let Some(points) = array_of(data, &["series", "dataPoints", "values", "segments"]) {
        let mut categories = Vec::new();
        let mut values = Vec::new();
        for point in points {
            match point {
                Value::Object(_) => {
                    let label = point
                        .get("label")
                        .or_else(|| point.get("year"))
                        .or_else(|| point.get("period"))
                        .or_else(|| point.get("name"))
                        .map(scalar_text)
                        .unwrap_or_default();
                    let value = point
                        .get("value")
                        .or_else(|| point.get("amount"))
                        .or_else(|| point.get("share"))
                        .and_then(Value::as_f64);
                    if let Some(value) = value {
                        categories.push(label);
                        values.push(value);
                    }
                }
                Value::Number(n) => {
                    categories.push(format!("{}", categories.len() + 1));
                    values.push(n.as_f64().unwrap_or(0.0));
                }
                _ => {}
            }
        }

        if !values.is_empty() {
            let name = str_of(data, &["seriesName", "unit"]).unwrap_or("Value").to_string();
            return Ok(ExtractedChart {
                title,
                categories,
                series: vec![SeriesSpec { name, values }],
            });
        }
    }

    Err(PptxError::invalid_payload(
        block.key.as_str(),
        "no chartable series in payload",
    ))
}

/// Right-hand insight panels, up to three, stacked vertically
fn push_insight_panels(slide: &mut SlideSpec, block: &Block, ctx: &RenderContext<'_>) {
    let Some(insights) = array_of(&block.data, &["insights", "keyPoints", "highlights"]) else {
        return;
    };

    let texts: Vec<String> = insights
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(_) => str_of(item, &["text", "insight", "point"]).map(str::to_string),
            _ => None,
        })
        .take(3)
        .collect();

    if texts.is_empty() {
        return;
    }

    let chart_right = ctx.layout.charts[0].right();
    let panel_x = chart_right + 0.2;
    let panel_w = ctx.layout.content.right() - panel_x;
    if panel_w < 1.5 {
        return;
    }

    let top = ctx.layout.charts[0].y;
    let total_h = ctx.layout.charts[0].h;
    let gap = 0.15;
    let panel_h = (total_h - gap * (texts.len() as f64 - 1.0)) / texts.len() as f64;

    for (i, text) in texts.iter().enumerate() {
        let y = top + i as f64 * (panel_h + gap);
        slide.push(ShapeSpec::TextBox(callout_box(
            ctx.contract,
            Rect::new(panel_x, y, panel_w, panel_h),
            &format!("Insight {}", i + 1),
            text,
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block_with(data: Value) -> Block {
        Block::new(BlockKey::Tpes, data)
    }

    #[test]
    fn test_extract_flat_points() {
        let block = block_with(json!({
            "series": [
                {"year": 2020, "value": 90.1},
                {"year": 2021, "value": 95.2}
            ],
            "unit": "Mtoe"
        }));

        let extracted = extract_chart_data(&block).unwrap();
        assert_eq!(extracted.categories, vec!["2020", "2021"]);
        assert_eq!(extracted.series.len(), 1);
        assert_eq!(extracted.series[0].values, vec![90.1, 95.2]);
        assert!(extracted.title.contains("Mtoe"));
    }

    #[test]
    fn test_extract_multi_series() {
        let block = block_with(json!({
            "labels": ["2020", "2021"],
            "series": [
                {"name": "Coal", "values": [40.0, 38.5]},
                {"name": "Gas", "values": [22.0, 25.1]}
            ]
        }));

        let extracted = extract_chart_data(&block).unwrap();
        assert_eq!(extracted.series.len(), 2);
        assert_eq!(extracted.series[1].name, "Gas");
    }

    #[test]
    fn test_extract_plain_numbers() {
        let block = block_with(json!({"values": [1.0, 2.0, 3.0]}));
        let extracted = extract_chart_data(&block).unwrap();
        assert_eq!(extracted.series[0].values.len(), 3);
    }

    #[test]
    fn test_no_series_is_error() {
        let block = block_with(json!({"unit": "Mtoe"}));
        assert!(extract_chart_data(&block).is_err());
    }

    #[test]
    fn test_chart_kinds() {
        assert_eq!(chart_kind_for(BlockKey::Tpes), ChartKind::StackedBar);
        assert_eq!(chart_kind_for(BlockKey::EscoMarket), ChartKind::Pie);
        assert_eq!(chart_kind_for(BlockKey::Pricing), ChartKind::Line);
    }
}
