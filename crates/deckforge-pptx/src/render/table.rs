//! Shared table assembly: flex the rows, then lay out a table frame.

use crate::error::{PptxError, Result};
use crate::flex::{flex_table, FlexInput};
use crate::render::RenderContext;
use crate::spec::{CellSpec, TableFrameSpec};
use deckforge_core::text::safe_cell;
use deckforge_model::{Block, RunContext};
use deckforge_template::StyleProfileCache;

/// Flex `header + body` rows into the routed slide's table rectangle and
/// produce the frame spec. Column widths follow `weights`, renormalized over
/// the surviving columns.
pub(crate) fn flexed_table(
    block: &Block,
    ctx: &RenderContext<'_>,
    run: &mut RunContext,
    styles: &mut StyleProfileCache,
    header: Vec<String>,
    body: Vec<Vec<String>>,
    weights: &[f64],
) -> Result<TableFrameSpec> {
    let geometry = ctx
        .layout
        .table
        .ok_or_else(|| PptxError::missing_geometry(block.key.as_str(), "table"))?;

    let profile = styles
        .profile_for(ctx.contract, ctx.template_slide, ctx.layout)
        .clone();

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(body.len() + 1);
    rows.push(
        header
            .iter()
            .map(|h| safe_cell(h, Some(40), ctx.strict))
            .collect(),
    );
    for row in body {
        rows.push(
            row.iter()
                .map(|c| safe_cell(c, Some(260), ctx.strict))
                .collect(),
        );
    }

    let outcome = flex_table(
        FlexInput {
            key: block.key.as_str(),
            rows,
            expected_rect: geometry.rect,
            content_rect: ctx.layout.content,
            source_y: ctx.layout.source.y,
            profile: &profile,
        },
        &run.config,
        ctx.strict,
    )?;

    for recovery in outcome.recoveries {
        run.metrics.record_recovery(recovery);
    }
    for fallback in outcome.fallbacks {
        run.metrics.record_fallback(fallback);
    }

    let col_count = outcome.rows.iter().map(Vec::len).max().unwrap_or(1);
    let col_widths = distribute_widths(outcome.rect.w, weights, col_count);

    let mut cells: Vec<Vec<CellSpec>> = Vec::with_capacity(outcome.rows.len());
    for (i, row) in outcome.rows.iter().enumerate() {
        let mut spec_row: Vec<CellSpec> = Vec::with_capacity(row.len());
        let span_all = row.len() == 1 && col_count > 1;
        for text in row {
            let mut cell = if i == 0 {
                CellSpec::header(text.clone())
                    .with_fill(ctx.contract.palette.table_header_bg.clone())
                    .with_color(ctx.contract.palette.table_header_text.clone())
            } else {
                CellSpec::text(text.clone())
            };
            cell.span_all = span_all;
            spec_row.push(cell);
        }
        cells.push(spec_row);
    }

    Ok(TableFrameSpec {
        rect: outcome.rect,
        col_widths,
        row_height: outcome.row_height,
        rows: cells,
        header: true,
        style: profile,
    })
}

/// Renormalize weights over `col_count` columns and scale to `total` inches
fn distribute_widths(total: f64, weights: &[f64], col_count: usize) -> Vec<f64> {
    let used: Vec<f64> = if weights.len() >= col_count {
        weights[..col_count].to_vec()
    } else {
        // Pad missing weights evenly
        let mut w = weights.to_vec();
        w.resize(col_count, 1.0 / col_count.max(1) as f64);
        w
    };

    let sum: f64 = used.iter().sum();
    if sum <= 0.0 {
        return vec![total / col_count.max(1) as f64; col_count];
    }
    used.iter().map(|w| total * w / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribute_widths_renormalizes() {
        let widths = distribute_widths(10.0, &[0.5, 0.3, 0.2], 3);
        assert!((widths.iter().sum::<f64>() - 10.0).abs() < 1e-9);
        assert!((widths[0] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribute_widths_fewer_cols() {
        // Capacity trim can drop columns; widths renormalize over survivors
        let widths = distribute_widths(10.0, &[0.5, 0.3, 0.2], 2);
        assert_eq!(widths.len(), 2);
        assert!((widths.iter().sum::<f64>() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribute_widths_more_cols_than_weights() {
        let widths = distribute_widths(12.0, &[0.6], 3);
        assert_eq!(widths.len(), 3);
        assert!((widths.iter().sum::<f64>() - 12.0).abs() < 1e-9);
    }
}
