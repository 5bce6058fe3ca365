//! Bounded table flex: fitting arbitrary rows into a template-anchored
//! rectangle.
//!
//! Policy, in order: bounded scaling (a variant matrix nudges the raw
//! pressure scale within fixed deltas), violation recovery (strict throws,
//! bounded trims to capacity with a summary row), a fit-score pre-flight,
//! then density compaction with a narrative "rethink" pass for cells that
//! overflow their character budget. Hard truncation is the last resort and
//! is always logged.

use crate::error::{PptxError, Result};
use deckforge_core::text::truncate_chars;
use deckforge_model::{Config, FlexMode, RecoveryKind, Rect, TableRecovery};
use deckforge_template::TemplateTableStyleProfile;
use regex::Regex;
use std::sync::OnceLock;

/// Safety ceiling on rethink passes regardless of configuration
const RETHINK_HARD_CEILING: usize = 6;

/// Severe overflow factor that qualifies a cell for narrative rethink
const RETHINK_TRIGGER_FACTOR: f64 = 2.2;

/// Pressure bands the variant matrix is indexed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressureBand {
    Std,
    Mini,
    Soft,
    Plus,
    Max,
}

impl PressureBand {
    fn of(pressure: f64) -> Self {
        if pressure <= 1.0 {
            PressureBand::Std
        } else if pressure <= 1.15 {
            PressureBand::Mini
        } else if pressure <= 1.3 {
            PressureBand::Soft
        } else if pressure <= 1.6 {
            PressureBand::Plus
        } else {
            PressureBand::Max
        }
    }

    fn index(&self) -> usize {
        match self {
            PressureBand::Std => 0,
            PressureBand::Mini => 1,
            PressureBand::Soft => 2,
            PressureBand::Plus => 3,
            PressureBand::Max => 4,
        }
    }
}

/// Additive `(width_nudge, height_nudge)` deltas, indexed by
/// `[row_band][col_band]`. Row pressure pushes height, column pressure
/// pushes width; the diagonal grows both.
const VARIANT_MATRIX: [[(f64, f64); 5]; 5] = [
    // row: std
    [
        (0.00, 0.00),
        (0.02, 0.00),
        (0.04, 0.00),
        (0.06, 0.00),
        (0.08, 0.00),
    ],
    // row: mini
    [
        (0.00, 0.02),
        (0.02, 0.02),
        (0.04, 0.03),
        (0.06, 0.03),
        (0.08, 0.04),
    ],
    // row: soft
    [
        (0.00, 0.04),
        (0.02, 0.04),
        (0.05, 0.05),
        (0.07, 0.06),
        (0.09, 0.06),
    ],
    // row: plus
    [
        (0.00, 0.07),
        (0.03, 0.07),
        (0.05, 0.08),
        (0.08, 0.09),
        (0.10, 0.10),
    ],
    // row: max
    [
        (0.00, 0.10),
        (0.03, 0.10),
        (0.06, 0.11),
        (0.09, 0.12),
        (0.10, 0.12),
    ],
];

/// Fit recommendation from the pre-flight score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitRecommendation {
    Standard,
    Compact,
    Truncate,
    Fallback,
}

impl FitRecommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitRecommendation::Standard => "standard",
            FitRecommendation::Compact => "compact",
            FitRecommendation::Truncate => "truncate",
            FitRecommendation::Fallback => "fallback",
        }
    }
}

/// The 0-100 fit score and its sub-scores
#[derive(Debug, Clone, Copy)]
pub struct FitScore {
    pub row_score: f64,
    pub col_score: f64,
    pub geometry_score: f64,
    pub density_score: f64,
}

impl FitScore {
    /// Mean of the four sub-scores, clamped to 0-100
    pub fn total(&self) -> f64 {
        let mean = (self.row_score + self.col_score + self.geometry_score + self.density_score)
            / 4.0;
        mean.clamp(0.0, 100.0)
    }

    /// The recommendation band the total falls into
    pub fn recommendation(&self) -> FitRecommendation {
        let total = self.total();
        if total >= 90.0 {
            FitRecommendation::Standard
        } else if total >= 70.0 {
            FitRecommendation::Compact
        } else if total >= 40.0 {
            FitRecommendation::Truncate
        } else {
            FitRecommendation::Fallback
        }
    }
}

/// Flex input: rows plus the template anchors they must fit
#[derive(Debug, Clone)]
pub struct FlexInput<'a> {
    /// Block key, for diagnostics
    pub key: &'a str,

    /// All rows including the header
    pub rows: Vec<Vec<String>>,

    /// Template-anchored table rectangle
    pub expected_rect: Rect,

    /// Content rectangle the table may grow into
    pub content_rect: Rect,

    /// Y of the source line; the table must stop 0.02" above it
    pub source_y: f64,

    /// Style profile carrying the designed baseline
    pub profile: &'a TemplateTableStyleProfile,
}

/// Flex outcome: adjusted rows and final geometry
#[derive(Debug, Clone)]
pub struct FlexOutcome {
    pub rows: Vec<Vec<String>>,
    pub rect: Rect,
    pub row_height: f64,
    pub col_width: f64,
    pub fit: FitScore,

    /// Recoveries to record on the run
    pub recoveries: Vec<TableRecovery>,

    /// Capacity fallbacks to record on the run
    pub fallbacks: Vec<TableRecovery>,
}

/// Fit rows into the template rectangle under the configured policy.
///
/// `strict` selects strict-geometry behavior: violations and low fit scores
/// throw instead of trimming, and density overflow is rewritten rather than
/// clipped.
pub fn flex_table(input: FlexInput<'_>, config: &Config, strict: bool) -> Result<FlexOutcome> {
    let mut rows = input.rows;
    let mut recoveries = Vec::new();
    let mut fallbacks = Vec::new();

    if config.table_flex_mode == FlexMode::Off {
        let rect = input.expected_rect;
        let (row_height, col_width) = cell_geometry(&rect, &rows);
        let fit = score(&rows, row_height, col_width, config);
        enforce_cell_ceiling(&mut rows);
        return Ok(FlexOutcome {
            rows,
            rect,
            row_height,
            col_width,
            fit,
            recoveries,
            fallbacks,
        });
    }

    // ---- 1. Bounded scale --------------------------------------------------
    let row_count = rows.len().max(1);
    let col_count = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);

    let row_pressure = row_count as f64 / input.profile.baseline_rows.max(1) as f64;
    let col_pressure = col_count as f64 / input.profile.baseline_cols.max(1) as f64;

    let (raw_width_nudge, raw_height_nudge) =
        VARIANT_MATRIX[PressureBand::of(row_pressure).index()][PressureBand::of(col_pressure).index()];
    let width_nudge = raw_width_nudge.min(config.table_variant_max_width_delta);
    let height_nudge = raw_height_nudge.min(config.table_variant_max_height_delta);

    let pressure_width_scale = col_pressure.max(1.0);
    let pressure_height_scale = row_pressure.max(1.0);

    let width_scale = (pressure_width_scale + width_nudge).min(config.table_flex_max_width_scale);
    let height_scale =
        (pressure_height_scale + height_nudge).min(config.table_flex_max_height_scale);

    let mut rect = input.expected_rect;
    rect.w *= width_scale;
    rect.h *= height_scale;

    // Clamp the top-right corner into the content rectangle and the bottom
    // above the source line
    if rect.right() > input.content_rect.right() {
        rect.w = input.content_rect.right() - rect.x;
    }
    let bottom_limit = input.source_y - 0.02;
    if rect.bottom() > bottom_limit {
        rect.h = bottom_limit - rect.y;
    }

    // ---- 2. Violation recovery ---------------------------------------------
    let (row_height, col_width) = cell_geometry(&rect, &rows);
    let violations = collect_violations(
        row_count,
        col_count,
        row_height,
        col_width,
        raw_width_nudge,
        raw_height_nudge,
        config,
    );

    if !violations.is_empty() {
        if strict {
            return Err(PptxError::FlexViolations {
                key: input.key.to_string(),
                violations,
            });
        }
        apply_capacity_trim(&mut rows, config, input.key, &mut fallbacks, &mut recoveries);
    }

    // ---- 3. Fit-score pre-flight -------------------------------------------
    let (row_height, col_width) = cell_geometry(&rect, &rows);
    let fit = score(&rows, row_height, col_width, config);

    match fit.recommendation() {
        FitRecommendation::Standard | FitRecommendation::Compact => {}
        rec @ (FitRecommendation::Truncate | FitRecommendation::Fallback) => {
            if strict {
                return Err(PptxError::FitRejected {
                    key: input.key.to_string(),
                    score: fit.total(),
                    recommendation: rec.as_str(),
                });
            }
            apply_capacity_trim(&mut rows, config, input.key, &mut fallbacks, &mut recoveries);
        }
    }

    // ---- 4. Density compaction + rethink -----------------------------------
    let (row_height, col_width) = cell_geometry(&rect, &rows);
    let cap = cell_char_budget(row_height, col_width);
    compact_density(
        &mut rows,
        cap,
        config,
        strict,
        input.key,
        &mut recoveries,
    );

    enforce_cell_ceiling(&mut rows);

    let (row_height, col_width) = cell_geometry(&rect, &rows);
    let fit = score(&rows, row_height, col_width, config);

    Ok(FlexOutcome {
        rows,
        rect,
        row_height,
        col_width,
        fit,
        recoveries,
        fallbacks,
    })
}

/// Final row height and column width for a rect and row set
fn cell_geometry(rect: &Rect, rows: &[Vec<String>]) -> (f64, f64) {
    let row_count = rows.len().max(1);
    let col_count = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
    (rect.h / row_count as f64, rect.w / col_count as f64)
}

fn collect_violations(
    row_count: usize,
    col_count: usize,
    row_height: f64,
    col_width: f64,
    raw_width_nudge: f64,
    raw_height_nudge: f64,
    config: &Config,
) -> Vec<String> {
    let mut violations = Vec::new();

    if row_count > config.table_flex_max_rows {
        violations.push(format!(
            "rowCount {} exceeds max {}",
            row_count, config.table_flex_max_rows
        ));
    }
    if col_count > config.table_flex_max_cols {
        violations.push(format!(
            "colCount {} exceeds max {}",
            col_count, config.table_flex_max_cols
        ));
    }
    if row_height < config.table_flex_min_row_height - 0.005 {
        violations.push(format!(
            "rowHeight {:.3} below floor {:.2}",
            row_height, config.table_flex_min_row_height
        ));
    }
    if col_width < config.table_flex_min_col_width - 0.01 {
        violations.push(format!(
            "colWidth {:.3} below floor {:.2}",
            col_width, config.table_flex_min_col_width
        ));
    }
    if raw_width_nudge > config.table_variant_max_width_delta {
        violations.push(format!(
            "variant width delta {:.2} exceeds budget {:.2}",
            raw_width_nudge, config.table_variant_max_width_delta
        ));
    }
    if raw_height_nudge > config.table_variant_max_height_delta {
        violations.push(format!(
            "variant height delta {:.2} exceeds budget {:.2}",
            raw_height_nudge, config.table_variant_max_height_delta
        ));
    }

    violations
}

/// Trim rows to `MAX_ROWS - 1` plus a capacity summary row, and slice columns
/// past `MAX_COLS`. The only automatic shape mutation permitted.
fn apply_capacity_trim(
    rows: &mut Vec<Vec<String>>,
    config: &Config,
    key: &str,
    fallbacks: &mut Vec<TableRecovery>,
    recoveries: &mut Vec<TableRecovery>,
) {
    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);

    if col_count > config.table_flex_max_cols {
        let dropped = col_count - config.table_flex_max_cols;
        for row in rows.iter_mut() {
            row.truncate(config.table_flex_max_cols);
        }
        fallbacks.push(TableRecovery {
            block_key: key.to_string(),
            recovery_type: RecoveryKind::BoundedFlex,
            detail: format!("{} column(s) sliced past capacity", dropped),
        });
    }

    if rows.len() > config.table_flex_max_rows {
        let keep = config.table_flex_max_rows - 1;
        let excess = rows.len() - keep;
        rows.truncate(keep);

        let summary = format!("+{} more items (table capacity exceeded)", excess);
        rows.push(vec![summary]);

        fallbacks.push(TableRecovery {
            block_key: key.to_string(),
            recovery_type: RecoveryKind::BoundedFlex,
            detail: format!("{} row(s) folded into capacity summary", excess),
        });
        recoveries.push(TableRecovery {
            block_key: key.to_string(),
            recovery_type: RecoveryKind::BoundedFlex,
            detail: "capacity summary row appended".to_string(),
        });

        log::warn!("table '{}' trimmed to capacity ({} rows folded)", key, excess);
    }
}

/// Per-cell character budget derived from final cell geometry
fn cell_char_budget(row_height: f64, col_width: f64) -> usize {
    let lines = (row_height / 0.16).floor().max(1.0);
    let chars_per_line = (col_width * 20.0).max(12.0);
    ((lines * chars_per_line) as usize).max(60)
}

/// The fit score for a row set at final geometry
fn score(rows: &[Vec<String>], row_height: f64, col_width: f64, config: &Config) -> FitScore {
    let row_count = rows.len();
    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);

    let row_score = axis_score(row_count, config.table_flex_max_rows, 12.0);
    let col_score = axis_score(col_count, config.table_flex_max_cols, 15.0);

    let geometry_score = {
        let rh = (row_height / config.table_flex_min_row_height) * 100.0;
        let cw = (col_width / config.table_flex_min_col_width) * 100.0;
        rh.min(cw).min(100.0).max(0.0)
    };

    let cell_count: usize = rows.iter().map(Vec::len).sum();
    let char_count: usize = rows.iter().flatten().map(|c| c.chars().count()).sum();
    let avg = if cell_count == 0 {
        0.0
    } else {
        char_count as f64 / cell_count as f64
    };
    let density_score = if avg <= 220.0 {
        100.0
    } else if avg <= 360.0 {
        80.0
    } else {
        (80.0 - (avg - 360.0) / 10.0).max(0.0)
    };

    FitScore {
        row_score,
        col_score,
        geometry_score,
        density_score,
    }
}

fn axis_score(count: usize, max: usize, penalty: f64) -> f64 {
    if count > max {
        (100.0 - penalty * (count - max) as f64).max(0.0)
    } else if count as f64 > 0.8 * max as f64 {
        80.0
    } else {
        100.0
    }
}

/// Density pass: find overflowing cells and either truncate (lenient) or
/// rethink then truncate as last resort (strict).
fn compact_density(
    rows: &mut [Vec<String>],
    cap: usize,
    config: &Config,
    strict: bool,
    key: &str,
    recoveries: &mut Vec<TableRecovery>,
) {
    if !strict {
        for row in rows.iter_mut() {
            for cell in row.iter_mut() {
                if cell.chars().count() > cap {
                    *cell = truncate_chars(cell, cap);
                }
            }
        }
        return;
    }

    let passes = config
        .table_rethink_max_passes
        .min(RETHINK_HARD_CEILING)
        .max(1);

    for row in rows.iter_mut() {
        for cell in row.iter_mut() {
            let len = cell.chars().count();
            if len as f64 <= RETHINK_TRIGGER_FACTOR * cap as f64 {
                continue;
            }

            let mut current = cell.clone();
            for _ in 0..passes {
                if current.chars().count() <= cap {
                    break;
                }
                current = rethink(&current, cap);
            }

            if current.chars().count() != len {
                recoveries.push(TableRecovery {
                    block_key: key.to_string(),
                    recovery_type: RecoveryKind::Rethink,
                    detail: format!("cell rewritten {} -> {} chars", len, current.chars().count()),
                });
            }

            if current.chars().count() > cap {
                current = truncate_chars(&current, cap);
                recoveries.push(TableRecovery {
                    block_key: key.to_string(),
                    recovery_type: RecoveryKind::DensityTruncate,
                    detail: format!("cell hard-truncated to {} chars", cap),
                });
            }

            *cell = current;
        }
    }
}

fn filler_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(it is important to note that|it should be noted that|in order to|due to the fact that|for the purpose of|as a matter of fact|at this point in time|with regard to)\b",
        )
        .expect("filler regex is valid")
    })
}

fn keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(cagr|target|deadline|risk|cost|investment|revenue)\b")
            .expect("keyword regex is valid")
    })
}

/// One narrative compression pass: strip filler, keep the highest-signal
/// sentences up to 90% of the budget, then drop words from the end.
///
/// English-specific by construction: the filler and keyword lists are not
/// translatable one-to-one.
fn rethink(text: &str, cap: usize) -> String {
    let stripped = filler_regex().replace_all(text, "");
    let stripped = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    let sentences: Vec<&str> = split_sentences(&stripped);

    let selected = if sentences.len() > 1 {
        let mut scored: Vec<(i32, usize, &str)> = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| (sentence_score(s), i, *s))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let budget = (cap as f64 * 0.9) as usize;
        let mut picked: Vec<(usize, &str)> = Vec::new();
        let mut used = 0usize;
        for (_, idx, sentence) in &scored {
            let len = sentence.chars().count() + 1;
            if used + len > budget && !picked.is_empty() {
                continue;
            }
            picked.push((*idx, sentence));
            used += len;
            if used >= budget {
                break;
            }
        }
        // Restore original order
        picked.sort_by_key(|(idx, _)| *idx);
        picked
            .into_iter()
            .map(|(_, s)| s)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        stripped.clone()
    };

    // Word-drop until under budget
    let mut words: Vec<&str> = selected.split_whitespace().collect();
    let mut result = words.join(" ");
    while result.chars().count() > cap && words.len() > 1 {
        words.pop();
        result = words.join(" ");
    }

    result
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') {
            let segment = text[start..=i].trim();
            if !segment.is_empty() {
                out.push(segment);
            }
            start = i + 1;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Signal score for one sentence: numbers and financial keywords keep it,
/// raw length costs it.
fn sentence_score(sentence: &str) -> i32 {
    let mut score = 0;

    if sentence.chars().any(|c| c.is_ascii_digit()) {
        score += 3;
    }
    if sentence.chars().any(|c| matches!(c, '%' | '$' | '\u{20AC}' | '\u{00A5}')) {
        score += 2;
    }
    // An all-caps token of >= 2 chars (acronyms, tickers)
    if sentence.split_whitespace().any(|w| {
        let letters: Vec<char> = w.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        letters.len() >= 2 && letters.iter().all(|c| c.is_ascii_uppercase())
    }) {
        score += 1;
    }
    if keyword_regex().is_match(sentence) {
        score += 2;
    }
    if sentence.chars().count() > 220 {
        score -= 1;
    }

    score
}

/// Enforce the absolute cell ceiling the writer guarantees
fn enforce_cell_ceiling(rows: &mut [Vec<String>]) {
    for row in rows.iter_mut() {
        for cell in row.iter_mut() {
            if cell.chars().count() > crate::constants::TABLE_CELL_MAX_CHARS {
                *cell = truncate_chars(cell, crate::constants::TABLE_CELL_MAX_CHARS);
            }
        }
    }
}
