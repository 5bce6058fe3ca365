//! Typed environment configuration.
//!
//! Every knob has a default and a clamped bound, enforced once at pipeline
//! start. Hot paths never touch `std::env`.

use serde::{Deserialize, Serialize};

/// Render compaction modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactionMode {
    Off,
    #[default]
    Bounded,
    Legacy,
}

/// Table flex modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlexMode {
    Off,
    #[default]
    Bounded,
}

/// Pipeline configuration, parsed once from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Throw on any fidelity warning
    pub strict_template_fidelity: bool,

    /// Compaction limits mode
    pub render_compaction_mode: CompactionMode,

    /// Table flex recovery mode
    pub table_flex_mode: FlexMode,

    /// Max horizontal table stretch
    pub table_flex_max_width_scale: f64,

    /// Max vertical table stretch
    pub table_flex_max_height_scale: f64,

    /// Row-height floor (inches)
    pub table_flex_min_row_height: f64,

    /// Col-width floor (inches)
    pub table_flex_min_col_width: f64,

    /// Row cap before auto-trim
    pub table_flex_max_rows: usize,

    /// Col cap before auto-trim
    pub table_flex_max_cols: usize,

    /// Variant width-nudge cap
    pub table_variant_max_width_delta: f64,

    /// Variant height-nudge cap
    pub table_variant_max_height_delta: f64,

    /// Narrative-rewrite iterations
    pub table_rethink_max_passes: usize,

    /// Minimum chars per non-divider slide
    pub ppt_sparse_slide_char_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_template_fidelity: true,
            render_compaction_mode: CompactionMode::Bounded,
            table_flex_mode: FlexMode::Bounded,
            table_flex_max_width_scale: 1.55,
            table_flex_max_height_scale: 1.50,
            table_flex_min_row_height: 0.16,
            table_flex_min_col_width: 0.58,
            table_flex_max_rows: 16,
            table_flex_max_cols: 9,
            table_variant_max_width_delta: 0.10,
            table_variant_max_height_delta: 0.12,
            table_rethink_max_passes: 2,
            ppt_sparse_slide_char_threshold: 60,
        }
    }
}

impl Config {
    /// Parse from the process environment
    pub fn from_env() -> Self {
        Self::parse(|name| std::env::var(name).ok())
    }

    /// Parse from an arbitrary lookup. Out-of-range values are clamped to
    /// their bound; unparseable values fall back to the default.
    pub fn parse(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Config::default();

        Self {
            strict_template_fidelity: parse_bool(
                lookup("STRICT_TEMPLATE_FIDELITY"),
                d.strict_template_fidelity,
            ),
            render_compaction_mode: parse_compaction(
                lookup("RENDER_COMPACTION_MODE"),
                d.render_compaction_mode,
            ),
            table_flex_mode: parse_flex(lookup("TABLE_FLEX_MODE"), d.table_flex_mode),
            table_flex_max_width_scale: parse_f64(
                lookup("TABLE_FLEX_MAX_WIDTH_SCALE"),
                d.table_flex_max_width_scale,
                1.0,
                1.6,
            ),
            table_flex_max_height_scale: parse_f64(
                lookup("TABLE_FLEX_MAX_HEIGHT_SCALE"),
                d.table_flex_max_height_scale,
                1.0,
                1.8,
            ),
            table_flex_min_row_height: parse_f64(
                lookup("TABLE_FLEX_MIN_ROW_HEIGHT"),
                d.table_flex_min_row_height,
                0.10,
                0.28,
            ),
            table_flex_min_col_width: parse_f64(
                lookup("TABLE_FLEX_MIN_COL_WIDTH"),
                d.table_flex_min_col_width,
                0.35,
                1.0,
            ),
            table_flex_max_rows: parse_usize(
                lookup("TABLE_FLEX_MAX_ROWS"),
                d.table_flex_max_rows,
                4,
                40,
            ),
            table_flex_max_cols: parse_usize(
                lookup("TABLE_FLEX_MAX_COLS"),
                d.table_flex_max_cols,
                3,
                20,
            ),
            table_variant_max_width_delta: parse_f64(
                lookup("TABLE_VARIANT_MAX_WIDTH_DELTA"),
                d.table_variant_max_width_delta,
                0.05,
                0.35,
            ),
            table_variant_max_height_delta: parse_f64(
                lookup("TABLE_VARIANT_MAX_HEIGHT_DELTA"),
                d.table_variant_max_height_delta,
                0.05,
                0.35,
            ),
            table_rethink_max_passes: parse_usize(
                lookup("TABLE_RETHINK_MAX_PASSES"),
                d.table_rethink_max_passes,
                1,
                4,
            ),
            ppt_sparse_slide_char_threshold: parse_usize(
                lookup("PPT_SPARSE_SLIDE_CHAR_THRESHOLD"),
                d.ppt_sparse_slide_char_threshold,
                20,
                120,
            ),
        }
    }

    /// Strict geometry policy: recovery, fallback mappings, and audit
    /// warnings are hard errors
    pub fn strict_geometry(&self) -> bool {
        self.strict_template_fidelity
    }
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim) {
        Some("true") | Some("1") | Some("yes") => true,
        Some("false") | Some("0") | Some("no") => false,
        _ => default,
    }
}

fn parse_compaction(value: Option<String>, default: CompactionMode) -> CompactionMode {
    match value.as_deref().map(str::trim) {
        Some("off") => CompactionMode::Off,
        Some("bounded") => CompactionMode::Bounded,
        Some("legacy") => CompactionMode::Legacy,
        _ => default,
    }
}

fn parse_flex(value: Option<String>, default: FlexMode) -> FlexMode {
    match value.as_deref().map(str::trim) {
        Some("off") => FlexMode::Off,
        Some("bounded") => FlexMode::Bounded,
        _ => default,
    }
}

fn parse_f64(value: Option<String>, default: f64, min: f64, max: f64) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|v| v.clamp(min, max))
        .unwrap_or(default)
}

fn parse_usize(value: Option<String>, default: usize, min: usize, max: usize) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map(|v| v.clamp(min, max))
        .unwrap_or(default)
}
