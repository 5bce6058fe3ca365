//! Run-level metrics and the per-run context.
//!
//! The pipeline is a pure function modulo I/O; everything it learns along the
//! way accumulates here and is attached to the output buffer as the
//! `pptMetrics` side channel. One `RunContext` per `generate` call - there is
//! no process-wide mutable state.

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What kind of recovery the flex engine applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryKind {
    /// Rows/columns trimmed to capacity with a summary row
    BoundedFlex,
    /// A cell hard-truncated after rethink passes were exhausted
    DensityTruncate,
    /// Narrative compression rewrote a cell under its budget
    Rethink,
}

impl RecoveryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryKind::BoundedFlex => "bounded-flex",
            RecoveryKind::DensityTruncate => "density-truncate",
            RecoveryKind::Rethink => "rethink",
        }
    }
}

/// One recovery applied by the table flex engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRecovery {
    /// Block key of the owning slide
    pub block_key: String,

    /// Recovery applied
    pub recovery_type: RecoveryKind,

    /// Free-form detail (rows trimmed, cell coordinates, chars dropped)
    pub detail: String,
}

/// One per-slide rendering failure replaced by a placeholder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideRenderFailure {
    /// Block key of the failed slide
    pub block_key: String,

    /// Error description
    pub error: String,
}

/// Template clone overlay statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloneStats {
    /// Generated slides that received a template overlay
    pub slides_overlaid: usize,

    /// Support parts (media, charts) copied from the reference deck
    pub parts_copied: usize,
}

/// The `pptMetrics` side channel of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PptMetrics {
    /// Strict geometry policy in force
    pub strict_geometry_mode: bool,

    /// Percentage of blocks that routed to their primary template slide
    pub template_coverage_pct: f64,

    /// Flex recoveries applied (bounded mode only)
    pub table_recoveries: Vec<TableRecovery>,

    /// Capacity fallbacks applied (bounded mode only)
    pub table_fallbacks: Vec<TableRecovery>,

    /// Per-slide render failures replaced by placeholders
    pub slide_render_failures: Vec<SlideRenderFailure>,

    /// Whether the geometry audit ran
    pub geometry_check: bool,

    /// Whether the geometry audit found the slide size aligned
    pub geometry_aligned: bool,

    /// Largest slide-size delta observed, in EMU
    pub geometry_max_delta_emu: i64,

    /// Formatting-audit critical issue count
    pub formatting_critical_count: usize,

    /// Formatting-audit warning count
    pub formatting_warning_count: usize,

    /// Stable codes of the formatting issues found
    pub formatting_issue_codes: Vec<String>,

    /// Configured sparse-slide character threshold
    pub sparse_slide_threshold: usize,

    /// Keys whose routing source string contains "fallback"
    pub fallback_template_mappings: Vec<String>,

    /// Clone overlay stats
    pub clone_stats: CloneStats,

    /// Pattern name -> use count over the run
    pub template_usage: BTreeMap<String, u32>,
}

impl PptMetrics {
    pub fn new(config: &Config) -> Self {
        Self {
            strict_geometry_mode: config.strict_geometry(),
            template_coverage_pct: 0.0,
            table_recoveries: Vec::new(),
            table_fallbacks: Vec::new(),
            slide_render_failures: Vec::new(),
            geometry_check: false,
            geometry_aligned: false,
            geometry_max_delta_emu: 0,
            formatting_critical_count: 0,
            formatting_warning_count: 0,
            formatting_issue_codes: Vec::new(),
            sparse_slide_threshold: config.ppt_sparse_slide_char_threshold,
            fallback_template_mappings: Vec::new(),
            clone_stats: CloneStats::default(),
            template_usage: BTreeMap::new(),
        }
    }

    /// Record a pattern use
    pub fn record_template_use(&mut self, pattern: &str) {
        *self.template_usage.entry(pattern.to_string()).or_insert(0) += 1;
    }

    /// Record a flex recovery
    pub fn record_recovery(&mut self, recovery: TableRecovery) {
        self.table_recoveries.push(recovery);
    }

    /// Record a capacity fallback
    pub fn record_fallback(&mut self, fallback: TableRecovery) {
        self.table_fallbacks.push(fallback);
    }

    /// Record a per-slide render failure
    pub fn record_render_failure(&mut self, block_key: &str, error: impl Into<String>) {
        self.slide_render_failures.push(SlideRenderFailure {
            block_key: block_key.to_string(),
            error: error.into(),
        });
    }
}

/// Per-run pipeline context: configuration plus accumulated metrics.
///
/// Passed through every stage by `&mut`; dropped when the run ends.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Parsed configuration, fixed for the run
    pub config: Config,

    /// Accumulated metrics
    pub metrics: PptMetrics,
}

impl RunContext {
    pub fn new(config: Config) -> Self {
        let metrics = PptMetrics::new(&config);
        Self { config, metrics }
    }

    /// Strict geometry policy in force for this run
    pub fn strict(&self) -> bool {
        self.config.strict_geometry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_from_config() {
        let metrics = PptMetrics::new(&Config::default());
        assert!(metrics.strict_geometry_mode);
        assert_eq!(metrics.sparse_slide_threshold, 60);
        assert!(metrics.table_recoveries.is_empty());
    }

    #[test]
    fn test_template_usage_counts() {
        let mut metrics = PptMetrics::new(&Config::default());
        metrics.record_template_use("table_standard");
        metrics.record_template_use("table_standard");
        metrics.record_template_use("chart_callout");

        assert_eq!(metrics.template_usage["table_standard"], 2);
        assert_eq!(metrics.template_usage["chart_callout"], 1);
    }

    #[test]
    fn test_recovery_kind_strings() {
        assert_eq!(RecoveryKind::BoundedFlex.as_str(), "bounded-flex");
        assert_eq!(RecoveryKind::DensityTruncate.as_str(), "density-truncate");
    }

    #[test]
    fn test_run_context() {
        let ctx = RunContext::new(Config::default());
        assert!(ctx.strict());
    }
}
