//! Derived table style profiles.
//!
//! The reference deck's table styling is summarized per slide into a profile
//! the writer consumes: cell margins, vertical alignment, inner and outer
//! borders, and the designed row/column baseline the flex engine measures
//! pressure against. Profiles are cached per slide number for one run.

use crate::contract::{TemplateContract, TemplateLayout};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Vertical alignment inside table cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellVAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

impl CellVAlign {
    /// OOXML anchor attribute value
    pub fn anchor_attr(&self) -> &'static str {
        match self {
            CellVAlign::Top => "t",
            CellVAlign::Middle => "ctr",
            CellVAlign::Bottom => "b",
        }
    }
}

/// A border specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderSpec {
    /// Width in EMU
    pub width_emu: i64,

    /// Dash style ("solid", "dash")
    pub dash: String,

    /// Hex RGB color
    pub color: String,
}

/// Cell margins in inches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl CellMargins {
    /// Normalize a margin value that may be mis-unit (points instead of
    /// inches). Margins are always under 2 inches; anything larger is
    /// treated as points and divided by 72.
    pub fn normalize_value(value: f64) -> f64 {
        if value > 2.0 {
            value / 72.0
        } else {
            value
        }
    }

    /// Normalize every side
    pub fn normalized(self) -> Self {
        Self {
            left: Self::normalize_value(self.left),
            right: Self::normalize_value(self.right),
            top: Self::normalize_value(self.top),
            bottom: Self::normalize_value(self.bottom),
        }
    }
}

/// The table style profile derived for one template slide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateTableStyleProfile {
    /// Cell margins (inches, normalized)
    pub margins: CellMargins,

    /// Vertical alignment
    pub valign: CellVAlign,

    /// Inner gridlines
    pub inner_border: BorderSpec,

    /// Outer frame
    pub outer_border: BorderSpec,

    /// Designed row count
    pub baseline_rows: usize,

    /// Designed column count
    pub baseline_cols: usize,
}

impl TemplateTableStyleProfile {
    /// Derive a profile from the contract for one slide's layout
    pub fn derive(contract: &TemplateContract, layout: &TemplateLayout) -> Self {
        let (baseline_rows, baseline_cols) = layout
            .table
            .map(|t| (t.baseline_rows, t.baseline_cols))
            .unwrap_or((6, 4));

        Self {
            margins: CellMargins {
                left: 0.06,
                right: 0.06,
                top: 0.03,
                bottom: 0.03,
            }
            .normalized(),
            valign: CellVAlign::Middle,
            inner_border: BorderSpec {
                width_emu: 6_350,
                dash: "solid".to_string(),
                color: contract.palette.table_border.clone(),
            },
            outer_border: BorderSpec {
                width_emu: contract.outer_border_width_emu,
                dash: "solid".to_string(),
                color: contract.palette.primary.clone(),
            },
            baseline_rows,
            baseline_cols,
        }
    }
}

/// Per-run cache of derived profiles, keyed by template slide number.
#[derive(Debug, Default)]
pub struct StyleProfileCache {
    cache: HashMap<u32, TemplateTableStyleProfile>,
}

impl StyleProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile for a slide, deriving and caching on first use
    pub fn profile_for(
        &mut self,
        contract: &TemplateContract,
        slide: u32,
        layout: &TemplateLayout,
    ) -> &TemplateTableStyleProfile {
        self.cache
            .entry(slide)
            .or_insert_with(|| TemplateTableStyleProfile::derive(contract, layout))
    }

    /// Number of cached profiles
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// True when nothing is cached yet
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_normalization() {
        // Inches stay put
        assert_eq!(CellMargins::normalize_value(0.06), 0.06);
        assert_eq!(CellMargins::normalize_value(1.9), 1.9);

        // Points get divided by 72
        assert!((CellMargins::normalize_value(7.2) - 0.1).abs() < 1e-9);
        assert!((CellMargins::normalize_value(36.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_profile_derivation() {
        let contract = TemplateContract::default();
        let layout = contract.layout(10).unwrap();
        let profile = TemplateTableStyleProfile::derive(&contract, layout);

        assert_eq!(profile.baseline_rows, 7);
        assert_eq!(profile.baseline_cols, 5);
        assert_eq!(profile.outer_border.width_emu, 38_100);
        assert!(profile.margins.left < 2.0);
    }

    #[test]
    fn test_cache_reuses_profiles() {
        let contract = TemplateContract::default();
        let layout = contract.layout(10).unwrap().clone();
        let mut cache = StyleProfileCache::new();

        assert!(cache.is_empty());
        let _ = cache.profile_for(&contract, 10, &layout);
        let _ = cache.profile_for(&contract, 10, &layout);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_valign_anchor_attr() {
        assert_eq!(CellVAlign::Top.anchor_attr(), "t");
        assert_eq!(CellVAlign::Middle.anchor_attr(), "ctr");
    }
}
