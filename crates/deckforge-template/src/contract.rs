//! The template contract: what the reference deck looks like.
//!
//! Extracted offline from the reference presentation and compiled in as the
//! default; a JSON file with the same shape can override it. Rectangles are
//! inches-based. Some slides have no table or chart rectangle - the router
//! leans on that to decide where a block may land.

use deckforge_model::Rect;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Chart flavor a chart rectangle was extracted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    StackedBar,
    Line,
    Pie,
}

/// Table geometry on a template slide
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableGeometry {
    /// Anchor rectangle (inches)
    pub rect: Rect,

    /// Row count of the table as designed
    pub baseline_rows: usize,

    /// Column count of the table as designed
    pub baseline_cols: usize,
}

/// Geometry record for one template slide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLayout {
    /// Title rectangle
    pub title: Rect,

    /// Content rectangle
    pub content: Rect,

    /// Source-line rectangle
    pub source: Rect,

    /// Table anchor, when the slide carries a designed table
    #[serde(default)]
    pub table: Option<TableGeometry>,

    /// Chart anchors, when the slide carries designed charts
    #[serde(default)]
    pub charts: Vec<Rect>,
}

impl TemplateLayout {
    /// True when the slide has a designed table rectangle
    pub fn has_table(&self) -> bool {
        self.table.is_some()
    }

    /// True when the slide has at least one designed chart rectangle
    pub fn has_chart(&self) -> bool {
        !self.charts.is_empty()
    }
}

/// A named routing pattern: the ranked template slides it may use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    /// Ranked 1-based slide numbers; first is the pattern's primary
    pub template_slides: Vec<u32>,
}

/// Reference color palette (hex RGB, no `#`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePalette {
    pub primary: String,
    pub secondary: String,
    pub accent_green: String,
    pub accent_red: String,
    pub accent_orange: String,
    pub text: String,
    pub background: String,
    pub table_header_bg: String,
    pub table_header_text: String,
    pub table_border: String,
    pub table_alt_row: String,
}

impl Default for StylePalette {
    fn default() -> Self {
        Self {
            primary: "1F3864".to_string(),
            secondary: "2E74B5".to_string(),
            accent_green: "70AD47".to_string(),
            accent_red: "C00000".to_string(),
            accent_orange: "ED7D31".to_string(),
            text: "404040".to_string(),
            background: "FFFFFF".to_string(),
            table_header_bg: "1F3864".to_string(),
            table_header_text: "FFFFFF".to_string(),
            table_border: "BFBFBF".to_string(),
            table_alt_row: "F2F2F2".to_string(),
        }
    }
}

/// The full template contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateContract {
    /// Pattern name -> ranked slides
    pub patterns: BTreeMap<String, Pattern>,

    /// 1-based slide number -> geometry record
    #[serde(with = "slide_keyed")]
    pub layouts: BTreeMap<u32, TemplateLayout>,

    /// Block keys that require table geometry
    pub table_context_keys: BTreeSet<String>,

    /// Block keys that require chart geometry
    pub chart_context_keys: BTreeSet<String>,

    /// Block key -> primary pattern name
    pub primary_routes: BTreeMap<String, String>,

    /// Pattern used when a key has no primary route
    pub default_pattern: String,

    /// Section input key -> divider slide number (plus "appendix")
    pub section_divider_slides: BTreeMap<String, u32>,

    /// Fixed structural slides
    pub cover_slide: u32,
    pub toc_slide: u32,
    pub exec_summary_slide: u32,
    pub appendix_toc_slide: u32,
    pub closing_slide: u32,

    /// Reference slide size (EMU)
    pub slide_width_emu: i64,
    pub slide_height_emu: i64,

    /// Palette and typefaces
    pub palette: StylePalette,
    pub major_font: String,
    pub minor_font: String,

    /// Connector-line widths the reference deck uses (EMU)
    pub expected_line_widths_emu: Vec<i64>,

    /// Header rule Y offset (EMU)
    pub header_line_y_emu: i64,

    /// Footer rule Y offset (EMU)
    pub footer_line_y_emu: i64,

    /// Designed table outer border width (EMU)
    pub outer_border_width_emu: i64,
}

/// Slide-number maps serialize with string keys so the contract stays
/// representable in both JSON and TOML
mod slide_keyed {
    use super::TemplateLayout;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<u32, TemplateLayout>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let stringly: BTreeMap<String, &TemplateLayout> =
            map.iter().map(|(k, v)| (k.to_string(), v)).collect();
        stringly.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<u32, TemplateLayout>, D::Error> {
        let stringly = BTreeMap::<String, TemplateLayout>::deserialize(deserializer)?;
        stringly
            .into_iter()
            .map(|(k, v)| {
                k.parse::<u32>()
                    .map(|k| (k, v))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

impl TemplateContract {
    /// Load a contract from JSON text
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Load a contract from TOML text (user-facing override format)
    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// The layout record for a slide, if any
    pub fn layout(&self, slide: u32) -> Option<&TemplateLayout> {
        self.layouts.get(&slide)
    }

    /// The pattern a block key primarily routes to
    pub fn primary_pattern_for(&self, key: &str) -> &str {
        self.primary_routes
            .get(key)
            .map(String::as_str)
            .unwrap_or(self.default_pattern.as_str())
    }

    /// Divider slide for a section input key
    pub fn divider_slide(&self, section_key: &str) -> Option<u32> {
        self.section_divider_slides.get(section_key).copied()
    }
}

impl Default for TemplateContract {
    fn default() -> Self {
        let title = Rect::new(0.45, 0.28, 12.43, 0.72);
        let content = Rect::new(0.45, 1.15, 12.43, 5.45);
        let source = Rect::new(0.45, 6.95, 9.0, 0.35);

        let plain = TemplateLayout {
            title,
            content,
            source,
            table: None,
            charts: Vec::new(),
        };

        let table_slide = |rows: usize, cols: usize| TemplateLayout {
            title,
            content,
            source,
            table: Some(TableGeometry {
                rect: Rect::new(0.5, 1.4, 12.3, 4.9),
                baseline_rows: rows,
                baseline_cols: cols,
            }),
            charts: Vec::new(),
        };

        let chart_slide = TemplateLayout {
            title,
            content,
            source,
            table: None,
            charts: vec![Rect::new(0.5, 1.3, 7.4, 5.0)],
        };

        let dual_chart_slide = TemplateLayout {
            title,
            content,
            source,
            table: None,
            charts: vec![
                Rect::new(0.5, 1.3, 6.0, 5.0),
                Rect::new(6.75, 1.3, 6.0, 5.0),
            ],
        };

        let mut layouts = BTreeMap::new();
        layouts.insert(1, plain.clone()); // cover
        layouts.insert(2, plain.clone()); // toc
        layouts.insert(3, plain.clone()); // executive summary
        layouts.insert(4, table_slide(6, 3)); // opportunities & barriers pair
        layouts.insert(5, plain.clone()); // divider: policy
        layouts.insert(6, table_slide(6, 4)); // regulation table
        layouts.insert(7, table_slide(8, 5)); // wide table
        layouts.insert(8, chart_slide.clone()); // chart + callout
        layouts.insert(9, dual_chart_slide); // dual chart
        layouts.insert(10, table_slide(7, 5)); // company table
        layouts.insert(11, plain.clone()); // divider: market
        layouts.insert(12, chart_slide.clone()); // chart + callout (alt)
        layouts.insert(13, chart_slide.clone()); // composition chart
        layouts.insert(14, chart_slide); // financial chart
        layouts.insert(15, table_slide(5, 3)); // compact table
        layouts.insert(16, plain.clone()); // text + callout
        layouts.insert(17, plain.clone()); // divider: competitors
        layouts.insert(18, plain.clone()); // case study
        layouts.insert(19, table_slide(6, 3)); // summary matrix
        layouts.insert(20, plain.clone()); // divider: depth
        layouts.insert(21, table_slide(6, 3)); // paired summary (alt)
        layouts.insert(22, plain.clone()); // appendix toc
        layouts.insert(23, plain.clone()); // closing
        layouts.insert(24, plain); // divider: appendix

        let mut patterns = BTreeMap::new();
        let p = |slides: &[u32]| Pattern {
            template_slides: slides.to_vec(),
        };
        patterns.insert("cover".to_string(), p(&[1]));
        patterns.insert("toc".to_string(), p(&[2]));
        patterns.insert("exec_summary".to_string(), p(&[3]));
        patterns.insert("paired_summary".to_string(), p(&[4, 21]));
        patterns.insert("divider".to_string(), p(&[5, 11, 17, 20, 24]));
        patterns.insert("regulation_table".to_string(), p(&[6, 7]));
        patterns.insert("table_standard".to_string(), p(&[10, 7, 15]));
        patterns.insert("table_wide".to_string(), p(&[7, 10]));
        patterns.insert("chart_callout".to_string(), p(&[8, 12, 13, 14]));
        patterns.insert("chart_callout_dual".to_string(), p(&[9, 8]));
        patterns.insert("case_study".to_string(), p(&[18, 16]));
        patterns.insert("text_callout".to_string(), p(&[16, 18]));
        patterns.insert("summary_matrix".to_string(), p(&[19, 21]));
        patterns.insert("appendix_toc".to_string(), p(&[22]));
        patterns.insert("closing".to_string(), p(&[23]));

        let table_context_keys: BTreeSet<String> = [
            "foundationalActs",
            "keyIncentives",
            "investmentRestrictions",
            "japanesePlayers",
            "localMajor",
            "foreignPlayers",
            "partnerAssessment",
            "goNoGo",
            "opportunitiesObstacles",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let chart_context_keys: BTreeSet<String> = [
            "tpes",
            "finalDemand",
            "electricity",
            "gasLng",
            "pricing",
            "escoMarket",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut primary_routes = BTreeMap::new();
        let r = |key: &str, pattern: &str| (key.to_string(), pattern.to_string());
        for (key, pattern) in [
            r("foundationalActs", "regulation_table"),
            r("keyIncentives", "regulation_table"),
            r("investmentRestrictions", "regulation_table"),
            r("japanesePlayers", "table_wide"),
            r("localMajor", "table_wide"),
            r("foreignPlayers", "table_wide"),
            r("partnerAssessment", "table_standard"),
            r("tpes", "chart_callout"),
            r("finalDemand", "chart_callout"),
            r("electricity", "chart_callout"),
            r("gasLng", "chart_callout_dual"),
            r("pricing", "chart_callout"),
            r("escoMarket", "chart_callout"),
            r("caseStudy", "case_study"),
            r("lessonsLearned", "text_callout"),
            r("goNoGo", "summary_matrix"),
            r("opportunitiesObstacles", "paired_summary"),
            r("keyInsights", "text_callout"),
            r("timingIntelligence", "text_callout"),
        ] {
            primary_routes.insert(key, pattern);
        }

        let mut section_divider_slides = BTreeMap::new();
        section_divider_slides.insert("policy".to_string(), 5);
        section_divider_slides.insert("market".to_string(), 11);
        section_divider_slides.insert("competitors".to_string(), 17);
        section_divider_slides.insert("depth".to_string(), 20);
        section_divider_slides.insert("appendix".to_string(), 24);

        Self {
            patterns,
            layouts,
            table_context_keys,
            chart_context_keys,
            primary_routes,
            default_pattern: "table_standard".to_string(),
            section_divider_slides,
            cover_slide: 1,
            toc_slide: 2,
            exec_summary_slide: 3,
            appendix_toc_slide: 22,
            closing_slide: 23,
            slide_width_emu: 12_192_000,
            slide_height_emu: 6_858_000,
            palette: StylePalette::default(),
            major_font: "Segoe UI".to_string(),
            minor_font: "Segoe UI".to_string(),
            expected_line_widths_emu: vec![6_350, 12_700],
            header_line_y_emu: 960_120,   // 1.05"
            footer_line_y_emu: 6_291_072, // 6.88"
            outer_border_width_emu: 38_100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_contract_is_internally_consistent() {
        let contract = TemplateContract::default();

        // Every pattern slide has a layout record
        for (name, pattern) in &contract.patterns {
            for slide in &pattern.template_slides {
                assert!(
                    contract.layout(*slide).is_some(),
                    "pattern '{}' references slide {} with no layout",
                    name,
                    slide
                );
            }
        }

        // Every primary route names a real pattern
        for (key, pattern) in &contract.primary_routes {
            assert!(
                contract.patterns.contains_key(pattern),
                "route for '{}' names unknown pattern '{}'",
                key,
                pattern
            );
        }

        assert!(contract.patterns.contains_key(&contract.default_pattern));
    }

    #[test]
    fn test_table_routes_reach_table_geometry() {
        let contract = TemplateContract::default();

        for key in &contract.table_context_keys {
            let pattern_name = contract.primary_pattern_for(key);
            let pattern = &contract.patterns[pattern_name];
            let satisfied = pattern
                .template_slides
                .iter()
                .any(|s| contract.layout(*s).is_some_and(TemplateLayout::has_table));
            assert!(satisfied, "no table slide reachable for '{}'", key);
        }
    }

    #[test]
    fn test_chart_routes_reach_chart_geometry() {
        let contract = TemplateContract::default();

        for key in &contract.chart_context_keys {
            let pattern_name = contract.primary_pattern_for(key);
            let pattern = &contract.patterns[pattern_name];
            let satisfied = pattern
                .template_slides
                .iter()
                .any(|s| contract.layout(*s).is_some_and(TemplateLayout::has_chart));
            assert!(satisfied, "no chart slide reachable for '{}'", key);
        }
    }

    #[test]
    fn test_dual_chart_slide_has_two_rects() {
        let contract = TemplateContract::default();
        let dual = &contract.patterns["chart_callout_dual"].template_slides[0];
        assert_eq!(contract.layout(*dual).unwrap().charts.len(), 2);
    }

    #[test]
    fn test_contract_json_roundtrip() {
        let contract = TemplateContract::default();
        let json = serde_json::to_string(&contract).unwrap();
        let restored = TemplateContract::from_json(&json).unwrap();
        assert_eq!(contract, restored);
    }

    #[test]
    fn test_contract_toml_roundtrip() {
        let contract = TemplateContract::default();
        let text = toml::to_string(&contract).unwrap();
        let restored = TemplateContract::from_toml(&text).unwrap();
        assert_eq!(contract, restored);
    }

    #[test]
    fn test_divider_slides() {
        let contract = TemplateContract::default();
        assert_eq!(contract.divider_slide("policy"), Some(5));
        assert_eq!(contract.divider_slide("appendix"), Some(24));
        assert_eq!(contract.divider_slide("nonexistent"), None);
    }
}
