//! Formatting auditor: asserts template-contract invariants on the final
//! package.
//!
//! Reads the produced slides, layouts, and masters and checks slide size,
//! header/footer rule geometry, line-width signature, cell margins, anchor
//! distribution, outer border presence, and text-run density. Severity is
//! reported as-is; the caller decides what a warning means for the run
//! (strict mode promotes every warning to a hard error).

use crate::archive::PackageArchive;
use crate::error::Result;

/// Audit issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSeverity {
    /// The run must not ship
    Critical,
    /// Fidelity is degraded; strict mode treats this as critical
    Warning,
}

/// One audit finding
#[derive(Debug, Clone)]
pub struct AuditIssue {
    /// Stable code (e.g. "SLIDE_SIZE", "HEADER_LINE_Y")
    pub code: &'static str,

    /// Severity as designed; strict promotion happens at the caller
    pub severity: AuditSeverity,

    /// Part the issue was found in, when applicable
    pub part: Option<String>,

    /// Human-readable detail
    pub message: String,
}

/// What the reference deck looks like, for comparison
#[derive(Debug, Clone)]
pub struct AuditExpectations {
    pub slide_width_emu: i64,
    pub slide_height_emu: i64,
    pub header_line_y_emu: i64,
    pub footer_line_y_emu: i64,
    pub expected_line_widths_emu: Vec<i64>,
    pub outer_border_width_emu: i64,

    /// Expected cell margin in EMU (the largest designed side)
    pub expected_margin_emu: i64,
}

/// Audit outcome
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub issues: Vec<AuditIssue>,

    /// Whether the slide size matched within tolerance
    pub geometry_aligned: bool,

    /// Largest slide-size delta observed (EMU)
    pub geometry_max_delta_emu: i64,
}

impl AuditReport {
    /// True when any critical issue was found
    pub fn has_critical(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == AuditSeverity::Critical)
    }

    /// Count of critical issues
    pub fn critical_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == AuditSeverity::Critical)
            .count()
    }

    /// Count of warnings
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == AuditSeverity::Warning)
            .count()
    }

    /// All distinct issue codes, in order of first appearance
    pub fn codes(&self) -> Vec<String> {
        let mut codes = Vec::new();
        for issue in &self.issues {
            if !codes.iter().any(|c| c == issue.code) {
                codes.push(issue.code.to_string());
            }
        }
        codes
    }

    fn push(
        &mut self,
        code: &'static str,
        severity: AuditSeverity,
        part: Option<String>,
        message: impl Into<String>,
    ) {
        self.issues.push(AuditIssue {
            code,
            severity,
            part,
            message: message.into(),
        });
    }
}

/// Slide-size tolerance (EMU)
const SLIDE_SIZE_TOLERANCE: i64 = 1_200;

/// Rule-line hard tolerance (EMU); the 500..=2500 band is a warning
const LINE_Y_TOLERANCE: i64 = 2_500;
const LINE_Y_WARN_BAND: i64 = 500;

/// Top-anchor ratio above which the deck has drifted from the template
const TOP_ANCHOR_WARN_RATIO: f64 = 0.85;

/// Text density ceilings
const LONG_RUN_CHARS: usize = 900;
const LONG_CELL_CHARS: usize = 620;

/// Run the full formatting audit over a final buffer
pub fn audit_formatting(buffer: &[u8], expect: &AuditExpectations) -> Result<AuditReport> {
    let package = PackageArchive::from_bytes(buffer)?;
    let mut report = AuditReport::default();

    check_slide_size(&package, expect, &mut report)?;
    check_rule_lines(&package, expect, &mut report)?;
    check_line_width_signature(&package, expect, &mut report)?;
    check_cell_margins(&package, expect, &mut report)?;
    check_anchor_distribution(&package, &mut report)?;
    check_outer_border(&package, expect, &mut report)?;
    check_text_density(&package, &mut report)?;

    log::debug!(
        "formatting audit: {} critical, {} warning",
        report.critical_count(),
        report.warning_count()
    );

    Ok(report)
}

fn check_slide_size(
    package: &PackageArchive,
    expect: &AuditExpectations,
    report: &mut AuditReport,
) -> Result<()> {
    let presentation = package.require_text("ppt/presentation.xml")?;

    let cx = attr_value(&presentation, "<p:sldSz", "cx")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);
    let cy = attr_value(&presentation, "<p:sldSz", "cy")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);

    let dw = (cx - expect.slide_width_emu).abs();
    let dh = (cy - expect.slide_height_emu).abs();
    report.geometry_max_delta_emu = dw.max(dh);
    report.geometry_aligned = dw <= SLIDE_SIZE_TOLERANCE && dh <= SLIDE_SIZE_TOLERANCE;

    if !report.geometry_aligned {
        report.push(
            "SLIDE_SIZE",
            AuditSeverity::Critical,
            Some("ppt/presentation.xml".to_string()),
            format!(
                "slide size {}x{} deviates from reference {}x{} by more than {} EMU",
                cx, cy, expect.slide_width_emu, expect.slide_height_emu, SLIDE_SIZE_TOLERANCE
            ),
        );
    }
    Ok(())
}

fn check_rule_lines(
    package: &PackageArchive,
    expect: &AuditExpectations,
    report: &mut AuditReport,
) -> Result<()> {
    for slide_part in package.slide_parts() {
        let Some(xml) = package.get_text(&slide_part)? else {
            continue;
        };

        // Divider/cover style slides carry no rules; only audit slides that
        // have connector shapes at all
        let lines = connector_offsets(&xml);
        if lines.is_empty() {
            continue;
        }

        for (role, expected_y, code) in [
            ("header", expect.header_line_y_emu, "HEADER_LINE_Y"),
            ("footer", expect.footer_line_y_emu, "FOOTER_LINE_Y"),
        ] {
            let closest = lines
                .iter()
                .map(|y| (y - expected_y).abs())
                .min()
                .unwrap_or(i64::MAX);

            if closest > LINE_Y_TOLERANCE {
                report.push(
                    code,
                    AuditSeverity::Critical,
                    Some(slide_part.clone()),
                    format!(
                        "{role} rule drifted {closest} EMU from expected y={expected_y}"
                    ),
                );
            } else if closest > LINE_Y_WARN_BAND {
                report.push(
                    code,
                    AuditSeverity::Warning,
                    Some(slide_part.clone()),
                    format!("{role} rule {closest} EMU off expected y={expected_y}"),
                );
            }
        }
    }
    Ok(())
}

fn check_line_width_signature(
    package: &PackageArchive,
    expect: &AuditExpectations,
    report: &mut AuditReport,
) -> Result<()> {
    let mut found: std::collections::BTreeSet<i64> = std::collections::BTreeSet::new();

    for part in package.part_names() {
        if !(part.starts_with("ppt/slideLayouts/slideLayout")
            || part.starts_with("ppt/slideMasters/slideMaster"))
            || !part.ends_with(".xml")
        {
            continue;
        }
        if let Some(xml) = package.get_text(part)? {
            for width in all_attr_values(&xml, "<a:ln", "w") {
                if let Ok(width) = width.parse::<i64>() {
                    found.insert(width);
                }
            }
        }
    }

    for expected in &expect.expected_line_widths_emu {
        if !found.contains(expected) {
            report.push(
                "LINE_WIDTH_SIGNATURE",
                AuditSeverity::Warning,
                None,
                format!(
                    "expected line width {} EMU absent from layouts and masters (found {:?})",
                    expected, found
                ),
            );
        }
    }
    Ok(())
}

fn check_cell_margins(
    package: &PackageArchive,
    expect: &AuditExpectations,
    report: &mut AuditReport,
) -> Result<()> {
    let threshold = (20 * expect.expected_margin_emu).max(1_200_000);

    for slide_part in package.slide_parts() {
        let Some(xml) = package.get_text(&slide_part)? else {
            continue;
        };

        for attr in ["marL", "marR"] {
            for value in all_attr_values(&xml, "<a:tcPr", attr) {
                if let Ok(value) = value.parse::<i64>() {
                    if value > threshold {
                        report.push(
                            "CELL_MARGIN_OUTLIER",
                            AuditSeverity::Critical,
                            Some(slide_part.clone()),
                            format!(
                                "cell margin {attr}={value} EMU exceeds outlier threshold {threshold}"
                            ),
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_anchor_distribution(
    package: &PackageArchive,
    report: &mut AuditReport,
) -> Result<()> {
    let mut top = 0usize;
    let mut total = 0usize;

    for slide_part in package.slide_parts() {
        let Some(xml) = package.get_text(&slide_part)? else {
            continue;
        };
        for value in all_attr_values_any(&xml, "anchor") {
            total += 1;
            if value == "t" {
                top += 1;
            }
        }
    }

    if total > 0 {
        let ratio = top as f64 / total as f64;
        if ratio > TOP_ANCHOR_WARN_RATIO {
            report.push(
                "ANCHOR_DISTRIBUTION",
                AuditSeverity::Warning,
                None,
                format!(
                    "top-anchor ratio {:.0}% exceeds {:.0}% of {} anchors",
                    ratio * 100.0,
                    TOP_ANCHOR_WARN_RATIO * 100.0,
                    total
                ),
            );
        }
    }
    Ok(())
}

fn check_outer_border(
    package: &PackageArchive,
    expect: &AuditExpectations,
    report: &mut AuditReport,
) -> Result<()> {
    let needle = format!("w=\"{}\"", expect.outer_border_width_emu);

    let mut has_table = false;
    for slide_part in package.slide_parts() {
        if let Some(xml) = package.get_text(&slide_part)? {
            if xml.contains("<a:tbl>") {
                has_table = true;
                if xml.contains(&needle) {
                    return Ok(());
                }
            }
        }
    }

    if has_table {
        report.push(
            "OUTER_BORDER_MISSING",
            AuditSeverity::Warning,
            None,
            format!(
                "designed outer border width {} EMU not detected on any table",
                expect.outer_border_width_emu
            ),
        );
    }
    Ok(())
}

fn check_text_density(package: &PackageArchive, report: &mut AuditReport) -> Result<()> {
    for slide_part in package.slide_parts() {
        let Some(xml) = package.get_text(&slide_part)? else {
            continue;
        };

        for run in text_runs(&xml) {
            if run.chars().count() > LONG_RUN_CHARS {
                report.push(
                    "LONG_TEXT_RUN",
                    AuditSeverity::Warning,
                    Some(slide_part.clone()),
                    format!("text run of {} chars exceeds {}", run.chars().count(), LONG_RUN_CHARS),
                );
            }
        }

        for cell in cell_blocks(&xml) {
            let text: String = text_runs(cell).concat();
            if text.chars().count() > LONG_CELL_CHARS {
                report.push(
                    "LONG_TABLE_CELL",
                    AuditSeverity::Warning,
                    Some(slide_part.clone()),
                    format!(
                        "table cell text of {} chars exceeds {}",
                        text.chars().count(),
                        LONG_CELL_CHARS
                    ),
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Lightweight XML scanning helpers
// ---------------------------------------------------------------------------

/// First value of `attr` on the first element starting with `element_prefix`
pub(crate) fn attr_value<'a>(xml: &'a str, element_prefix: &str, attr: &str) -> Option<&'a str> {
    let start = xml.find(element_prefix)?;
    let slice = &xml[start..];
    let end = slice.find('>')?;
    let element = &slice[..end];
    let needle = format!("{attr}=\"");
    let pos = element.find(&needle)? + needle.len();
    let rest = &element[pos..];
    let quote = rest.find('"')?;
    Some(&rest[..quote])
}

/// All values of `attr` on every element starting with `element_prefix`
pub(crate) fn all_attr_values<'a>(xml: &'a str, element_prefix: &str, attr: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(pos) = rest.find(element_prefix) {
        let slice = &rest[pos..];
        let Some(end) = slice.find('>') else { break };
        let element = &slice[..end];
        let needle = format!("{attr}=\"");
        if let Some(vpos) = element.find(&needle) {
            let value = &element[vpos + needle.len()..];
            if let Some(quote) = value.find('"') {
                out.push(&value[..quote]);
            }
        }
        rest = &rest[pos + end..];
    }
    out
}

/// All values of a bare attribute anywhere in the document
pub(crate) fn all_attr_values_any<'a>(xml: &'a str, attr: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let needle = format!(" {attr}=\"");
    let mut rest = xml;
    while let Some(pos) = rest.find(&needle) {
        let value = &rest[pos + needle.len()..];
        if let Some(quote) = value.find('"') {
            out.push(&value[..quote]);
            rest = &value[quote..];
        } else {
            break;
        }
    }
    out
}

/// Y offsets of every connector shape on a slide
fn connector_offsets(xml: &str) -> Vec<i64> {
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(pos) = rest.find("<p:cxnSp>") {
        let slice = &rest[pos..];
        let end = slice.find("</p:cxnSp>").unwrap_or(slice.len());
        let block = &slice[..end];
        if let Some(y) = attr_value(block, "<a:off", "y").and_then(|v| v.parse::<i64>().ok()) {
            out.push(y);
        }
        rest = &slice[end..];
    }
    out
}

/// Every `<a:t>` text payload on a slide
pub(crate) fn text_runs(xml: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(pos) = rest.find("<a:t>") {
        let value = &rest[pos + 5..];
        if let Some(end) = value.find("</a:t>") {
            out.push(&value[..end]);
            rest = &value[end..];
        } else {
            break;
        }
    }
    out
}

/// Every `<a:tc ...>...</a:tc>` block on a slide
fn cell_blocks(xml: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(pos) = rest.find("<a:tc") {
        let slice = &rest[pos..];
        if let Some(end) = slice.find("</a:tc>") {
            out.push(&slice[..end]);
            rest = &slice[end..];
        } else {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expectations() -> AuditExpectations {
        AuditExpectations {
            slide_width_emu: 12_192_000,
            slide_height_emu: 6_858_000,
            header_line_y_emu: 960_120,
            footer_line_y_emu: 6_291_072,
            expected_line_widths_emu: vec![6_350, 12_700],
            outer_border_width_emu: 38_100,
            expected_margin_emu: 54_864,
        }
    }

    fn base_package() -> PackageArchive {
        let mut package = PackageArchive::new();
        package.set_text(
            "ppt/presentation.xml",
            r#"<p:presentation><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#,
        );
        package.set_text(
            "ppt/slideMasters/slideMaster1.xml",
            r#"<p:sldMaster><a:ln w="6350"/><a:ln w="12700"/></p:sldMaster>"#,
        );
        package
    }

    fn audit(package: &PackageArchive) -> AuditReport {
        let bytes = package.to_bytes().unwrap();
        audit_formatting(&bytes, &expectations()).unwrap()
    }

    #[test]
    fn test_clean_package_passes() {
        let mut package = base_package();
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><p:cxnSp><a:off x="411480" y="960120"/><a:ln w="12700"/></p:cxnSp><p:cxnSp><a:off x="411480" y="6291072"/><a:ln w="6350"/></p:cxnSp><a:t>enough body text here</a:t></p:sld>"#,
        );

        let report = audit(&package);
        assert!(!report.has_critical(), "issues: {:?}", report.issues);
        assert!(report.geometry_aligned);
        assert_eq!(report.geometry_max_delta_emu, 0);
    }

    #[test]
    fn test_slide_size_drift_is_critical() {
        let mut package = base_package();
        package.set_text(
            "ppt/presentation.xml",
            r#"<p:presentation><p:sldSz cx="12192000" cy="6855000"/></p:presentation>"#,
        );

        let report = audit(&package);
        assert!(report.has_critical());
        assert!(report.codes().contains(&"SLIDE_SIZE".to_string()));
        assert_eq!(report.geometry_max_delta_emu, 3_000);
    }

    #[test]
    fn test_header_line_drift_bands() {
        // 1000 EMU off: warning band
        let mut package = base_package();
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><p:cxnSp><a:off x="0" y="961120"/><a:ln w="12700"/></p:cxnSp><p:cxnSp><a:off x="0" y="6291072"/><a:ln w="6350"/></p:cxnSp></p:sld>"#,
        );
        let report = audit(&package);
        assert!(!report.has_critical());
        assert_eq!(report.warning_count(), 1);

        // 10000 EMU off: critical
        let mut package = base_package();
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><p:cxnSp><a:off x="0" y="970120"/><a:ln w="12700"/></p:cxnSp><p:cxnSp><a:off x="0" y="6291072"/><a:ln w="6350"/></p:cxnSp></p:sld>"#,
        );
        let report = audit(&package);
        assert!(report.has_critical());
    }

    #[test]
    fn test_missing_line_width_signature_warns() {
        let mut package = base_package();
        package.set_text(
            "ppt/slideMasters/slideMaster1.xml",
            r#"<p:sldMaster><a:ln w="6350"/></p:sldMaster>"#,
        );

        let report = audit(&package);
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == "LINE_WIDTH_SIGNATURE"));
    }

    #[test]
    fn test_margin_outlier_is_critical() {
        let mut package = base_package();
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><a:tbl><a:tc><a:txBody><a:p/></a:txBody><a:tcPr marL="2000000" marR="54864"/></a:tc></a:tbl></p:sld>"#,
        );

        let report = audit(&package);
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == "CELL_MARGIN_OUTLIER" && i.severity == AuditSeverity::Critical));
    }

    #[test]
    fn test_top_anchor_saturation_warns() {
        let mut package = base_package();
        let anchors = "<a:bodyPr anchor=\"t\"/>".repeat(20);
        package.set_text(
            "ppt/slides/slide1.xml",
            format!("<p:sld>{anchors}</p:sld>"),
        );

        let report = audit(&package);
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == "ANCHOR_DISTRIBUTION"));
    }

    #[test]
    fn test_outer_border_missing_warns_only_with_tables() {
        // No tables at all: silent
        let report = audit(&base_package());
        assert!(!report.issues.iter().any(|i| i.code == "OUTER_BORDER_MISSING"));

        // A table without the designed outer width: warning
        let mut package = base_package();
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><a:tbl><a:tc><a:tcPr><a:lnL w="6350"/></a:tcPr></a:tc></a:tbl></p:sld>"#,
        );
        let report = audit(&package);
        assert!(report.issues.iter().any(|i| i.code == "OUTER_BORDER_MISSING"));
    }

    #[test]
    fn test_long_run_and_cell_warnings() {
        let mut package = base_package();
        let long_run = "x".repeat(950);
        package.set_text(
            "ppt/slides/slide1.xml",
            format!(
                r#"<p:sld><a:t>{long_run}</a:t><a:tc><a:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></a:txBody></a:tc></p:sld>"#,
                "y".repeat(700)
            ),
        );

        let report = audit(&package);
        let codes = report.codes();
        assert!(codes.contains(&"LONG_TEXT_RUN".to_string()));
        assert!(codes.contains(&"LONG_TABLE_CELL".to_string()));
    }
}
