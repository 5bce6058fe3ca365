//! Relationship & consistency scanner: the second pass over the final
//! package.
//!
//! Every report category here is a hard failure for the run: missing
//! critical parts, duplicate relationship/slide/shape ids, dangling
//! references, missing or dangling content-type overrides, and sparse
//! slides outside the divider/TOC allow-list.

use std::collections::{BTreeMap, BTreeSet};

use crate::archive::PackageArchive;
use crate::audit::{all_attr_values, all_attr_values_any, text_runs};
use crate::content_types::ContentTypes;
use crate::error::{PackageError, Result};
use crate::relationships::Relationships;

/// Parts without which the package cannot load at all
const CRITICAL_PARTS: &[&str] = &[
    "[Content_Types].xml",
    "_rels/.rels",
    "ppt/presentation.xml",
    "ppt/_rels/presentation.xml.rels",
];

/// Scanner findings; every non-empty list fails the run
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Sparse threshold the scan ran with (for messages)
    pub sparse_threshold: usize,

    pub missing_critical_parts: Vec<String>,
    pub duplicate_relationship_ids: Vec<String>,
    pub duplicate_slide_ids: Vec<String>,
    pub duplicate_slide_rel_ids: Vec<String>,
    pub dangling_references: Vec<String>,
    pub dangling_rel_targets: Vec<String>,
    pub duplicate_shape_ids: Vec<String>,
    pub missing_overrides: Vec<String>,
    pub dangling_overrides: Vec<String>,
    pub content_type_mismatches: Vec<String>,
    pub sparse_slides: Vec<String>,
}

impl ScanReport {
    /// True when any category has findings
    pub fn has_failures(&self) -> bool {
        !(self.missing_critical_parts.is_empty()
            && self.duplicate_relationship_ids.is_empty()
            && self.duplicate_slide_ids.is_empty()
            && self.duplicate_slide_rel_ids.is_empty()
            && self.dangling_references.is_empty()
            && self.dangling_rel_targets.is_empty()
            && self.duplicate_shape_ids.is_empty()
            && self.missing_overrides.is_empty()
            && self.dangling_overrides.is_empty()
            && self.content_type_mismatches.is_empty()
            && self.sparse_slides.is_empty())
    }

    /// True when only the sparse-slide guard failed
    pub fn only_sparse_failures(&self) -> bool {
        self.has_failures()
            && self.missing_critical_parts.is_empty()
            && self.duplicate_relationship_ids.is_empty()
            && self.duplicate_slide_ids.is_empty()
            && self.duplicate_slide_rel_ids.is_empty()
            && self.dangling_references.is_empty()
            && self.dangling_rel_targets.is_empty()
            && self.duplicate_shape_ids.is_empty()
            && self.missing_overrides.is_empty()
            && self.dangling_overrides.is_empty()
            && self.content_type_mismatches.is_empty()
    }

    /// A failure summary enumerating up to the first 10 items per category
    pub fn summary(&self) -> String {
        fn section(name: &str, items: &[String]) -> Option<String> {
            if items.is_empty() {
                return None;
            }
            let shown: Vec<&str> = items.iter().take(10).map(String::as_str).collect();
            let suffix = if items.len() > 10 {
                format!(" (+{} more)", items.len() - 10)
            } else {
                String::new()
            };
            Some(format!("{} {}: {}{}", items.len(), name, shown.join(", "), suffix))
        }

        let sections = [
            section("missing critical part(s)", &self.missing_critical_parts),
            section("duplicate relationship id(s)", &self.duplicate_relationship_ids),
            section("duplicate slide id(s)", &self.duplicate_slide_ids),
            section("duplicate slide rel id(s)", &self.duplicate_slide_rel_ids),
            section("dangling reference(s)", &self.dangling_references),
            section("dangling rel target(s)", &self.dangling_rel_targets),
            section("duplicate non-visual shape id(s)", &self.duplicate_shape_ids),
            section("missing override(s)", &self.missing_overrides),
            section("dangling override(s)", &self.dangling_overrides),
            section("content-type mismatch(es)", &self.content_type_mismatches),
            section(
                &format!("sparse slide(s) below {} chars", self.sparse_threshold),
                &self.sparse_slides,
            ),
        ];

        sections.into_iter().flatten().collect::<Vec<_>>().join("; ")
    }

    /// Raise when anything failed
    pub fn into_result(self) -> Result<ScanReport> {
        if self.has_failures() {
            if self.only_sparse_failures() {
                return Err(PackageError::SparseSlides {
                    summary: self.summary(),
                });
            }
            return Err(PackageError::ConsistencyFailed {
                summary: self.summary(),
            });
        }
        Ok(self)
    }
}

/// Scan the final buffer.
///
/// `sparse_threshold` is the minimum character count for a non-exempt slide;
/// `allowed_labels` is the divider/TOC label allow-list (matched as a prefix
/// of the slide's normalized text).
pub fn scan_consistency(
    buffer: &[u8],
    sparse_threshold: usize,
    allowed_labels: &[String],
) -> Result<ScanReport> {
    let package = PackageArchive::from_bytes(buffer)?;
    let mut report = ScanReport {
        sparse_threshold,
        ..ScanReport::default()
    };

    for part in CRITICAL_PARTS {
        if !package.contains(part) {
            report.missing_critical_parts.push(part.to_string());
        }
    }

    scan_relationships(&package, &mut report)?;
    scan_presentation_ids(&package, &mut report)?;
    scan_references(&package, &mut report)?;
    scan_shape_ids(&package, &mut report)?;
    scan_content_types(&package, &mut report)?;
    scan_sparse_slides(&package, sparse_threshold, allowed_labels, &mut report)?;

    log::debug!(
        "consistency scan: {}",
        if report.has_failures() {
            report.summary()
        } else {
            "clean".to_string()
        }
    );

    Ok(report)
}

fn scan_relationships(package: &PackageArchive, report: &mut ScanReport) -> Result<()> {
    for rels_part in package.rels_parts() {
        let Some(bytes) = package.get(&rels_part) else {
            continue;
        };
        let rels = Relationships::parse(bytes)?;

        for id in rels.duplicate_ids() {
            report
                .duplicate_relationship_ids
                .push(format!("{rels_part}#{id}"));
        }

        let base_dir = PackageArchive::rels_base_dir(&rels_part).to_string();
        for (id, rel) in rels.iter() {
            if !rel.is_internal() {
                continue;
            }
            let resolved = PackageArchive::resolve_target(&base_dir, &rel.target);
            if !package.contains(&resolved) {
                report
                    .dangling_rel_targets
                    .push(format!("{rels_part}#{id} -> {resolved}"));
            }
        }
    }
    Ok(())
}

fn scan_presentation_ids(package: &PackageArchive, report: &mut ScanReport) -> Result<()> {
    let Some(xml) = package.get_text("ppt/presentation.xml")? else {
        return Ok(());
    };

    let mut seen_ids: BTreeSet<String> = BTreeSet::new();
    for id in all_attr_values(&xml, "<p:sldId", "id") {
        if !seen_ids.insert(id.to_string()) {
            report.duplicate_slide_ids.push(id.to_string());
        }
    }

    let mut seen_rel_ids: BTreeSet<String> = BTreeSet::new();
    for id in all_attr_values(&xml, "<p:sldId", "r:id") {
        if !seen_rel_ids.insert(id.to_string()) {
            report.duplicate_slide_rel_ids.push(id.to_string());
        }
    }
    Ok(())
}

fn scan_references(package: &PackageArchive, report: &mut ScanReport) -> Result<()> {
    // Every r:id / r:embed used by a part must resolve in that part's rels
    let mut owners: Vec<(String, String)> = Vec::new();
    for rels_part in package.rels_parts() {
        if let Some(owner) = PackageArchive::rels_owner(&rels_part) {
            owners.push((owner, rels_part));
        }
    }

    for (owner, rels_part) in owners {
        let Some(xml) = package.get_text(&owner)? else {
            continue;
        };
        let rels = match package.get(&rels_part) {
            Some(bytes) => Relationships::parse(bytes)?,
            None => Relationships::new(),
        };

        let mut referenced: BTreeSet<String> = BTreeSet::new();
        for id in all_attr_values_any(&xml, "r:id") {
            referenced.insert(id.to_string());
        }
        for id in all_attr_values_any(&xml, "r:embed") {
            referenced.insert(id.to_string());
        }

        for id in referenced {
            if !rels.contains(&id) {
                report.dangling_references.push(format!("{owner}#{id}"));
            }
        }
    }
    Ok(())
}

fn scan_shape_ids(package: &PackageArchive, report: &mut ScanReport) -> Result<()> {
    for slide_part in package.slide_parts() {
        let Some(xml) = package.get_text(&slide_part)? else {
            continue;
        };

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut rest = xml.as_str();
        while let Some(pos) = rest.find("<p:cNvPr ") {
            let element = &rest[pos..];
            if let Some(id_pos) = element.find("id=\"") {
                let value = &element[id_pos + 4..];
                if let Some(quote) = value.find('"') {
                    *counts.entry(&value[..quote]).or_insert(0) += 1;
                }
            }
            rest = &rest[pos + 9..];
        }

        for (id, count) in counts {
            if count > 1 {
                report
                    .duplicate_shape_ids
                    .push(format!("{slide_part}#{id} (x{count})"));
            }
        }
    }
    Ok(())
}

fn scan_content_types(package: &PackageArchive, report: &mut ScanReport) -> Result<()> {
    let Some(bytes) = package.get("[Content_Types].xml") else {
        return Ok(());
    };
    let types = ContentTypes::parse(bytes)?;

    // Every part needing an override has a correct one
    for part in package.part_names() {
        let Some(expected) = ContentTypes::expected_override(part) else {
            continue;
        };
        match types.override_for(part) {
            None => report.missing_overrides.push(part.to_string()),
            Some(actual) if actual != expected => report
                .content_type_mismatches
                .push(format!("{part}: {actual}")),
            _ => {}
        }
    }

    // Every override points at a real part
    for part_name in types.overrides.keys() {
        if !package.contains(part_name.trim_start_matches('/')) {
            report.dangling_overrides.push(part_name.clone());
        }
    }
    Ok(())
}

fn scan_sparse_slides(
    package: &PackageArchive,
    threshold: usize,
    allowed_labels: &[String],
    report: &mut ScanReport,
) -> Result<()> {
    let normalized_labels: Vec<String> = allowed_labels
        .iter()
        .map(|l| normalize_label(l))
        .collect();

    for slide_part in package.slide_parts() {
        let Some(xml) = package.get_text(&slide_part)? else {
            continue;
        };

        let text: String = text_runs(&xml).join(" ");
        let chars = text.chars().filter(|c| !c.is_whitespace()).count();
        if chars >= threshold {
            continue;
        }

        let normalized = normalize_label(&text);
        let allowed = normalized_labels
            .iter()
            .any(|label| !label.is_empty() && normalized.starts_with(label.as_str()));
        if !allowed {
            report
                .sparse_slides
                .push(format!("{slide_part} ({chars} chars)"));
        }
    }
    Ok(())
}

/// Lowercase, whitespace-collapsed label form
fn normalize_label(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_package() -> PackageArchive {
        let mut package = PackageArchive::new();
        package.set_text(
            "[Content_Types].xml",
            r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
  <Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>
  <Override PartName="/ppt/slideLayouts/slideLayout2.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
</Types>"#,
        );
        package.set_text(
            "_rels/.rels",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="officeDocument" Target="ppt/presentation.xml"/></Relationships>"#,
        );
        package.set_text(
            "ppt/presentation.xml",
            r#"<p:presentation><p:sldIdLst><p:sldId id="256" r:id="rId4"/></p:sldIdLst></p:presentation>"#,
        );
        package.set_text(
            "ppt/_rels/presentation.xml.rels",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId4" Type="slide" Target="slides/slide1.xml"/></Relationships>"#,
        );
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Body"/></p:nvSpPr></p:sp></p:spTree><a:t>Substantial slide body content well above any sparse threshold limit.</a:t></p:sld>"#,
        );
        package.set_text(
            "ppt/slides/_rels/slide1.xml.rels",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="slideLayout" Target="../slideLayouts/slideLayout2.xml"/></Relationships>"#,
        );
        package.set_text("ppt/slideLayouts/slideLayout2.xml", "<p:sldLayout/>");
        package
    }

    fn scan(package: &PackageArchive) -> ScanReport {
        let bytes = package.to_bytes().unwrap();
        scan_consistency(&bytes, 60, &["appendix".to_string()]).unwrap()
    }

    #[test]
    fn test_clean_package_has_no_failures() {
        let mut package = minimal_package();
        let reconciled = {
            let mut types =
                ContentTypes::parse(package.get("[Content_Types].xml").unwrap()).unwrap();
            let _ = types.reconcile(&package);
            types.to_xml()
        };
        package.set_text("[Content_Types].xml", reconciled);

        let report = scan(&package);
        assert!(!report.has_failures(), "failures: {}", report.summary());
    }

    #[test]
    fn test_missing_critical_part() {
        let mut package = minimal_package();
        package.remove("ppt/_rels/presentation.xml.rels");

        let report = scan(&package);
        assert!(report
            .missing_critical_parts
            .contains(&"ppt/_rels/presentation.xml.rels".to_string()));
        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_dangling_rel_target() {
        let mut package = minimal_package();
        package.remove("ppt/slideLayouts/slideLayout2.xml");

        let report = scan(&package);
        assert_eq!(report.dangling_rel_targets.len(), 1);
        assert!(report.dangling_rel_targets[0].contains("slideLayout2.xml"));
    }

    #[test]
    fn test_dangling_reference_in_part() {
        let mut package = minimal_package();
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><c:chart r:id="rId9"/><a:t>Plenty of body text to keep the sparse guard satisfied here.</a:t></p:sld>"#,
        );

        let report = scan(&package);
        assert_eq!(report.dangling_references, vec!["ppt/slides/slide1.xml#rId9"]);
    }

    #[test]
    fn test_duplicate_shape_ids_detected() {
        let mut package = minimal_package();
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><p:cNvPr id="3" name="A"/><p:cNvPr id="3" name="B"/><a:t>Enough body text for the sparse slide guard to stay quiet here.</a:t></p:sld>"#,
        );

        let report = scan(&package);
        assert_eq!(report.duplicate_shape_ids.len(), 1);
        assert!(report.duplicate_shape_ids[0].contains("#3"));
    }

    #[test]
    fn test_duplicate_slide_ids() {
        let mut package = minimal_package();
        package.set_text(
            "ppt/presentation.xml",
            r#"<p:presentation><p:sldIdLst><p:sldId id="256" r:id="rId4"/><p:sldId id="256" r:id="rId5"/></p:sldIdLst></p:presentation>"#,
        );
        package.set_text(
            "ppt/_rels/presentation.xml.rels",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId4" Type="slide" Target="slides/slide1.xml"/><Relationship Id="rId5" Type="slide" Target="slides/slide1.xml"/></Relationships>"#,
        );

        let report = scan(&package);
        assert_eq!(report.duplicate_slide_ids, vec!["256"]);
    }

    #[test]
    fn test_missing_override() {
        let mut package = minimal_package();
        package.set_text("ppt/charts/chart1.xml", "<c:chartSpace/>");

        let report = scan(&package);
        assert!(report
            .missing_overrides
            .contains(&"ppt/charts/chart1.xml".to_string()));
    }

    #[test]
    fn test_sparse_slide_rejected_and_message() {
        let mut package = minimal_package();
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><a:t>tiny</a:t></p:sld>"#,
        );

        let report = scan(&package);
        assert_eq!(report.sparse_slides.len(), 1);
        assert!(report.only_sparse_failures());

        let err = report.into_result().unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("PPT content coverage failed:"));
        assert!(msg.contains("1 sparse slide(s)"));
    }

    #[test]
    fn test_allowed_label_exempts_sparse_slide() {
        let mut package = minimal_package();
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><a:t>Appendix</a:t></p:sld>"#,
        );

        let report = scan(&package);
        assert!(report.sparse_slides.is_empty());
    }

    #[test]
    fn test_summary_enumerates_categories() {
        let mut package = minimal_package();
        package.remove("ppt/slideLayouts/slideLayout2.xml");
        package.set_text(
            "ppt/slides/slide1.xml",
            r#"<p:sld><a:t>x</a:t></p:sld>"#,
        );

        let report = scan(&package);
        let summary = report.summary();
        assert!(summary.contains("dangling rel target(s)"));
        assert!(summary.contains("sparse slide(s)"));
    }
}
