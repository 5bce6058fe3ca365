//! `[Content_Types].xml` model and reconciliation.
//!
//! The reconciler restores the invariant that every part is typed: missing
//! defaults and overrides are inserted, wrong ones corrected, and overrides
//! pointing at parts that no longer exist removed. A second application
//! reports a zero delta.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::archive::PackageArchive;
use crate::error::Result;

/// Content Types namespace
pub const CONTENT_TYPES_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/content-types";

const CT_SLIDE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_CHART: &str = "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
const CT_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";

/// Extension defaults every package needs
const REQUIRED_DEFAULTS: &[(&str, &str)] = &[
    (
        "rels",
        "application/vnd.openxmlformats-package.relationships+xml",
    ),
    ("xml", "application/xml"),
    ("png", "image/png"),
    ("jpeg", "image/jpeg"),
];

/// Reconciliation deltas; all zero on a consistent package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added_defaults: usize,
    pub corrected_defaults: usize,
    pub added_overrides: usize,
    pub corrected_overrides: usize,
    pub removed_dangling: usize,
}

impl ReconcileStats {
    /// True when nothing changed
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Parsed `[Content_Types].xml`
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    /// Extension -> content type
    pub defaults: BTreeMap<String, String>,

    /// Part name (leading slash) -> content type
    pub overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    /// Parse from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut defaults = BTreeMap::new();
        let mut overrides = BTreeMap::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.local_name();
                    if name.as_ref() == b"Default" {
                        let mut extension = None;
                        let mut content_type = None;
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            match attr.key.as_ref() {
                                b"Extension" => {
                                    extension =
                                        attr.unescape_value().ok().map(|s| s.to_string())
                                }
                                b"ContentType" => {
                                    content_type =
                                        attr.unescape_value().ok().map(|s| s.to_string())
                                }
                                _ => {}
                            }
                        }
                        if let (Some(ext), Some(ct)) = (extension, content_type) {
                            defaults.insert(ext.to_ascii_lowercase(), ct);
                        }
                    } else if name.as_ref() == b"Override" {
                        let mut part = None;
                        let mut content_type = None;
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            match attr.key.as_ref() {
                                b"PartName" => {
                                    part = attr.unescape_value().ok().map(|s| s.to_string())
                                }
                                b"ContentType" => {
                                    content_type =
                                        attr.unescape_value().ok().map(|s| s.to_string())
                                }
                                _ => {}
                            }
                        }
                        if let (Some(part), Some(ct)) = (part, content_type) {
                            overrides.insert(part, ct);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(crate::error::PackageError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(Self {
            defaults,
            overrides,
        })
    }

    /// The override registered for a part path (no leading slash)
    pub fn override_for(&self, part: &str) -> Option<&str> {
        self.overrides.get(&format!("/{part}")).map(String::as_str)
    }

    /// Serialize back to XML
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, CONTENT_TYPES_NS));
        xml.push('\n');

        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                "  <Default Extension=\"{}\" ContentType=\"{}\"/>\n",
                ext, ct
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                "  <Override PartName=\"{}\" ContentType=\"{}\"/>\n",
                part, ct
            ));
        }

        xml.push_str("</Types>");
        xml
    }

    /// The content type a part must be declared with, when it needs an
    /// override at all
    pub fn expected_override(part: &str) -> Option<&'static str> {
        if part.starts_with("ppt/slides/slide") && part.ends_with(".xml") {
            Some(CT_SLIDE)
        } else if part.starts_with("ppt/charts/chart") && part.ends_with(".xml") {
            Some(CT_CHART)
        } else if part.starts_with("ppt/theme/theme") && part.ends_with(".xml") {
            Some(CT_THEME)
        } else if part.starts_with("ppt/slideMasters/slideMaster") && part.ends_with(".xml") {
            Some(CT_MASTER)
        } else if part.starts_with("ppt/slideLayouts/slideLayout") && part.ends_with(".xml") {
            Some(CT_LAYOUT)
        } else if part == "ppt/presentation.xml" {
            Some(CT_PRESENTATION)
        } else {
            None
        }
    }

    /// Reconcile against the package: insert missing defaults and overrides,
    /// correct mismatches, drop overrides whose part is gone.
    pub fn reconcile(&mut self, package: &PackageArchive) -> ReconcileStats {
        let mut stats = ReconcileStats::default();

        for (ext, ct) in REQUIRED_DEFAULTS {
            match self.defaults.get(*ext) {
                None => {
                    self.defaults.insert(ext.to_string(), ct.to_string());
                    stats.added_defaults += 1;
                }
                Some(existing) if existing != ct => {
                    self.defaults.insert(ext.to_string(), ct.to_string());
                    stats.corrected_defaults += 1;
                }
                _ => {}
            }
        }

        // Overrides for every part that needs one
        for part in package.part_names() {
            let Some(expected) = Self::expected_override(part) else {
                continue;
            };
            let part_name = format!("/{part}");
            match self.overrides.get(&part_name) {
                None => {
                    self.overrides.insert(part_name, expected.to_string());
                    stats.added_overrides += 1;
                }
                Some(existing) if existing != expected => {
                    self.overrides.insert(part_name, expected.to_string());
                    stats.corrected_overrides += 1;
                }
                _ => {}
            }
        }

        // Dangling overrides point at parts that no longer exist
        let dangling: Vec<String> = self
            .overrides
            .keys()
            .filter(|part_name| !package.contains(part_name.trim_start_matches('/')))
            .cloned()
            .collect();
        for part_name in dangling {
            self.overrides.remove(&part_name);
            stats.removed_dangling += 1;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_package() -> PackageArchive {
        let mut package = PackageArchive::new();
        package.set_text("ppt/presentation.xml", "<p:presentation/>");
        package.set_text("ppt/slides/slide1.xml", "<p:sld/>");
        package.set_text("ppt/charts/chart1.xml", "<c:chartSpace/>");
        package.set_text("ppt/theme/theme1.xml", "<a:theme/>");
        package
    }

    #[test]
    fn test_parse_and_serialize() {
        let xml = br#"<?xml version="1.0"?>
        <Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
          <Default Extension="xml" ContentType="application/xml"/>
          <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
        </Types>"#;

        let types = ContentTypes::parse(xml).unwrap();
        assert_eq!(types.defaults["xml"], "application/xml");
        assert!(types.override_for("ppt/presentation.xml").is_some());

        let out = types.to_xml();
        let reparsed = ContentTypes::parse(out.as_bytes()).unwrap();
        assert_eq!(reparsed.defaults.len(), types.defaults.len());
        assert_eq!(reparsed.overrides.len(), types.overrides.len());
    }

    #[test]
    fn test_reconcile_fills_gaps() {
        let package = minimal_package();
        let mut types = ContentTypes::default();

        let stats = types.reconcile(&package);
        assert!(stats.added_defaults >= 4);
        // presentation, slide, chart, theme
        assert_eq!(stats.added_overrides, 4);
        assert!(types.override_for("ppt/slides/slide1.xml").is_some());
    }

    #[test]
    fn test_reconcile_second_pass_is_noop() {
        let package = minimal_package();
        let mut types = ContentTypes::default();

        let _ = types.reconcile(&package);
        let second = types.reconcile(&package);
        assert!(second.is_noop(), "second pass changed: {second:?}");
    }

    #[test]
    fn test_reconcile_corrects_mismatch() {
        let package = minimal_package();
        let mut types = ContentTypes::default();
        types.overrides.insert(
            "/ppt/slides/slide1.xml".to_string(),
            "application/wrong".to_string(),
        );

        let stats = types.reconcile(&package);
        assert_eq!(stats.corrected_overrides, 1);
        assert_eq!(
            types.override_for("ppt/slides/slide1.xml").unwrap(),
            CT_SLIDE
        );
    }

    #[test]
    fn test_reconcile_removes_dangling() {
        let package = minimal_package();
        let mut types = ContentTypes::default();
        types.overrides.insert(
            "/ppt/slides/slide99.xml".to_string(),
            CT_SLIDE.to_string(),
        );

        let stats = types.reconcile(&package);
        assert_eq!(stats.removed_dangling, 1);
        assert!(types.override_for("ppt/slides/slide99.xml").is_none());
    }

    #[test]
    fn test_expected_override_classification() {
        assert_eq!(
            ContentTypes::expected_override("ppt/slides/slide3.xml"),
            Some(CT_SLIDE)
        );
        assert_eq!(
            ContentTypes::expected_override("ppt/charts/chart2.xml"),
            Some(CT_CHART)
        );
        assert_eq!(ContentTypes::expected_override("ppt/media/image1.png"), None);
    }
}
