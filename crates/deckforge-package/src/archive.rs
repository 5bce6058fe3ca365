//! In-memory package archive.
//!
//! A PPTX package is a ZIP of XML parts plus media. The archive unpacks it
//! into a map for random-access read and patch, and writes back with sorted
//! keys so output is deterministic.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};

use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

use crate::error::{PackageError, Result};

/// An unpacked OOXML package
#[derive(Debug, Clone, Default)]
pub struct PackageArchive {
    /// All parts, keyed by path
    files: HashMap<String, Vec<u8>>,
}

impl PackageArchive {
    /// Create an empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// Unpack a buffer
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }

    /// Unpack from any reader
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut files = HashMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            if name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            files.insert(name, contents);
        }

        Ok(Self { files })
    }

    /// Raw bytes of a part
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    /// A part as UTF-8 text
    pub fn get_text(&self, path: &str) -> Result<Option<String>> {
        match self.files.get(path) {
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => Ok(Some(s.to_string())),
                Err(_) => Err(PackageError::NotText(path.to_string())),
            },
            None => Ok(None),
        }
    }

    /// A required part as UTF-8 text
    pub fn require_text(&self, path: &str) -> Result<String> {
        self.get_text(path)?
            .ok_or_else(|| PackageError::MissingPart(path.to_string()))
    }

    /// Replace or insert a part
    pub fn set(&mut self, path: impl Into<String>, contents: Vec<u8>) {
        self.files.insert(path.into(), contents);
    }

    /// Replace or insert a text part
    pub fn set_text(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into().into_bytes());
    }

    /// Remove a part
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    /// Whether a part exists
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// All part paths, unsorted
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_str())
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when the package has no parts
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Slide part paths in slide order (`ppt/slides/slide1.xml`, ...)
    pub fn slide_parts(&self) -> Vec<String> {
        let mut numbered: Vec<(u32, String)> = self
            .files
            .keys()
            .filter_map(|name| {
                let num = name
                    .strip_prefix("ppt/slides/slide")?
                    .strip_suffix(".xml")?
                    .parse::<u32>()
                    .ok()?;
                Some((num, name.clone()))
            })
            .collect();
        numbered.sort_by_key(|(n, _)| *n);
        numbered.into_iter().map(|(_, name)| name).collect()
    }

    /// All `.rels` part paths
    pub fn rels_parts(&self) -> Vec<String> {
        let mut parts: Vec<String> = self
            .files
            .keys()
            .filter(|name| name.ends_with(".rels"))
            .cloned()
            .collect();
        parts.sort();
        parts
    }

    /// The part a `.rels` file describes (`ppt/slides/_rels/slide1.xml.rels`
    /// -> `ppt/slides/slide1.xml`); `None` for the package-level `.rels`
    pub fn rels_owner(rels_path: &str) -> Option<String> {
        let (dir, file) = rels_path.rsplit_once("_rels/")?;
        let owner_file = file.strip_suffix(".rels")?;
        if owner_file.is_empty() {
            return None;
        }
        Some(format!("{dir}{owner_file}"))
    }

    /// Base directory rel targets in a `.rels` file resolve against
    pub fn rels_base_dir(rels_path: &str) -> &str {
        rels_path
            .rsplit_once("_rels/")
            .map(|(dir, _)| dir.trim_end_matches('/'))
            .unwrap_or("")
    }

    /// Resolve a (possibly relative) rel target against a base directory
    pub fn resolve_target(base_dir: &str, target: &str) -> String {
        if let Some(absolute) = target.strip_prefix('/') {
            return absolute.to_string();
        }

        let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
        for segment in target.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        segments.join("/")
    }

    /// Write the package back to a buffer with sorted keys
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write the package to any writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated);

        let mut paths: Vec<_> = self.files.keys().collect();
        paths.sort();

        for path in paths {
            zip.start_file(path, options)?;
            zip.write_all(&self.files[path])?;
        }

        zip.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut package = PackageArchive::new();
        package.set_text("[Content_Types].xml", "<Types/>");
        package.set_text("ppt/slides/slide1.xml", "<p:sld/>");
        package.set("ppt/media/image1.png", vec![0x89, 0x50]);

        let bytes = package.to_bytes().unwrap();
        let restored = PackageArchive::from_bytes(&bytes).unwrap();

        assert_eq!(restored.len(), 3);
        assert_eq!(
            restored.get_text("ppt/slides/slide1.xml").unwrap().unwrap(),
            "<p:sld/>"
        );
        assert_eq!(restored.get("ppt/media/image1.png").unwrap(), &[0x89, 0x50]);
    }

    #[test]
    fn test_slide_parts_sorted_numerically() {
        let mut package = PackageArchive::new();
        for n in [10, 2, 1] {
            package.set_text(format!("ppt/slides/slide{n}.xml"), "<p:sld/>");
        }
        package.set_text("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>");

        assert_eq!(
            package.slide_parts(),
            vec![
                "ppt/slides/slide1.xml",
                "ppt/slides/slide2.xml",
                "ppt/slides/slide10.xml"
            ]
        );
    }

    #[test]
    fn test_rels_owner() {
        assert_eq!(
            PackageArchive::rels_owner("ppt/slides/_rels/slide1.xml.rels"),
            Some("ppt/slides/slide1.xml".to_string())
        );
        assert_eq!(
            PackageArchive::rels_owner("ppt/_rels/presentation.xml.rels"),
            Some("ppt/presentation.xml".to_string())
        );
        assert_eq!(PackageArchive::rels_owner("_rels/.rels"), None);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            PackageArchive::resolve_target("ppt/slides", "../charts/chart1.xml"),
            "ppt/charts/chart1.xml"
        );
        assert_eq!(
            PackageArchive::resolve_target("ppt/slides", "/ppt/charts/chart1.xml"),
            "ppt/charts/chart1.xml"
        );
        assert_eq!(
            PackageArchive::resolve_target("", "ppt/presentation.xml"),
            "ppt/presentation.xml"
        );
        assert_eq!(
            PackageArchive::resolve_target("ppt", "theme/theme1.xml"),
            "ppt/theme/theme1.xml"
        );
    }

    #[test]
    fn test_require_text_missing() {
        let package = PackageArchive::new();
        assert!(matches!(
            package.require_text("missing.xml"),
            Err(PackageError::MissingPart(_))
        ));
    }

    #[test]
    fn test_non_utf8_part_is_error_as_text() {
        let mut package = PackageArchive::new();
        package.set("binary.bin", vec![0xFF, 0xFE, 0x00]);
        assert!(matches!(
            package.get_text("binary.bin"),
            Err(PackageError::NotText(_))
        ));
    }
}
