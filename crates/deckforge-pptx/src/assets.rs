//! On-disk brand assets, loaded once at pipeline init.

use crate::error::{PptxError, Result};
use std::collections::HashMap;
use std::path::Path;

/// The four brand assets the deck may embed
const ASSET_NAMES: &[&str] = &[
    "cover-bg.png",
    "divider-bg.png",
    "logo-dark.png",
    "logo-white.png",
];

/// Loaded asset bytes, keyed by file name. Missing files are tolerated -
/// slides simply render without the image.
#[derive(Debug, Clone, Default)]
pub struct Assets {
    files: HashMap<String, Vec<u8>>,
}

impl Assets {
    /// No assets at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load whatever of the known assets exists under `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = HashMap::new();

        for name in ASSET_NAMES {
            let path = dir.join(name);
            if path.is_file() {
                let data = std::fs::read(&path).map_err(|e| PptxError::AssetError {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                files.insert(name.to_string(), data);
            }
        }

        log::debug!("loaded {} asset(s) from {}", files.len(), dir.display());
        Ok(Self { files })
    }

    /// Raw bytes of a named asset
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Cover background, if present
    pub fn cover_background(&self) -> Option<&[u8]> {
        self.get("cover-bg.png")
    }

    /// Divider background, if present
    pub fn divider_background(&self) -> Option<&[u8]> {
        self.get("divider-bg.png")
    }

    /// Number of loaded assets
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when nothing was loaded
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_assets() {
        let assets = Assets::empty();
        assert!(assets.is_empty());
        assert!(assets.cover_background().is_none());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cover-bg.png"), b"\x89PNG fake").unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), b"ignored").unwrap();

        let assets = Assets::load(dir.path()).unwrap();
        assert_eq!(assets.len(), 1);
        assert!(assets.cover_background().is_some());
        assert!(assets.get("unrelated.txt").is_none());
    }

    #[test]
    fn test_missing_dir_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let assets = Assets::load(dir.path()).unwrap();
        assert!(assets.is_empty());
    }
}
