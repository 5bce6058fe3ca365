//! Error types for package operations.

use thiserror::Error;

/// Result type for package operations
pub type Result<T> = std::result::Result<T, PackageError>;

/// Errors that can occur while repairing or auditing a package
#[derive(Error, Debug)]
pub enum PackageError {
    /// Error reading or writing the ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing bytes
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing XML content
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Required part not found in package
    #[error("Required part not found: {0}")]
    MissingPart(String),

    /// A part that must be UTF-8 text was not
    #[error("Part is not valid UTF-8: {0}")]
    NotText(String),

    /// Relationship & consistency scan failed
    #[error("Package consistency failed: {summary}")]
    ConsistencyFailed { summary: String },

    /// Formatting audit failed
    #[error("Formatting audit failed: {summary}")]
    AuditFailed { summary: String },

    /// Sparse-slide guard failed
    #[error("PPT content coverage failed: {summary}")]
    SparseSlides { summary: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_message_shape() {
        let err = PackageError::SparseSlides {
            summary: "1 sparse slide(s) below 60 chars (slide 7)".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("PPT content coverage failed:"));
        assert!(msg.contains("sparse slide"));
    }
}
