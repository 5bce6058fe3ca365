//! Error types for template routing.

use thiserror::Error;

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Errors raised while resolving template geometry
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No pattern is registered for a block key and no default exists
    #[error("No template pattern resolves for block key '{key}'")]
    NoPattern { key: String },

    /// A pattern references a slide the contract has no layout for
    #[error("Pattern '{pattern}' references slide {slide} with no layout record")]
    MissingLayout { pattern: String, slide: u32 },

    /// Strict-geometry policy: recovery happened and is forbidden
    #[error(
        "[STRICT GEOMETRY] Hard fail: geometry recovery not allowed for '{key}' \
         (primary slide {primary_slide} lacks {required}, recovered to slide {recovered_slide})"
    )]
    RecoveryForbidden {
        key: String,
        primary_slide: u32,
        required: &'static str,
        recovered_slide: u32,
    },

    /// No candidate slide satisfies the required geometry
    #[error(
        "No template slide satisfies required {required} geometry for '{key}' \
         (scanned {scanned} candidates)"
    )]
    NoSatisfyingCandidate {
        key: String,
        required: &'static str,
        scanned: usize,
    },

    /// Contract failed to deserialize
    #[error("Template contract error: {0}")]
    Contract(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_geometry_message() {
        let err = TemplateError::RecoveryForbidden {
            key: "japanesePlayers".to_string(),
            primary_slide: 16,
            required: "table",
            recovered_slide: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("[STRICT GEOMETRY]"));
        assert!(msg.contains("geometry recovery not allowed"));
        assert!(msg.contains("japanesePlayers"));
    }
}
