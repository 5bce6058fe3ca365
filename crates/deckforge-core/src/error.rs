//! Error types for normalization.

use thiserror::Error;

/// Result type for normalization operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised before any rendering happens
#[derive(Error, Debug)]
pub enum CoreError {
    /// Strict normalization found keys outside the closed schema
    #[error("Render normalization rejected non-template/transient keys: {section}: {keys:?}")]
    NonTemplateKeys { section: String, keys: Vec<String> },

    /// A section payload was not an object
    #[error("Section '{section}' payload must be an object, got {found}")]
    InvalidSectionShape { section: String, found: &'static str },

    /// JSON handling error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a non-template-keys rejection
    pub fn non_template_keys(section: impl Into<String>, keys: Vec<String>) -> Self {
        Self::NonTemplateKeys {
            section: section.into(),
            keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_template_keys_message() {
        let err = CoreError::non_template_keys("market", vec!["bogus".to_string()]);
        let msg = err.to_string();
        assert!(msg.contains("rejected non-template/transient keys"));
        assert!(msg.contains("market"));
        assert!(msg.contains("bogus"));
    }
}
