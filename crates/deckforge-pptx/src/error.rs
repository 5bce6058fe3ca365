//! Error types for PPTX generation.

use thiserror::Error;

/// Result type for PPTX operations
pub type Result<T> = std::result::Result<T, PptxError>;

/// Errors that can occur during rendering and package emission
#[derive(Error, Debug)]
pub enum PptxError {
    /// Table flex found violations it was not allowed to recover from
    #[error("Table flex violations for '{key}': {violations:?}")]
    FlexViolations { key: String, violations: Vec<String> },

    /// Fit-score pre-flight demanded a recovery strict mode forbids
    #[error("Table fit score {score:.0} for '{key}' demands '{recommendation}' which strict mode forbids")]
    FitRejected {
        key: String,
        score: f64,
        recommendation: &'static str,
    },

    /// A block's payload did not match its data type
    #[error("Block '{key}' payload invalid: {reason}")]
    InvalidPayload { key: String, reason: String },

    /// A renderer needed geometry its routed slide does not carry
    #[error("Slide geometry missing for '{key}': {missing}")]
    MissingGeometry { key: String, missing: &'static str },

    /// Asset file could not be loaded
    #[error("Asset error: {path}: {reason}")]
    AssetError { path: String, reason: String },

    /// ZIP archive error
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PptxError {
    /// Create an invalid-payload error
    pub fn invalid_payload(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-geometry error
    pub fn missing_geometry(key: impl Into<String>, missing: &'static str) -> Self {
        Self::MissingGeometry {
            key: key.into(),
            missing,
        }
    }

    /// Get the error code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            Self::FlexViolations { .. } => "PPTX001",
            Self::FitRejected { .. } => "PPTX002",
            Self::InvalidPayload { .. } => "PPTX003",
            Self::MissingGeometry { .. } => "PPTX004",
            Self::AssetError { .. } => "PPTX005",
            Self::Zip(_) => "PPTX006",
            Self::Io(_) => "PPTX007",
        }
    }
}
