//! Error types for the pipeline.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Anything that can abort a run, in pipeline-stage order
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input-side failure before any rendering
    #[error(transparent)]
    Input(#[from] deckforge_core::CoreError),

    /// Routing failure (no pattern, no geometry, strict recovery)
    #[error(transparent)]
    Routing(#[from] deckforge_template::TemplateError),

    /// Rendering or package-emission failure
    #[error(transparent)]
    Render(#[from] deckforge_pptx::PptxError),

    /// Postprocessing, audit, or consistency failure
    #[error(transparent)]
    Package(#[from] deckforge_package::PackageError),

    /// Formatting audit found blocking issues
    #[error("Formatting audit blocked the run: {summary}")]
    AuditBlocked { summary: String },

    /// Strict mode promoted warnings to a hard failure
    #[error("[STRICT GEOMETRY] {count} fidelity warning(s) promoted to errors: {summary}")]
    StrictWarnings { count: usize, summary: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_warning_message() {
        let err = EngineError::StrictWarnings {
            count: 2,
            summary: "LONG_TABLE_CELL on japanesePlayers; ANCHOR_DISTRIBUTION".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("[STRICT GEOMETRY]"));
        assert!(msg.contains("japanesePlayers"));
    }
}
