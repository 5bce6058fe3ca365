//! # deckforge-model
//!
//! Shared data model for the deckforge presentation pipeline.
//!
//! This crate defines the closed vocabulary the rest of the pipeline speaks:
//! content blocks and their keys, data-shape tags, quality tags, routing
//! results, run-level metrics, and the typed environment configuration.
//! Everything here is plain data - no I/O, no rendering.

pub mod block;
pub mod config;
pub mod geometry;
pub mod metrics;
pub mod scope;

// Re-exports
pub use block::{Block, BlockKey, DataQuality, DataType, RouteInfo, Section, TemplateSource};
pub use config::{CompactionMode, Config, FlexMode};
pub use geometry::{Rect, EMU_PER_CM, EMU_PER_INCH, EMU_PER_POINT};
pub use metrics::{
    CloneStats, PptMetrics, RecoveryKind, RunContext, SlideRenderFailure, TableRecovery,
};
pub use scope::Scope;
