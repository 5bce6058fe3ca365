//! # deckforge-engine
//!
//! End-to-end pipeline orchestration. One call to [`generate`] owns a run:
//! sanitize -> normalize -> classify -> route -> render -> write ->
//! postprocess -> audit -> scan -> accept or throw.
//!
//! The run is atomic: either the buffer comes back with every audit passed,
//! or an error is raised and no partial buffer escapes. All run state lives
//! in a per-run context; nothing is shared between invocations.

pub mod error;
pub mod pipeline;

pub use error::{EngineError, Result};
pub use pipeline::{generate, EngineOptions, GeneratedDeck};
