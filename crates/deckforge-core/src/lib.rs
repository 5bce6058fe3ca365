//! # deckforge-core
//!
//! Input-side stages of the deckforge pipeline: text and cell sanitization,
//! transient-key removal, section normalization against the closed schema,
//! render compaction, and block classification.
//!
//! Everything here is pure: values in, values out. Caller-owned data is never
//! mutated.

pub mod classify;
pub mod compact;
pub mod error;
pub mod normalize;
pub mod sanitize;
pub mod text;

// Re-exports
pub use classify::{classify_sections, ClassifiedDeck};
pub use compact::compact;
pub use error::{CoreError, Result};
pub use normalize::{is_semantically_empty, normalize_section, NormalizedSection};
pub use sanitize::{is_transient_key, sanitize};
pub use text::{ensure_string, safe_cell, CELL_HARD_CAP};
