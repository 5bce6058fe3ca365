//! # deckforge-template
//!
//! The template contract and everything that reads it: per-slide geometry
//! records extracted offline from the reference deck, pattern routing with
//! geometry recovery, and derived table style profiles.
//!
//! The contract is the single source of truth for where content may land.
//! Routing never invents geometry; when a slide lacks a required rectangle,
//! the router walks a ranked candidate list, and strict mode turns any such
//! recovery into a hard error.

pub mod contract;
pub mod error;
pub mod router;
pub mod style_profile;

// Re-exports
pub use contract::{
    ChartKind, Pattern, StylePalette, TableGeometry, TemplateContract, TemplateLayout,
};
pub use error::{Result, TemplateError};
pub use router::{route, route_strict, RequiredGeometry, RoutedBlock};
pub use style_profile::{
    BorderSpec, CellMargins, CellVAlign, StyleProfileCache, TemplateTableStyleProfile,
};
