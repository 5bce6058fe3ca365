//! # deckforge-cli
//!
//! Command-line interface for the deckforge presentation generator.

pub mod app;

pub use app::run_cli;
