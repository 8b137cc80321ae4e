//! CLI command implementations

pub mod completions;
pub mod config;
pub mod stats;
pub mod vertices;
pub mod walk;
