//! CLI command implementations

pub mod utils;

pub mod completions;
pub mod import;
pub mod registry;
pub mod template;
