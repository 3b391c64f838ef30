//! tp-import: migrate program/project/epic/feature exports into Targetprocess
//!
//! Entity types are described declaratively in a [`core::Registry`]; the
//! [`import::ImportPipeline`] imports them in dependency order through the
//! REST API and finally re-applies epic workflow states.

pub mod cli;
pub mod core;
pub mod import;
