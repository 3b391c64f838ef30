//! Shared utilities for CLI commands

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::{Config, EntityTypeIds, Registry};

/// Registry from `--registry`, the config file, or the built-in one
pub fn effective_registry(global: &GlobalOpts) -> Result<Registry> {
    let path = match &global.registry {
        Some(path) => Some(path.clone()),
        None => {
            Config::load(global.config.as_deref())
                .map_err(|e| miette::miette!("{}", e))?
                .registry
        }
    };
    match path {
        Some(path) => Registry::load(&path).map_err(|e| miette::miette!("{}", e)),
        None => Ok(Registry::targetprocess(EntityTypeIds::default())),
    }
}
