//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, import::ImportArgs, registry::RegistryArgs,
    template::TemplateArgs,
};

#[derive(Parser)]
#[command(name = "tp-import")]
#[command(author, version, about = "Targetprocess CSV importer")]
#[command(long_about = "Imports programs, projects, epics and features from CSV exports into Targetprocess, in dependency order, through its REST API.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Configuration file (default: ~/.config/tp-import/config.yaml only)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Registry file replacing the built-in entity types
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    /// Suppress progress bars and the summary
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Also write log events to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import every entity type from CSV, then re-apply epic states
    Import(ImportArgs),

    /// Print the CSV columns the importer reads
    Template(TemplateArgs),

    /// Print the effective entity-type registry and stage order
    Registry(RegistryArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
