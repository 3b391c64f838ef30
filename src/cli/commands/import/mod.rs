//! `tp-import import` command - run the whole import pipeline

mod common;

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::GlobalOpts;
use crate::core::logging;
use crate::core::{Config, Diagnostics, EntityTypeIds, Registry, TpClient};
use crate::import::{
    discover_type_ids, ConsoleProgress, ImportPipeline, NoProgress, Progress, StageContext,
};

pub use common::{print_planned, print_summary};

#[derive(clap::Args, Debug, Default)]
pub struct ImportArgs {
    /// Targetprocess base URL (default: http://localhost/targetprocess)
    #[arg(long, short = 'u')]
    pub url: Option<String>,

    /// Targetprocess API token
    #[arg(long, short = 't')]
    pub token: Option<String>,

    /// CSV export read by every stage (default: Projects_List.csv)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// CSV file for one stage, as STAGE=PATH (e.g. epics=epics.csv)
    #[arg(long = "stage-file", value_parser = parse_stage_file)]
    pub stage_files: Vec<(String, PathBuf)>,

    /// Log file for diagnostics (default: import.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Look up the Project and Epic entity-type ids before importing
    #[arg(long)]
    pub discover_type_ids: bool,

    /// Resolve and map rows, print the payloads, but submit nothing
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportArgs {
    /// Command-line layer of the configuration
    fn overrides(&self) -> Config {
        Config {
            url: self.url.clone(),
            token: self.token.clone(),
            file: self.file.clone(),
            stage_files: self.stage_files.iter().cloned().collect(),
            log_file: self.log_file.clone(),
            timeout_secs: self.timeout,
            registry: None,
            discover_type_ids: self.discover_type_ids.then_some(true),
        }
    }
}

fn parse_stage_file(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((stage, path)) if !stage.trim().is_empty() && !path.trim().is_empty() => {
            Ok((stage.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("expected STAGE=PATH, got '{}'", s)),
    }
}

pub async fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = Config::load(global.config.as_deref()).map_err(|e| miette::miette!("{}", e))?;
    config.merge(args.overrides());
    if global.registry.is_some() {
        config.registry = global.registry.clone();
    }

    let log = logging::init(&config.log_file(), global.verbose).into_diagnostic()?;

    let client = TpClient::new(config.url(), config.token(), config.timeout())
        .map_err(|e| miette::miette!("{}", e))?;
    let diagnostics = Arc::new(Diagnostics::new());
    let progress: Arc<dyn Progress> = if global.quiet {
        Arc::new(NoProgress)
    } else {
        Arc::new(ConsoleProgress::new())
    };
    let ctx = StageContext::new(Arc::new(client), diagnostics.clone(), progress)
        .with_dry_run(args.dry_run);

    if config.registry.is_some() && config.discover_type_ids() {
        tracing::warn!("--discover-type-ids ignored: a registry file is in use");
        eprintln!(
            "{} --discover-type-ids is ignored when a registry file is used",
            style("!").yellow()
        );
    }

    let registry = match &config.registry {
        Some(path) => Registry::load(path).map_err(|e| miette::miette!("{}", e))?,
        None if config.discover_type_ids() => {
            Registry::targetprocess(discover_type_ids(&ctx.resolver, EntityTypeIds::default()).await)
        }
        None => Registry::targetprocess(EntityTypeIds::default()),
    };

    let pipeline = ImportPipeline::new(registry, config.input_files(), ctx)
        .map_err(|e| miette::miette!("Invalid registry: {}", e))?;

    if !global.quiet {
        println!(
            "{} Importing into {}{}",
            style("→").blue(),
            style(config.url()).yellow(),
            if args.dry_run {
                style(" (dry run)").dim().to_string()
            } else {
                String::new()
            }
        );
    }
    tracing::info!(url = %config.url(), dry_run = args.dry_run, "Import started");

    let report = match pipeline.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Some unexpected errors happened: {}", e);
            return Err(miette::miette!(
                "Import aborted: {} (details in {})",
                e,
                log.path().display()
            ));
        }
    };

    if args.dry_run {
        print_planned(&report);
    }
    if !global.quiet {
        print_summary(&report);
        if !diagnostics.is_empty() {
            println!(
                "{} {} problem(s) logged to {}",
                style("!").yellow(),
                diagnostics.entries().len(),
                log.path().display()
            );
        }
    }
    tracing::info!("Import completed");
    println!("{}", style("Completed!").green());

    Ok(())
}
