//! `tp-import template` command - print the CSV columns the importer reads

use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::HashSet;
use std::io;

use crate::cli::commands::utils::effective_registry;
use crate::cli::GlobalOpts;
use crate::core::Registry;

#[derive(clap::Args, Debug)]
pub struct TemplateArgs {
    /// Only the columns of this stage (e.g. epics); all stages when omitted
    pub stage: Option<String>,
}

/// Header columns for `stage`, or for every stage in dependency order
pub fn template_columns<'a>(registry: &'a Registry, stage: Option<&str>) -> Result<Vec<&'a str>> {
    let configs = match stage {
        Some(name) => vec![registry.get(name).map_err(|e| miette::miette!("{}", e))?],
        None => registry
            .stage_order()
            .map_err(|e| miette::miette!("{}", e))?,
    };

    let mut seen = HashSet::new();
    Ok(configs
        .iter()
        .flat_map(|c| c.columns())
        .filter(|c| seen.insert(*c))
        .collect())
}

pub fn run(args: TemplateArgs, global: &GlobalOpts) -> Result<()> {
    let registry = effective_registry(global)?;
    let columns = template_columns(&registry, args.stage.as_deref())?;

    // Output to stdout (can be redirected to file)
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(&columns).into_diagnostic()?;
    writer.flush().into_diagnostic()?;

    // Print usage hint to stderr so it doesn't interfere with redirected output
    eprintln!();
    eprintln!(
        "{} Template generated. Redirect to file: tp-import template > {}.csv",
        style("→").blue(),
        args.stage.as_deref().unwrap_or("import")
    );

    Ok(())
}
