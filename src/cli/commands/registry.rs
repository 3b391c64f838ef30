//! `tp-import registry` command - show entity types and stage order

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::utils::effective_registry;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct RegistryArgs {
    /// Only print the stage order
    #[arg(long)]
    pub order: bool,
}

pub fn run(args: RegistryArgs, global: &GlobalOpts) -> Result<()> {
    let registry = effective_registry(global)?;
    let order = registry
        .stage_order()
        .map_err(|e| miette::miette!("Invalid registry: {}", e))?;
    registry
        .validate()
        .map_err(|e| miette::miette!("Invalid registry: {}", e))?;

    if !args.order {
        print!("{}", serde_yml::to_string(&registry).into_diagnostic()?);
        println!();
    }

    let names: Vec<&str> = order.iter().map(|c| c.resource.as_str()).collect();
    let mut line = names.join(" → ");
    if let Some(fix) = &registry.state_fix {
        line.push_str(&format!(" → {} state fix", fix.entity));
    }
    if args.order {
        println!("{}", line);
    } else {
        println!("{} {}", style("Stage order:").bold(), line);
    }

    Ok(())
}
