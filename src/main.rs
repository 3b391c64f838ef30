use clap::Parser;
use miette::Result;
use tpimport::cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Import(args) => tpimport::cli::commands::import::run(args, &global).await,
        Commands::Template(args) => tpimport::cli::commands::template::run(args, &global),
        Commands::Registry(args) => tpimport::cli::commands::registry::run(args, &global),
        Commands::Completions(args) => tpimport::cli::commands::completions::run(args),
    }
}
