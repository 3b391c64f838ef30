//! `tp-import completions` command - print a completion script for a shell
//!
//! The script covers every subcommand and flag, including `--stage-file`
//! and the global `--registry`. Load it once per session or install it:
//!
//! ```bash
//! source <(tp-import completions bash)
//! tp-import completions zsh > "${fpath[1]}/_tp-import"
//! ```

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use miette::Result;
use std::io;

use crate::cli::Cli;

const BIN_NAME: &str = "tp-import";

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell (bash, zsh, fish, powershell, elvish)
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, BIN_NAME, &mut io::stdout());
    Ok(())
}
