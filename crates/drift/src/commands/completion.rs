//! `drift completion` -- generate shell completions.

use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::{Cli, CompletionArgs};
use crate::context::RuntimeContext;

pub fn run(_ctx: &RuntimeContext, args: &CompletionArgs) -> anyhow::Result<()> {
    let mut command = Cli::command();
    generate(args.shell, &mut command, "drift", &mut std::io::stdout());
    Ok(())
}
