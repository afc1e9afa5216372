use std::sync::Arc;

use clap::Parser;

mod cli;
use cli::Cli;

mod cmd;
use cmd::Command;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    cli.verbosity.setup();

    let ex = Arc::new(cli.executor.build()?);
    cli.command.handle(ex)
}
