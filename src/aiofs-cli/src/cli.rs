use std::sync::Arc;

use aiofs::Executor;
use clap::{Parser, Subcommand};

use crate::cmd::*;

mod args;

/// The CLI interface for the aiofs tools.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    /// The selected command.
    #[clap(subcommand)]
    pub command: AiofsCommand,

    #[clap(flatten)]
    pub verbosity: args::Verbosity,

    #[clap(flatten)]
    pub executor: args::ExecutorArgs,
}

/// The top-level commands supported by aiofs.
#[derive(Debug, Subcommand)]
pub enum AiofsCommand {
    Cat(cat::Cat),
    Limits(limits::Limits),
    Serve(serve::Serve),
    Stat(stat::Stat),
}

impl Command for AiofsCommand {
    fn handle(self, ex: Arc<Executor>) -> eyre::Result<()> {
        match self {
            Self::Cat(cat) => cat.handle(ex),
            Self::Limits(limits) => limits.handle(ex),
            Self::Serve(serve) => serve.handle(ex),
            Self::Stat(stat) => stat.handle(ex),
        }
    }
}
