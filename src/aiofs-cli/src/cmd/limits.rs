use std::sync::Arc;

use aiofs::{Executor, sys};
use clap::Args;
use eyre::Context;

use super::Command;

/// Subcommand for printing resource limits relevant to sizing the
/// executor.
#[derive(Debug, Args)]
pub struct Limits;

impl Command for Limits {
    fn handle(self, ex: Arc<Executor>) -> eyre::Result<()> {
        let limit = sys::open_file_limit().context("failed to query the open file limit")?;

        println!("CPUs:            {}", sys::hardware_parallelism());
        println!("Open file limit: {limit}");
        println!("I/O workers:     {}", ex.size());

        Ok(())
    }
}
