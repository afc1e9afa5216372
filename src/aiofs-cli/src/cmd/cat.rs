use std::{
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};

use aiofs::{Executor, OpenFlags};
use clap::Args;
use eyre::Context;

use super::Command;

/// Subcommand for copying a file to stdout through the executor.
#[derive(Debug, Args)]
pub struct Cat {
    /// The path to the file to print.
    path: PathBuf,
}

impl Command for Cat {
    fn handle(self, ex: Arc<Executor>) -> eyre::Result<()> {
        let file = ex
            .open(&self.path, OpenFlags::READ, 0)
            .with_context(|| format!("failed to open '{}'", self.path.display()))?;

        let mut stdout = io::stdout().lock();
        io::copy(&mut &file, &mut stdout).context("failed to copy file to stdout")?;
        stdout.flush()?;

        file.close()
            .with_context(|| format!("failed to close '{}'", self.path.display()))
    }
}
