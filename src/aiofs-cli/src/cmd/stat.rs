use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::UNIX_EPOCH,
};

use aiofs::{Executor, OpenFlags};
use clap::Args;
use eyre::Context;
use serde::Serialize;

use super::Command;

/// Subcommand for printing file metadata as JSON.
#[derive(Debug, Args)]
pub struct Stat {
    /// The path to the file to query.
    path: PathBuf,
}

#[derive(Serialize)]
struct FileStat<'a> {
    path: &'a Path,
    len: u64,
    kind: &'static str,
    readonly: bool,
    /// Seconds since the UNIX epoch, when the platform records it.
    modified: Option<u64>,
}

impl Command for Stat {
    fn handle(self, ex: Arc<Executor>) -> eyre::Result<()> {
        let file = ex
            .open(&self.path, OpenFlags::READ, 0)
            .with_context(|| format!("failed to open '{}'", self.path.display()))?;

        let meta = file.stat().context("failed to query metadata")?;
        file.close()?;

        let kind = if meta.is_dir() { "directory" } else { "file" };

        let stat = FileStat {
            path: &self.path,
            len: meta.len(),
            kind,
            readonly: meta.permissions().readonly(),
            modified: meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs()),
        };

        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &stat)?;
        writeln!(stdout)?;

        Ok(())
    }
}
