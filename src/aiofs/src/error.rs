use std::io;

use thiserror::Error;

use crate::BadConfiguration;

/// Errors produced by operations on the [`Executor`](crate::Executor).
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying OS call failed.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// The file was already closed, or another caller is closing it.
    #[error("file is already closed")]
    Closed,

    /// The executor shut down before the operation produced a result.
    #[error("executor shut down before the operation completed")]
    Disconnected,

    /// The executor configuration from the environment is invalid.
    #[error(transparent)]
    BadConfiguration(#[from] BadConfiguration),
}

/// A [`Result`](std::result::Result) alias defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::Io(e) => e,
            Error::Disconnected => io::Error::new(io::ErrorKind::BrokenPipe, value),
            e => io::Error::other(e),
        }
    }
}
