//! Queued, thread-pooled file I/O.
//!
//! # Motivation
//!
//! Servers which handle many concurrent requests often need to touch
//! the filesystem, but blocking file APIs tie up the calling thread
//! for the duration of every call. Spawning a thread per request
//! solves this at the cost of an unbounded number of threads.
//!
//! This crate instead funnels every file operation through a bounded
//! queue that is drained by a fixed, resizable set of worker threads.
//!
//! # Design
//!
//! An [`Executor`] owns the queue and its workers. [`File`] handles
//! produced by [`Executor::open`] turn each method call into a pooled
//! request, hand it to the queue and either return a [`Response`] to
//! wait on later or block on it right away.
//!
//! Requests, responses, file handles and byte buffers are recycled
//! through internal object pools so that steady-state operation does
//! not allocate much.
//!
//! When the queue is full, submitting an operation blocks until a
//! worker frees up a slot. This is the only form of flow control.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]

use std::path::Path;

mod error;
pub use error::*;

mod executor;
pub use executor::*;

mod file;
pub use file::*;

mod memory;
pub use memory::{Buffer, Pool, PoolRef, Recycle};

pub mod op;
pub use op::{Operation, Response};

pub mod sys;

/// Opens a file for reading on the global [`Executor`].
pub fn open<P: AsRef<Path>>(path: P) -> Result<File> {
    Executor::global().open(path, OpenFlags::READ, 0)
}

/// Opens a file for writing on the global [`Executor`], creating it
/// when missing and truncating it otherwise.
pub fn create<P: AsRef<Path>>(path: P) -> Result<File> {
    Executor::global().open(
        path,
        OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
        DEFAULT_MODE,
    )
}

/// Opens a file with custom flags and permission bits on the global
/// [`Executor`].
pub fn open_with<P: AsRef<Path>>(path: P, flags: OpenFlags, mode: u32) -> Result<File> {
    Executor::global().open(path, flags, mode)
}
