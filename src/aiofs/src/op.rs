//! The request/response protocol between file handles and workers.
//!
//! Every file operation is represented by a pooled request carrying its
//! inputs and the sending half of a single-slot channel. A worker
//! processes the request and delivers exactly one result through that
//! channel, which the caller observes through a [`Response`].

use std::{fmt, fs::Metadata};

use crossbeam_channel::{Receiver, Sender};

use crate::{
    memory::{PoolRef, Recycle},
    Buffer, Error, File, Result,
};

mod r#impl;

mod request;
pub use request::*;

/// A unit of work to be carried out by a worker.
pub enum Operation {
    Open(PoolRef<OpenRequest>),
    Read(PoolRef<ReadRequest>),
    Write(PoolRef<WriteRequest>),
    Seek(PoolRef<SeekRequest>),
    Sync(PoolRef<SyncRequest>),
    Stat(PoolRef<StatRequest>),
    Close(PoolRef<CloseRequest>),
}

impl Operation {
    /// Gets a human-readable name for the kind of operation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open(..) => "open",
            Self::Read(..) => "read",
            Self::Write(..) => "write",
            Self::Seek(..) => "seek",
            Self::Sync(..) => "sync",
            Self::Stat(..) => "stat",
            Self::Close(..) => "close",
        }
    }

    /// Executes the operation and delivers its result.
    ///
    /// The request is released back to its pool afterwards.
    pub(crate) fn process(self) {
        log::trace!("Processing {} operation", self.name());

        match self {
            Self::Open(mut req) => req.process(),
            Self::Read(mut req) => req.process(),
            Self::Write(mut req) => req.process(),
            Self::Seek(mut req) => req.process(),
            Self::Sync(mut req) => req.process(),
            Self::Stat(mut req) => req.process(),
            Self::Close(mut req) => req.process(),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Operation").field(&self.name()).finish()
    }
}

/// The receiving end of an operation's one-shot result channel.
///
/// The value is delivered exactly once by the worker that processed
/// the operation and can be read exactly once by calling
/// [`Response::wait`].
#[must_use = "dropping a Response discards the result of its operation"]
pub struct Response<T> {
    rx: Receiver<T>,
}

impl<T> Response<T> {
    pub(crate) fn channel() -> (Sender<T>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (tx, Self { rx })
    }

    /// Creates a response that already holds its value.
    pub(crate) fn ready(value: T) -> Self {
        let (tx, this) = Self::channel();
        // The receiver is alive and the slot is free, so this can't fail.
        let _ = tx.send(value);

        this
    }

    /// Whether the result was delivered and [`Response::wait`] will
    /// return without blocking.
    pub fn is_ready(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Blocks until the result is delivered and returns it.
    ///
    /// Fails with [`Error::Disconnected`] when the executor was shut
    /// down before processing the operation.
    pub fn wait(self) -> Result<T> {
        self.rx.recv().map_err(|_| Error::Disconnected)
    }
}

impl<T> fmt::Debug for Response<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// A pooled response holding the result of a single operation.
#[derive(Debug)]
pub struct Reply<T> {
    result: Option<Result<T>>,
}

/// The response to an open operation.
pub type OpenResponse = Reply<File>;

/// The response to a seek operation, holding the new offset.
pub type SeekResponse = Reply<u64>;

/// The response to a stat operation.
pub type StatResponse = Reply<Metadata>;

impl<T> Reply<T> {
    pub(crate) fn complete(&mut self, result: Result<T>) {
        self.result = Some(result);
    }

    /// Moves the result out of the response.
    ///
    /// # Panics
    ///
    /// Panics when the result was already taken.
    pub fn take(&mut self) -> Result<T> {
        self.result.take().expect("response result was already consumed")
    }
}

impl<T> Default for Reply<T> {
    fn default() -> Self {
        Self { result: None }
    }
}

impl<T> Recycle for Reply<T> {
    fn reset(&mut self) {
        self.result = None;
    }
}

/// The response to a read or write operation.
///
/// Besides the number of bytes transferred, it hands the buffer that
/// was moved into the request back to the caller.
#[derive(Debug, Default)]
pub struct IoResponse {
    result: Option<Result<usize>>,
    buf: Option<Buffer>,
}

impl IoResponse {
    pub(crate) fn complete(&mut self, result: Result<usize>, buf: Buffer) {
        self.result = Some(result);
        self.buf = Some(buf);
    }

    /// Moves the number of transferred bytes or the error out of the
    /// response.
    ///
    /// # Panics
    ///
    /// Panics when the result was already taken.
    pub fn take(&mut self) -> Result<usize> {
        self.result.take().expect("response result was already consumed")
    }

    /// Gets the contents of the buffer used by the operation.
    pub fn buffer(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or_default()
    }

    /// Moves the buffer used by the operation out of the response.
    pub fn take_buffer(&mut self) -> Option<Buffer> {
        self.buf.take()
    }
}

impl Recycle for IoResponse {
    fn reset(&mut self) {
        self.result = None;
        self.buf = None;
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::memory::Pool;

    #[test]
    fn ready_response_delivers_once() {
        let resp = Response::ready(42);
        assert!(resp.is_ready());
        assert_eq!(resp.wait().unwrap(), 42);
    }

    #[test]
    fn dropped_sender_disconnects() {
        let (tx, resp) = Response::<()>::channel();
        drop(tx);

        assert!(matches!(resp.wait(), Err(Error::Disconnected)));
    }

    #[test]
    fn released_io_response_holds_nothing() {
        let pool = Pool::<IoResponse>::new();

        let mut resp = pool.clone().get();
        resp.complete(
            Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Buffer::owned(vec![7; 64]),
        );
        drop(resp);

        let resp = pool.clone().get();
        assert!(resp.result.is_none());
        assert!(resp.buf.is_none());
        assert!(resp.buffer().is_empty());
    }

    #[test]
    fn released_reply_holds_nothing() {
        let pool = Pool::<Reply<u64>>::new();

        let mut resp = pool.clone().get();
        resp.complete(Ok(1234));
        drop(resp);

        let mut resp = pool.clone().get();
        assert!(resp.result.is_none());

        resp.complete(Ok(5));
        assert_eq!(resp.take().unwrap(), 5);
    }
}
