use std::{
    fmt, fs, io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use bitflags::bitflags;

use crate::{
    memory::{pools, PoolRef, Recycle},
    op::{IoResponse, Reply},
    Buffer, Error, Operation, Queue, Response, Result,
};

/// The permission bits used for files created by [`crate::create`].
pub const DEFAULT_MODE: u32 = 0o666;

bitflags! {
    /// Options for opening a file.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// Open the file for reading.
        const READ = 1 << 0;
        /// Open the file for writing.
        const WRITE = 1 << 1;
        /// Append writes to the end of the file.
        const APPEND = 1 << 2;
        /// Truncate an existing file to zero length.
        const TRUNCATE = 1 << 3;
        /// Create the file when it doesn't exist.
        const CREATE = 1 << 4;
        /// Create the file, failing when it already exists.
        const CREATE_NEW = 1 << 5;
    }
}

/// The pooled state behind a [`File`].
#[derive(Debug, Default)]
pub(crate) struct Handle {
    // Operations take the lock shared for as long as they run; closing
    // takes it exclusively to move the OS file out.
    file: RwLock<Option<fs::File>>,
    queue: Option<Queue>,
    closed: AtomicBool,
}

impl Recycle for Handle {
    fn reset(&mut self) {
        *self.file.get_mut().unwrap_or_else(PoisonError::into_inner) = None;
        self.queue = None;
        *self.closed.get_mut() = false;
    }
}

/// A handle to an open file whose operations run on an
/// [`Executor`](crate::Executor).
///
/// Every operation comes in two forms. The `*_async` methods queue the
/// operation and return a [`Response`] right away, the plain methods
/// block until the result is in.
///
/// Cloning a `File` is cheap and yields another handle to the same
/// OS file. Operations issued concurrently through several handles
/// are not ordered with respect to each other; callers that need
/// ordered access must serialize their calls.
///
/// The OS file is closed by [`File::close`] or, failing that, when the
/// last handle is dropped.
#[derive(Clone)]
pub struct File {
    inner: Arc<PoolRef<Handle>>,
}

impl File {
    pub(crate) fn new(os: fs::File, queue: Queue) -> Self {
        let mut handle = pools().handle();
        *handle
            .file
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = Some(os);
        handle.queue = Some(queue);

        Self {
            inner: Arc::new(handle),
        }
    }

    /// Runs `f` on the OS file unless it was closed already.
    pub(crate) fn with_os<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&fs::File) -> io::Result<R>,
    {
        let guard = self
            .inner
            .file
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        match guard.as_ref() {
            Some(os) => f(os).map_err(Error::Io),
            None => Err(Error::Closed),
        }
    }

    /// Moves the OS file out of the handle once all running
    /// operations finished.
    pub(crate) fn take_os(&self) -> Option<fs::File> {
        self.inner
            .file
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    #[cfg(test)]
    pub(crate) fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    fn submit(&self, op: Operation) {
        match &self.inner.queue {
            Some(queue) => queue.submit(op),
            // Dropping the operation disconnects its response.
            None => drop(op),
        }
    }

    /// Whether [`File::close`] was called on this file.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Reads up to `buf.len()` bytes from the file.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut resp = self.read_async(Buffer::with_len(buf.len())).wait()?;
        let n = resp.take()?;
        buf[..n].copy_from_slice(&resp.buffer()[..n]);

        Ok(n)
    }

    /// Queues a read of up to `buf.len()` bytes into `buf`.
    ///
    /// The buffer is handed back through the [`IoResponse`].
    pub fn read_async(&self, buf: Buffer) -> Response<PoolRef<IoResponse>> {
        let mut req = pools().read_request();
        let resp = req.populate(self.clone(), buf);

        self.submit(Operation::Read(req));
        resp
    }

    /// Writes all of `buf` to the file.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        self.write_async(Buffer::copy_from(buf)).wait()?.take()
    }

    /// Queues a write of the full contents of `buf`.
    ///
    /// The buffer is handed back through the [`IoResponse`].
    pub fn write_async(&self, buf: Buffer) -> Response<PoolRef<IoResponse>> {
        let mut req = pools().write_request();
        let resp = req.populate(self.clone(), buf);

        self.submit(Operation::Write(req));
        resp
    }

    /// Moves the cursor of the file and returns the new offset from
    /// its start.
    pub fn seek(&self, pos: io::SeekFrom) -> Result<u64> {
        self.seek_async(pos).wait()?.take()
    }

    /// Queues a move of the file cursor.
    pub fn seek_async(&self, pos: io::SeekFrom) -> Response<PoolRef<Reply<u64>>> {
        let mut req = pools().seek_request();
        let resp = req.populate(self.clone(), pos);

        self.submit(Operation::Seek(req));
        resp
    }

    /// Flushes file contents and metadata to disk.
    pub fn sync(&self) -> Result<()> {
        self.sync_async().wait()?
    }

    /// Queues a flush of the file to disk.
    pub fn sync_async(&self) -> Response<Result<()>> {
        let mut req = pools().sync_request();
        let resp = req.populate(self.clone());

        self.submit(Operation::Sync(req));
        resp
    }

    /// Queries the metadata of the file.
    pub fn stat(&self) -> Result<fs::Metadata> {
        self.stat_async().wait()?.take()
    }

    /// Queues a metadata query for the file.
    pub fn stat_async(&self) -> Response<PoolRef<Reply<fs::Metadata>>> {
        let mut req = pools().stat_request();
        let resp = req.populate(self.clone());

        self.submit(Operation::Stat(req));
        resp
    }

    /// Closes the file.
    ///
    /// Only the first call closes the OS file and reports its result,
    /// every other call fails with [`Error::Closed`].
    pub fn close(&self) -> Result<()> {
        self.close_async().wait()?
    }

    /// Queues closing the file.
    ///
    /// Callers racing to close the same file never block: all but the
    /// first get a response that already holds [`Error::Closed`].
    pub fn close_async(&self) -> Response<Result<()>> {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Response::ready(Err(Error::Closed));
        }

        let mut req = pools().close_request();
        let resp = req.populate(self.clone());

        self.submit(Operation::Close(req));
        resp
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl io::Read for &File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        File::read(*self, buf).map_err(Into::into)
    }
}

impl io::Write for &File {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        File::write(*self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for &File {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        File::seek(*self, pos).map_err(Into::into)
    }
}

impl io::Read for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }
}

impl io::Write for File {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for File {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        io::Seek::seek(&mut &*self, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Executor, Pool};

    #[test]
    fn released_handle_forgets_its_file() {
        let dir = tempfile::tempdir().unwrap();
        let os = fs::File::create(dir.path().join("handle.txt")).unwrap();
        let ex = Executor::new(1, 4).unwrap();

        let pool: Arc<Pool<Handle>> = Pool::new();
        let mut handle = pool.clone().get();
        *handle.file.get_mut().unwrap() = Some(os);
        handle.queue = Some(ex.queue_handle());
        *handle.closed.get_mut() = true;

        let file = File {
            inner: Arc::new(handle),
        };
        let other = file.clone();

        drop(file);
        assert_eq!(pool.idle(), 0);
        drop(other);
        assert_eq!(pool.idle(), 1);

        let mut handle = pool.get();
        assert!(handle.file.get_mut().unwrap().is_none());
        assert!(handle.queue.is_none());
        assert!(!*handle.closed.get_mut());
    }
}
