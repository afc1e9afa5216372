use std::{
    fs::Metadata,
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use crossbeam_channel::Sender;

use super::{r#impl, IoResponse, Reply, Response};
use crate::{
    memory::{pools, PoolRef, Recycle},
    Buffer, Error, File, OpenFlags, Queue, Result,
};

/// Hands `value` to the consumer waiting on the other end of `tx`.
///
/// A consumer which dropped its [`Response`] is not interested in the
/// value anymore, so it is released right away.
fn deliver<T>(tx: &mut Option<Sender<T>>, value: T) {
    if let Some(tx) = tx.take() {
        let _ = tx.send(value);
    }
}

/// Request to open a file at a given path.
#[derive(Debug, Default)]
pub struct OpenRequest {
    path: PathBuf,
    flags: OpenFlags,
    mode: u32,
    queue: Option<Queue>,
    tx: Option<Sender<PoolRef<Reply<File>>>>,
}

impl OpenRequest {
    pub(crate) fn populate(
        &mut self,
        path: &Path,
        flags: OpenFlags,
        mode: u32,
        queue: Queue,
    ) -> Response<PoolRef<Reply<File>>> {
        let (tx, resp) = Response::channel();

        self.path = path.to_path_buf();
        self.flags = flags;
        self.mode = mode;
        self.queue = Some(queue);
        self.tx = Some(tx);

        resp
    }

    pub(super) fn process(&mut self) {
        let result = match self.queue.take() {
            Some(queue) => r#impl::open_file(&self.path, self.flags, self.mode)
                .map(|os| File::new(os, queue))
                .map_err(Error::Io),
            None => Err(Error::Disconnected),
        };

        let mut resp = pools().open_response();
        resp.complete(result);
        deliver(&mut self.tx, resp);
    }
}

impl Recycle for OpenRequest {
    fn reset(&mut self) {
        self.path = PathBuf::new();
        self.flags = OpenFlags::empty();
        self.mode = 0;
        self.queue = None;
        self.tx = None;
    }
}

/// Request to read from a file into a buffer.
///
/// At most as many bytes as the buffer is long will be read.
#[derive(Debug, Default)]
pub struct ReadRequest {
    file: Option<File>,
    buf: Option<Buffer>,
    tx: Option<Sender<PoolRef<IoResponse>>>,
}

impl ReadRequest {
    pub(crate) fn populate(&mut self, file: File, buf: Buffer) -> Response<PoolRef<IoResponse>> {
        let (tx, resp) = Response::channel();

        self.file = Some(file);
        self.buf = Some(buf);
        self.tx = Some(tx);

        resp
    }

    pub(super) fn process(&mut self) {
        let mut buf = self.buf.take().unwrap_or_default();
        let result = match &self.file {
            Some(file) => file.with_os(|mut os| os.read(&mut buf)),
            None => Err(Error::Closed),
        };

        let mut resp = pools().io_response();
        resp.complete(result, buf);
        deliver(&mut self.tx, resp);
    }
}

impl Recycle for ReadRequest {
    fn reset(&mut self) {
        self.file = None;
        self.buf = None;
        self.tx = None;
    }
}

/// Request to write the full contents of a buffer to a file.
#[derive(Debug, Default)]
pub struct WriteRequest {
    file: Option<File>,
    buf: Option<Buffer>,
    tx: Option<Sender<PoolRef<IoResponse>>>,
}

impl WriteRequest {
    pub(crate) fn populate(&mut self, file: File, buf: Buffer) -> Response<PoolRef<IoResponse>> {
        let (tx, resp) = Response::channel();

        self.file = Some(file);
        self.buf = Some(buf);
        self.tx = Some(tx);

        resp
    }

    pub(super) fn process(&mut self) {
        let buf = self.buf.take().unwrap_or_default();
        let result = match &self.file {
            Some(file) => file.with_os(|mut os| os.write_all(&buf).map(|()| buf.len())),
            None => Err(Error::Closed),
        };

        let mut resp = pools().io_response();
        resp.complete(result, buf);
        deliver(&mut self.tx, resp);
    }
}

impl Recycle for WriteRequest {
    fn reset(&mut self) {
        self.file = None;
        self.buf = None;
        self.tx = None;
    }
}

/// Request to move the cursor of a file.
#[derive(Debug)]
pub struct SeekRequest {
    file: Option<File>,
    pos: SeekFrom,
    tx: Option<Sender<PoolRef<Reply<u64>>>>,
}

impl SeekRequest {
    pub(crate) fn populate(&mut self, file: File, pos: SeekFrom) -> Response<PoolRef<Reply<u64>>> {
        let (tx, resp) = Response::channel();

        self.file = Some(file);
        self.pos = pos;
        self.tx = Some(tx);

        resp
    }

    pub(super) fn process(&mut self) {
        let pos = self.pos;
        let result = match &self.file {
            Some(file) => file.with_os(|mut os| os.seek(pos)),
            None => Err(Error::Closed),
        };

        let mut resp = pools().seek_response();
        resp.complete(result);
        deliver(&mut self.tx, resp);
    }
}

impl Default for SeekRequest {
    fn default() -> Self {
        Self {
            file: None,
            pos: SeekFrom::Start(0),
            tx: None,
        }
    }
}

impl Recycle for SeekRequest {
    fn reset(&mut self) {
        self.file = None;
        self.pos = SeekFrom::Start(0);
        self.tx = None;
    }
}

/// Request to flush file contents and metadata to disk.
#[derive(Debug, Default)]
pub struct SyncRequest {
    file: Option<File>,
    tx: Option<Sender<Result<()>>>,
}

impl SyncRequest {
    pub(crate) fn populate(&mut self, file: File) -> Response<Result<()>> {
        let (tx, resp) = Response::channel();

        self.file = Some(file);
        self.tx = Some(tx);

        resp
    }

    pub(super) fn process(&mut self) {
        let result = match &self.file {
            Some(file) => file.with_os(|os| os.sync_all()),
            None => Err(Error::Closed),
        };

        deliver(&mut self.tx, result);
    }
}

impl Recycle for SyncRequest {
    fn reset(&mut self) {
        self.file = None;
        self.tx = None;
    }
}

/// Request to query the metadata of a file.
#[derive(Debug, Default)]
pub struct StatRequest {
    file: Option<File>,
    tx: Option<Sender<PoolRef<Reply<Metadata>>>>,
}

impl StatRequest {
    pub(crate) fn populate(&mut self, file: File) -> Response<PoolRef<Reply<Metadata>>> {
        let (tx, resp) = Response::channel();

        self.file = Some(file);
        self.tx = Some(tx);

        resp
    }

    pub(super) fn process(&mut self) {
        let result = match &self.file {
            Some(file) => file.with_os(|os| os.metadata()),
            None => Err(Error::Closed),
        };

        let mut resp = pools().stat_response();
        resp.complete(result);
        deliver(&mut self.tx, resp);
    }
}

impl Recycle for StatRequest {
    fn reset(&mut self) {
        self.file = None;
        self.tx = None;
    }
}

/// Request to close a file.
///
/// Only the caller that flipped the closed flag of a [`File`] builds
/// one of these, so the OS handle is closed exactly once.
#[derive(Debug, Default)]
pub struct CloseRequest {
    file: Option<File>,
    tx: Option<Sender<Result<()>>>,
}

impl CloseRequest {
    pub(crate) fn populate(&mut self, file: File) -> Response<Result<()>> {
        let (tx, resp) = Response::channel();

        self.file = Some(file);
        self.tx = Some(tx);

        resp
    }

    pub(super) fn process(&mut self) {
        // Waits for operations still running against the handle.
        let os = self.file.as_ref().and_then(File::take_os);
        let result = match os {
            Some(os) => r#impl::close_file(os).map_err(Error::Io),
            None => Err(Error::Closed),
        };

        deliver(&mut self.tx, result);
    }
}

impl Recycle for CloseRequest {
    fn reset(&mut self) {
        self.file = None;
        self.tx = None;
    }
}
