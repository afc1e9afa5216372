use std::{
    fmt,
    fs::Metadata,
    ops::{Deref, DerefMut},
    sync::{Arc, OnceLock},
};

mod pool;
pub use pool::{Pool, PoolRef, Recycle};

use crate::{
    file::Handle,
    op::{
        CloseRequest, IoResponse, OpenRequest, OpenResponse, ReadRequest, Reply, SeekRequest,
        SeekResponse, StatRequest, StatResponse, SyncRequest, WriteRequest,
    },
    File,
};

// Buffers which grew beyond this capacity are freed on release rather
// than kept around in the pool.
const MAX_POOLED_CAPACITY: usize = 1024 * 1024;

impl Recycle for Vec<u8> {
    #[inline]
    fn reset(&mut self) {
        self.clear();
    }

    #[inline]
    fn reusable(&self) -> bool {
        self.capacity() <= MAX_POOLED_CAPACITY
    }
}

#[derive(Debug)]
enum BufferInner {
    Pooled(PoolRef<Vec<u8>>),
    Owned(Vec<u8>),
}

/// An in-memory buffer for I/O operations on the executor.
///
/// Buffers are moved into read and write requests and handed back
/// with the response. They either own a plain byte vector or lease
/// one from the internal buffer pool.
#[derive(Debug)]
pub struct Buffer(BufferInner);

impl Buffer {
    /// Creates a buffer from an owned byte vector.
    #[inline]
    pub const fn owned(buf: Vec<u8>) -> Self {
        Self(BufferInner::Owned(buf))
    }

    /// Leases a zero-filled buffer of `len` bytes from the pool.
    pub fn with_len(len: usize) -> Self {
        let mut pr = pools().buffer();
        pr.resize(len, 0);

        Self(BufferInner::Pooled(pr))
    }

    /// Leases a buffer from the pool and fills it with `data`.
    pub fn copy_from(data: &[u8]) -> Self {
        let mut pr = pools().buffer();
        pr.extend_from_slice(data);

        Self(BufferInner::Pooled(pr))
    }

    /// Converts the buffer into a byte vector.
    ///
    /// Pooled buffers are copied so that their memory stays with
    /// the pool.
    pub fn into_vec(self) -> Vec<u8> {
        match self.0 {
            BufferInner::Pooled(pr) => pr.to_vec(),
            BufferInner::Owned(buf) => buf,
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::owned(Vec::new())
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(value: Vec<u8>) -> Self {
        Self::owned(value)
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        match &self.0 {
            BufferInner::Pooled(pr) => pr,
            BufferInner::Owned(buf) => buf,
        }
    }
}

impl DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.0 {
            BufferInner::Pooled(pr) => pr,
            BufferInner::Owned(buf) => buf,
        }
    }
}

/// The set of object pools shared by every executor in the process.
pub(crate) struct Pools {
    open_requests: Arc<Pool<OpenRequest>>,
    read_requests: Arc<Pool<ReadRequest>>,
    write_requests: Arc<Pool<WriteRequest>>,
    seek_requests: Arc<Pool<SeekRequest>>,
    sync_requests: Arc<Pool<SyncRequest>>,
    stat_requests: Arc<Pool<StatRequest>>,
    close_requests: Arc<Pool<CloseRequest>>,

    open_responses: Arc<Pool<OpenResponse>>,
    io_responses: Arc<Pool<IoResponse>>,
    seek_responses: Arc<Pool<SeekResponse>>,
    stat_responses: Arc<Pool<StatResponse>>,

    handles: Arc<Pool<Handle>>,
    buffers: Arc<Pool<Vec<u8>>>,
}

impl Pools {
    pub fn new() -> Self {
        Self {
            open_requests: Pool::new(),
            read_requests: Pool::new(),
            write_requests: Pool::new(),
            seek_requests: Pool::new(),
            sync_requests: Pool::new(),
            stat_requests: Pool::new(),
            close_requests: Pool::new(),

            open_responses: Pool::new(),
            io_responses: Pool::new(),
            seek_responses: Pool::new(),
            stat_responses: Pool::new(),

            handles: Pool::new(),
            buffers: Pool::new(),
        }
    }

    pub fn open_request(&self) -> PoolRef<OpenRequest> {
        self.open_requests.clone().get()
    }

    pub fn read_request(&self) -> PoolRef<ReadRequest> {
        self.read_requests.clone().get()
    }

    pub fn write_request(&self) -> PoolRef<WriteRequest> {
        self.write_requests.clone().get()
    }

    pub fn seek_request(&self) -> PoolRef<SeekRequest> {
        self.seek_requests.clone().get()
    }

    pub fn sync_request(&self) -> PoolRef<SyncRequest> {
        self.sync_requests.clone().get()
    }

    pub fn stat_request(&self) -> PoolRef<StatRequest> {
        self.stat_requests.clone().get()
    }

    pub fn close_request(&self) -> PoolRef<CloseRequest> {
        self.close_requests.clone().get()
    }

    pub fn open_response(&self) -> PoolRef<Reply<File>> {
        self.open_responses.clone().get()
    }

    pub fn io_response(&self) -> PoolRef<IoResponse> {
        self.io_responses.clone().get()
    }

    pub fn seek_response(&self) -> PoolRef<Reply<u64>> {
        self.seek_responses.clone().get()
    }

    pub fn stat_response(&self) -> PoolRef<Reply<Metadata>> {
        self.stat_responses.clone().get()
    }

    pub fn handle(&self) -> PoolRef<Handle> {
        self.handles.clone().get()
    }

    pub fn buffer(&self) -> PoolRef<Vec<u8>> {
        self.buffers.clone().get()
    }
}

impl fmt::Debug for Pools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pools")
            .field("handles", &self.handles)
            .field("buffers", &self.buffers)
            .finish_non_exhaustive()
    }
}

/// Gets the process-wide [`Pools`].
pub(crate) fn pools() -> &'static Pools {
    static POOLS: OnceLock<Pools> = OnceLock::new();
    POOLS.get_or_init(Pools::new)
}
