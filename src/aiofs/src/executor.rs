use std::{
    cmp::Ordering,
    env, fmt,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
        Mutex, OnceLock, PoisonError,
    },
};

use crossbeam_channel::{Receiver, SendError, Sender};
use thiserror::Error;

use crate::{
    memory::{pools, PoolRef},
    op::Reply,
    sys, File, OpenFlags, Operation, Response, Result,
};

mod worker;
use worker::Worker;

const AIOFS_WORKER_THREADS: &str = "AIOFS_WORKER_THREADS";
const AIOFS_QUEUE_DEPTH: &str = "AIOFS_QUEUE_DEPTH";

/// The number of workers of the global executor.
pub const DEFAULT_WORKERS: isize = 1;

/// The queue depth of the global executor.
pub const DEFAULT_QUEUE_DEPTH: usize = 32 * 1024;

#[derive(Clone, Debug, Error)]
#[error("invalid value in {var}; must be {expected}")]
pub struct BadConfiguration {
    var: &'static str,
    expected: &'static str,
}

fn env_var<T: std::str::FromStr>(
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, BadConfiguration> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| BadConfiguration { var, expected }),

        Err(_) => Ok(None),
    }
}

/// Configuration for an [`Executor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// The number of worker threads; `-1` selects the hardware
    /// parallelism.
    pub workers: isize,
    /// The number of operations that may wait in the queue before
    /// submitters start blocking.
    pub queue_depth: usize,
}

impl Config {
    /// Reads the configuration from the `AIOFS_WORKER_THREADS` and
    /// `AIOFS_QUEUE_DEPTH` environment variables.
    ///
    /// Unset variables keep their [`Default`] values.
    pub fn from_env() -> Result<Self, BadConfiguration> {
        let mut config = Self::default();

        if let Some(workers) = env_var(AIOFS_WORKER_THREADS, "an integer")? {
            config.workers = workers;
        }
        if let Some(depth) = env_var(AIOFS_QUEUE_DEPTH, "a natural number")? {
            config.queue_depth = depth;
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

/// Turns a requested worker count into the effective one.
fn effective_size(n: isize) -> usize {
    let cpus = sys::hardware_parallelism();

    let size = match n {
        -1 => cpus,
        n if n < 1 => {
            log::warn!("The number of I/O workers is less than 1, setting to 1");
            1
        }
        n => n as usize,
    };

    if size > cpus {
        log::warn!("The number of I/O workers ({size}) exceeds the number of CPUs ({cpus})");
    }

    size
}

/// A cloneable handle for submitting operations to an [`Executor`].
///
/// Every [`File`] keeps one of these to reach the executor that
/// opened it.
#[derive(Clone, Debug)]
pub struct Queue {
    tx: Sender<Operation>,
}

impl Queue {
    /// Submits an operation, blocking while the queue is full.
    ///
    /// When the executor is gone, the operation is dropped and its
    /// response reports [`Error::Disconnected`](crate::Error::Disconnected).
    pub fn submit(&self, op: Operation) {
        if let Err(SendError(op)) = self.tx.send(op) {
            log::debug!("Dropping {} operation for a stopped executor", op.name());
        }
    }
}

/// A pool of worker threads carrying out file operations.
///
/// Operations are dispatched from a bounded queue in FIFO order. With
/// more than one worker, they may complete in any order.
///
/// Dropping the executor stops all its workers after they finished
/// their current operation. Operations still in the queue at that
/// point are discarded and their responses report
/// [`Error::Disconnected`](crate::Error::Disconnected).
pub struct Executor {
    queue: Queue,
    rx: Receiver<Operation>,
    // Only held while resizing, never while dispatching.
    workers: Mutex<Vec<Worker>>,
    next_id: AtomicUsize,
}

impl Executor {
    /// Creates an executor with `workers` threads and room for
    /// `queue_depth` pending operations.
    ///
    /// See [`Executor::set_size`] for the interpretation of `workers`.
    pub fn new(workers: isize, queue_depth: usize) -> Result<Self> {
        Self::with_config(Config {
            workers,
            queue_depth,
        })
    }

    /// Creates an executor from the given [`Config`].
    pub fn with_config(config: Config) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(config.queue_depth);
        let this = Self {
            queue: Queue { tx },
            rx,
            workers: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        };

        this.set_size(config.workers)?;
        Ok(this)
    }

    /// Gets the process-wide executor.
    ///
    /// It is created on first use from [`Config::from_env`], falling
    /// back to the defaults when the environment is misconfigured.
    ///
    /// # Panics
    ///
    /// Panics when the initial worker threads cannot be spawned.
    pub fn global() -> &'static Executor {
        static GLOBAL: OnceLock<Executor> = OnceLock::new();

        GLOBAL.get_or_init(|| {
            let config = Config::from_env().unwrap_or_else(|e| {
                log::warn!("{e}; using the default configuration");
                Config::default()
            });

            Executor::with_config(config)
                .unwrap_or_else(|e| panic!("failed to start the global executor: {e}"))
        })
    }

    /// Sets the number of worker threads and returns the effective
    /// number.
    ///
    /// `-1` selects the hardware parallelism. `0` and other negative
    /// values are raised to 1 with a warning.
    ///
    /// Shrinking waits for the removed workers to finish the operation
    /// they are currently processing.
    pub fn set_size(&self, n: isize) -> Result<usize> {
        let size = effective_size(n);
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);

        match size.cmp(&workers.len()) {
            Ordering::Equal => {}

            Ordering::Greater => {
                log::debug!("Growing executor from {} to {size} workers", workers.len());

                let grow = size - workers.len();
                workers.reserve(grow);
                while workers.len() < size {
                    let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
                    workers.push(Worker::spawn(id, self.rx.clone())?);
                }
            }

            Ordering::Less => {
                log::debug!("Shrinking executor from {} to {size} workers", workers.len());

                // Signal all retiring workers first so they wind down
                // in parallel, then wait for each one.
                let retiring = &mut workers[size..];
                retiring.iter_mut().for_each(Worker::signal);
                retiring.iter_mut().for_each(Worker::join);

                workers.truncate(size);
            }
        }

        Ok(size)
    }

    /// Gets the number of live worker threads.
    pub fn size(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Gets the number of operations waiting in the queue.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Gets a handle for submitting operations to this executor.
    pub fn queue_handle(&self) -> Queue {
        self.queue.clone()
    }

    /// Submits an operation, blocking while the queue is full.
    pub fn queue(&self, op: Operation) {
        self.queue.submit(op);
    }

    /// Opens a file with the given flags and permission bits.
    pub fn open<P: AsRef<Path>>(&self, path: P, flags: OpenFlags, mode: u32) -> Result<File> {
        self.open_async(path, flags, mode).wait()?.take()
    }

    /// Queues opening a file.
    ///
    /// The [`File`] from a successful open submits its own operations
    /// to this executor.
    pub fn open_async<P: AsRef<Path>>(
        &self,
        path: P,
        flags: OpenFlags,
        mode: u32,
    ) -> Response<PoolRef<Reply<File>>> {
        let mut req = pools().open_request();
        let resp = req.populate(path.as_ref(), flags, mode, self.queue_handle());

        self.queue(Operation::Open(req));
        resp
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("size", &self.size())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        let workers = self.workers.get_mut().unwrap_or_else(PoisonError::into_inner);
        workers.iter_mut().for_each(Worker::signal);
        workers.drain(..).for_each(drop);

        // Queued operations hold files which keep the channel alive,
        // so they have to be dropped by hand to disconnect their
        // responses.
        self.rx.try_iter().for_each(drop);
    }
}
