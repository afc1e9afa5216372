use std::{
    io,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{select, Receiver, Sender, TryRecvError};

use crate::Operation;

const WORKER_NAME: &str = "aiofs-worker";
const WORKER_STACK: usize = 1_048_576;

/// A background thread which processes operations from the shared
/// queue until it is told to stop.
pub(super) struct Worker {
    id: usize,
    // Dropping the sender is the stop signal.
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(id: usize, queue: Receiver<Operation>) -> io::Result<Self> {
        let (stop, stopped) = crossbeam_channel::bounded(0);
        let thread = thread::Builder::new()
            .name(format!("{WORKER_NAME}-{id}"))
            .stack_size(WORKER_STACK)
            .spawn(move || run(id, queue, stopped))?;

        Ok(Self {
            id,
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    /// Tells the worker to stop once its current operation is done.
    pub fn signal(&mut self) {
        self.stop.take();
    }

    /// Waits for the worker thread to exit.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Worker {} panicked", self.id);
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.signal();
        self.join();
    }
}

fn run(id: usize, queue: Receiver<Operation>, stopped: Receiver<()>) {
    log::debug!("Worker {id} started");

    loop {
        // A busy queue must not delay the stop signal indefinitely.
        if let Err(TryRecvError::Disconnected) = stopped.try_recv() {
            break;
        }

        select! {
            // Nothing is ever sent here; the channel only disconnects.
            recv(stopped) -> _ => break,

            recv(queue) -> op => match op {
                Ok(op) => op.process(),
                Err(_) => break,
            },
        }
    }

    log::debug!("Worker {id} stopped");
}
