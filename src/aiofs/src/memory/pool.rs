use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use crossbeam_queue::SegQueue;

/// Values which can be kept in a [`Pool`] in-between uses.
pub trait Recycle: Default {
    /// Clears all state that refers to a previous use, such as
    /// buffers, file handles, errors and channels.
    fn reset(&mut self);

    /// Whether the value is worth keeping after [`Recycle::reset`].
    #[inline]
    fn reusable(&self) -> bool {
        true
    }
}

/// A pool which stores values of `T` and hands them out on demand.
///
/// The pool has no upper bound; it holds as many values as were in
/// use at the same time at most.
pub struct Pool<T> {
    queue: SegQueue<T>,
}

impl<T: Recycle> Pool<T> {
    /// Creates a new, empty pool.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: SegQueue::new(),
        })
    }

    /// Gets an element from the pool or creates a new one to
    /// be inserted when the ref is dropped.
    pub fn get(self: Arc<Self>) -> PoolRef<T> {
        let inner = self.queue.pop().unwrap_or_default();

        PoolRef {
            pool: self,
            inner: Some(inner),
        }
    }

    /// Gets the number of idle elements currently in the pool.
    pub fn idle(&self) -> usize {
        self.queue.len()
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.queue.len())
            .finish()
    }
}

/// A reference to a value from a [`Pool`], enabling mutable and
/// immutable access to the element.
///
/// When this value is dropped, the element will be reset and
/// inserted back into the pool.
pub struct PoolRef<T: Recycle> {
    pool: Arc<Pool<T>>,
    inner: Option<T>,
}

impl<T: Recycle> Deref for PoolRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref().unwrap()
    }
}

impl<T: Recycle> DerefMut for PoolRef<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut().unwrap()
    }
}

impl<T: Recycle + fmt::Debug> fmt::Debug for PoolRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: Recycle> Drop for PoolRef<T> {
    fn drop(&mut self) {
        if let Some(mut value) = self.inner.take() {
            value.reset();

            if value.reusable() {
                self.pool.queue.push(value);
            }
        }
    }
}
