//! Unbounded blocking FIFO shared by submitters and workers.

use super::work_item::WorkItem;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) struct WorkQueue {
    inner: Mutex<QueueInner>,
    not_empty: Condvar,
    total_enqueued: AtomicU64,
}

struct QueueInner {
    items: VecDeque<WorkItem>,
    closed: bool,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            total_enqueued: AtomicU64::new(0),
        }
    }

    /// Appends `item`. Never blocks; fails only once the queue is closed.
    pub fn push(&self, item: WorkItem) -> Result<()> {
        let mut guard = self.inner.lock();
        if guard.closed {
            return Err(Error::ShutDown);
        }
        guard.items.push_back(item);
        self.total_enqueued.fetch_add(1, Ordering::Relaxed);
        drop(guard);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocks until an item is available. Returns `None` once the queue is
    /// closed and everything enqueued before the close has been handed out.
    pub fn pop(&self) -> Option<WorkItem> {
        let mut guard = self.inner.lock();
        loop {
            if let Some(item) = guard.items.pop_front() {
                return Some(item);
            }
            if guard.closed {
                return None;
            }
            self.not_empty.wait(&mut guard);
        }
    }

    /// Stops accepting new items and wakes every blocked `pop`.
    pub fn close(&self) {
        let mut guard = self.inner.lock();
        guard.closed = true;
        drop(guard);

        self.not_empty.notify_all();
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.lock();
        f.debug_struct("WorkQueue")
            .field("len", &guard.items.len())
            .field("closed", &guard.closed)
            .finish()
    }
}
