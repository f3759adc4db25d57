use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Tracks how many of a dispatched batch's jobs are still outstanding.
/// Every job decrements it once on completion; the last one to reach zero
/// wakes anyone parked in [`Counter::wait`].
pub(crate) struct Counter {
    remaining: AtomicUsize,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl Counter {
    pub(crate) fn new(count: usize) -> Arc<Counter> {
        Arc::new(Counter {
            remaining: AtomicUsize::new(count),
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        })
    }

    pub(crate) fn decrement(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.lock.lock();
            self.condvar.notify_all();
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.remaining.load(Ordering::Acquire) == 0
    }

    pub(crate) fn wait(&self) {
        if self.is_done() {
            return;
        }
        // Blocking a worker thread here would otherwise shrink the pool's
        // effective parallelism by one for as long as the wait lasts; a
        // standby thread takes its place for the duration so a dispatched
        // batch can always make progress even from a single-worker pool.
        let _standby = crate::server::standby_worker_for_blocking_wait();
        let mut guard = self.lock.lock();
        while !self.is_done() {
            self.condvar.wait(&mut guard);
        }
    }
}

/// A receipt for a batch of dispatched jobs; blocks on [`JobToken::wait`]
/// until every job in the batch has run to completion.
#[derive(Clone)]
pub struct JobToken(pub(crate) Arc<Counter>);

impl JobToken {
    pub fn wait(&self) {
        self.0.wait();
    }

    pub fn is_done(&self) -> bool {
        self.0.is_done()
    }
}
