//! Counting gate used to signal result availability

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A counting semaphore that can be closed.
///
/// [`acquire`](Self::acquire) blocks until the count is positive and takes
/// one unit; [`release`](Self::release) adds one unit and wakes waiters.
/// After [`close`](Self::close) both operations return immediately, so no
/// thread is left blocked on a gate whose producer has gone away.
///
/// # Example
///
/// ```rust
/// use rust_task_pool::WaitGate;
/// use std::sync::Arc;
/// use std::thread;
///
/// let gate = Arc::new(WaitGate::new(0));
/// let producer = Arc::clone(&gate);
///
/// thread::spawn(move || producer.release());
/// gate.acquire();
/// assert_eq!(gate.available(), 0);
/// ```
#[derive(Debug, Default)]
pub struct WaitGate {
    count: Mutex<usize>,
    cond: Condvar,
    closed: AtomicBool,
}

impl WaitGate {
    /// Create a gate holding `initial` units.
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            cond: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Block until a unit is available and take it.
    ///
    /// Returns immediately without taking anything once the gate is closed.
    pub fn acquire(&self) {
        if self.is_closed() {
            return;
        }

        let mut count = self.count.lock();
        while *count == 0 {
            if self.is_closed() {
                return;
            }
            self.cond.wait(&mut count);
        }
        *count -= 1;
    }

    /// Take a unit if one is available, without blocking.
    pub fn try_acquire(&self) -> bool {
        if self.is_closed() {
            return false;
        }

        let mut count = self.count.lock();
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Wait up to `timeout` for a unit. Returns true if one was taken.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        if self.is_closed() {
            return false;
        }

        // None means the deadline is beyond what Instant can represent.
        let deadline = Instant::now().checked_add(timeout);
        let mut count = self.count.lock();
        while *count == 0 {
            if self.is_closed() {
                return false;
            }
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut count, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cond.wait(&mut count),
            }
        }

        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Add a unit and wake waiters. No-op once closed.
    pub fn release(&self) {
        if self.is_closed() {
            return;
        }

        let mut count = self.count.lock();
        *count += 1;
        self.cond.notify_all();
    }

    /// Close the gate and wake every waiter.
    pub fn close(&self) {
        // Taking the lock orders the flag against waiters that are between
        // their closed check and the condvar wait.
        let _count = self.count.lock();
        self.closed.store(true, Ordering::Release);
        self.cond.notify_all();
    }

    /// Returns true once the gate has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Units currently available.
    pub fn available(&self) -> usize {
        *self.count.lock()
    }
}
