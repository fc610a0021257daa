use parking_lot::{Condvar, Mutex};

/// CPU-side binary semaphore gating the render thread on the next produced render frame (§5,
/// mirrors `App`'s `m_frameAvailableSemaphore`). `signal` is idempotent: signalling twice before a
/// `wait` leaves the semaphore signalled once, matching a real binary (not counting) semaphore.
pub struct BinarySemaphore {
    signalled: Mutex<bool>,
    condvar: Condvar,
}

impl BinarySemaphore {
    pub fn new() -> Self {
        BinarySemaphore {
            signalled: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub fn signal(&self) {
        let mut signalled = self.signalled.lock();
        *signalled = true;
        self.condvar.notify_one();
    }

    pub fn wait(&self) {
        let mut signalled = self.signalled.lock();
        while !*signalled {
            self.condvar.wait(&mut signalled);
        }
        *signalled = false;
    }

    /// Waits up to `timeout` for a signal; returns `false` on timeout without consuming anything.
    /// Used by the render thread so it can still observe `should_close` without a dedicated
    /// shutdown wakeup.
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        let mut signalled = self.signalled.lock();
        if !*signalled {
            self.condvar.wait_for(&mut signalled, timeout);
        }
        if *signalled {
            *signalled = false;
            true
        } else {
            false
        }
    }
}

impl Default for BinarySemaphore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn wait_blocks_until_signalled() {
        let semaphore = Arc::new(BinarySemaphore::new());
        let waiter = semaphore.clone();
        let handle = std::thread::spawn(move || waiter.wait());

        std::thread::sleep(Duration::from_millis(20));
        semaphore.signal();
        handle.join().unwrap();
    }

    #[test]
    fn double_signal_wakes_only_once() {
        let semaphore = BinarySemaphore::new();
        semaphore.signal();
        semaphore.signal();
        semaphore.wait();
        assert!(!*semaphore.signalled.lock());
    }
}
