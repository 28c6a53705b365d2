//! Portable poller built on a mutex/condvar pair.

use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

pub(crate) struct CondvarPoller {
    waker: Arc<CondvarWaker>,
}

/// Interrupts a parked [`CondvarPoller`] from any thread.
pub(crate) struct CondvarWaker {
    notified: Mutex<bool>,
    condvar: Condvar,
}

impl CondvarWaker {
    pub(crate) fn wake(&self) {
        *self.notified.lock().unwrap() = true;
        self.condvar.notify_one();
    }
}

impl CondvarPoller {
    pub(crate) fn new() -> io::Result<Self> {
        Ok(Self {
            waker: Arc::new(CondvarWaker {
                notified: Mutex::new(false),
                condvar: Condvar::new(),
            }),
        })
    }

    pub(crate) fn waker(&self) -> Arc<CondvarWaker> {
        self.waker.clone()
    }

    /// Blocks until woken or until `timeout` elapses (`None` waits forever).
    pub(crate) fn park(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let mut notified = self.waker.notified.lock().unwrap();

        if !*notified {
            notified = match timeout {
                Some(t) => self.waker.condvar.wait_timeout(notified, t).unwrap().0,
                None => self.waker.condvar.wait(notified).unwrap(),
            };
        }

        *notified = false;
        Ok(())
    }
}
