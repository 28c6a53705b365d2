use crate::runtime::task::Runnable;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// How long an idle worker sleeps before looking for stealable work again.
const PARK_TIMEOUT: Duration = Duration::from_millis(1);

/// Context-wide task queue.
///
/// Tasks spawned from outside the context, and tasks woken by timers or
/// by other contexts, land here before a worker of the context picks them
/// up. Idle workers park on the queue's condition variable.
pub(crate) struct Injector {
    queue: Mutex<VecDeque<Arc<dyn Runnable>>>,
    condvar: Condvar,
    shutdown: AtomicBool,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Injector {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Stops accepting tasks and wakes every parked worker.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Queues a task and wakes one parked worker.
    ///
    /// Once the context is shut down the task is aborted instead, so that
    /// whoever awaits it observes a cancellation rather than hanging.
    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        {
            let mut queue = self.queue.lock().unwrap();
            if !self.is_shutdown() {
                queue.push_back(task);
                drop(queue);
                self.condvar.notify_one();
                return;
            }
        }

        task.abort();
    }

    /// Parks the calling worker until a task is pushed, the context shuts
    /// down, or [`PARK_TIMEOUT`] elapses.
    pub(crate) fn park(&self) {
        let queue = self.queue.lock().unwrap();

        if self.is_shutdown() || !queue.is_empty() {
            return;
        }

        let _ = self.condvar.wait_timeout(queue, PARK_TIMEOUT).unwrap();
    }

    /// Takes the oldest queued task.
    pub(crate) fn steal(&self) -> Option<Arc<dyn Runnable>> {
        self.queue.lock().unwrap().pop_front()
    }

    /// Aborts and drops every queued task.
    pub(crate) fn clear(&self) {
        let drained: Vec<_> = self.queue.lock().unwrap().drain(..).collect();
        for task in drained {
            task.abort();
        }
    }
}
