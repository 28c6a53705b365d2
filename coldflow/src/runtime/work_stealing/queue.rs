use crate::runtime::task::Runnable;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A per-worker task queue.
///
/// The owning worker pushes and pops at the back (LIFO) for cache
/// locality; other workers of the same context steal from the front.
pub(crate) struct LocalQueue {
    /// Queued tasks; the owner works the back, thieves the front.
    inner: Mutex<VecDeque<Arc<dyn Runnable>>>,
}

impl LocalQueue {
    /// Creates an empty queue.
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Pushes a task at the back; called by the owning worker, or by a
    /// task spawning onto its own context.
    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        self.inner.lock().unwrap().push_back(task);
    }

    /// Pops the most recently pushed task, if any.
    pub(crate) fn pop(&self) -> Option<Arc<dyn Runnable>> {
        self.inner.lock().unwrap().pop_back()
    }

    /// Takes the oldest task, for a sibling worker with nothing to do.
    pub(crate) fn steal(&self) -> Option<Arc<dyn Runnable>> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Aborts and drops every queued task.
    pub(crate) fn clear(&self) {
        let drained: Vec<_> = self.inner.lock().unwrap().drain(..).collect();
        for task in drained {
            task.abort();
        }
    }
}
