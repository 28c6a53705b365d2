use crate::flow::Observer;
use crate::reactor::ReactorHandle;
use crate::runtime::context::{CURRENT_CONTEXT, CURRENT_WORKER};
use crate::runtime::task::{JoinHandle, Runnable, Task};
use crate::runtime::work_stealing::injector::Injector;
use crate::time::Sleep;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A named pool of worker threads tasks can be scheduled on.
///
/// Contexts are created by a [`Runtime`](crate::Runtime) and are cheap to
/// clone. Tasks never leave the context they were spawned on: a future
/// spawned on `io` is polled only by `io` workers, so code that must stay
/// on one thread simply targets a single-threaded context such as `main`.
///
/// ```rust,ignore
/// let io = runtime.context(coldflow::IO).unwrap().clone();
/// let bytes = io.spawn(async { read_sensor().await }).await?;
/// ```
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: usize,
    name: Arc<str>,
    threads: usize,
    injector: Arc<Injector>,
    reactor: ReactorHandle,
    observer: Option<Observer>,
}

impl ExecutionContext {
    pub(crate) fn new(
        name: &str,
        threads: usize,
        reactor: ReactorHandle,
        observer: Option<Observer>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
                name: Arc::from(name),
                threads,
                injector: Arc::new(Injector::new()),
                reactor,
                observer,
            }),
        }
    }

    /// Name of the context (`"main"`, `"default"`, `"io"` or a custom one).
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        self.inner.name.clone()
    }

    /// Number of worker threads serving the context.
    pub fn threads(&self) -> usize {
        self.inner.threads
    }

    /// Returns the context served by the calling thread, if any.
    pub fn current() -> Option<ExecutionContext> {
        CURRENT_CONTEXT.with(|c| c.borrow().clone())
    }

    /// Returns `true` when called from one of this context's workers.
    pub fn is_current(&self) -> bool {
        CURRENT_CONTEXT.with(|c| c.borrow().as_ref().is_some_and(|c| c == self))
    }

    /// Schedules `future` on this context.
    ///
    /// Spawning from a worker of the same context queues the task locally;
    /// anything else goes through the context's injector. Once the context
    /// is shut down the returned handle resolves to
    /// [`JoinError::Cancelled`](crate::JoinError::Cancelled).
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let task = Arc::new(Task::new(future, self.inner.injector.clone()));
        let handle = JoinHandle { task: task.clone() };

        if self.inner.injector.is_shutdown() {
            task.abort();
            return handle;
        }

        let runnable: Arc<dyn Runnable> = task;
        let runnable = CURRENT_WORKER.with(|slot| match slot.borrow().as_ref() {
            Some(slot) if slot.context == self.inner.id => {
                slot.locals[slot.index].push(runnable);
                None
            }
            _ => Some(runnable),
        });

        if let Some(runnable) = runnable {
            self.inner.injector.push(runnable);
        }

        handle
    }

    /// Completes after `duration`, using this context's runtime timer.
    ///
    /// Unlike [`time::sleep`](crate::time::sleep) this works from any thread,
    /// including threads outside the runtime.
    pub fn sleep(&self, duration: Duration) -> Sleep {
        Sleep::with_reactor(duration, self.inner.reactor.clone())
    }

    pub(crate) fn observer(&self) -> Option<&Observer> {
        self.inner.observer.as_ref()
    }

    pub(crate) fn injector(&self) -> &Arc<Injector> {
        &self.inner.injector
    }

    pub(crate) fn reactor(&self) -> &ReactorHandle {
        &self.inner.reactor
    }

    pub(crate) fn id(&self) -> usize {
        self.inner.id
    }

    /// Stops accepting tasks and wakes the workers so they can exit.
    pub(crate) fn shutdown(&self) {
        self.inner.injector.shutdown();
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ExecutionContext {}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("name", &self.inner.name)
            .field("threads", &self.inner.threads)
            .finish()
    }
}
