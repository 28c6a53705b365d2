use crate::reactor::ReactorHandle;
use crate::runtime::execution::ExecutionContext;
use crate::runtime::work_stealing::queue::LocalQueue;

use std::cell::RefCell;
use std::sync::Arc;

/// Identity of the worker thread currently running, if any.
pub(crate) struct WorkerSlot {
    /// Id of the execution context the worker belongs to.
    pub(crate) context: usize,

    /// Index of the worker inside its context.
    pub(crate) index: usize,

    /// Local queues of every worker of the same context.
    pub(crate) locals: Arc<Vec<Arc<LocalQueue>>>,
}

thread_local! {
    /// Reactor of the runtime the current thread belongs to.
    ///
    /// Lets [`sleep`](crate::time::sleep) register timers without an
    /// explicit handle.
    pub(crate) static CURRENT_REACTOR: RefCell<Option<ReactorHandle>> =
        const { RefCell::new(None) };

    /// Execution context served by the current thread.
    pub(crate) static CURRENT_CONTEXT: RefCell<Option<ExecutionContext>> =
        const { RefCell::new(None) };

    /// Set on worker threads only; used for local-queue spawning.
    pub(crate) static CURRENT_WORKER: RefCell<Option<WorkerSlot>> =
        const { RefCell::new(None) };
}

/// Installs `context` (and its reactor) as the current thread's runtime
/// context for the duration of `f`, restoring the previous one afterwards.
pub(crate) fn enter_context<R>(context: &ExecutionContext, f: impl FnOnce() -> R) -> R {
    let prev_reactor = CURRENT_REACTOR.with(|r| r.replace(Some(context.reactor().clone())));
    let prev_context = CURRENT_CONTEXT.with(|c| c.replace(Some(context.clone())));

    let out = f();

    CURRENT_CONTEXT.with(|c| c.replace(prev_context));
    CURRENT_REACTOR.with(|r| r.replace(prev_reactor));

    out
}
