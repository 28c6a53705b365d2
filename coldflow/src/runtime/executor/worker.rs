use crate::runtime::context::{CURRENT_WORKER, WorkerSlot, enter_context};
use crate::runtime::execution::ExecutionContext;
use crate::runtime::task::Runnable;
use crate::runtime::work_stealing::queue::LocalQueue;

use std::sync::Arc;

use tracing::trace;

/// One worker thread of an execution context.
///
/// Work is looked up in this order:
/// 1. the worker's own local queue,
/// 2. the context's injector,
/// 3. the local queues of the other workers of the same context,
/// 4. otherwise the worker parks on the injector.
pub(crate) struct Worker {
    index: usize,
    context: ExecutionContext,
    locals: Arc<Vec<Arc<LocalQueue>>>,
}

impl Worker {
    pub(crate) fn new(
        index: usize,
        context: ExecutionContext,
        locals: Arc<Vec<Arc<LocalQueue>>>,
    ) -> Self {
        Self {
            index,
            context,
            locals,
        }
    }

    /// Runs the worker loop until the context shuts down.
    pub(crate) fn run(self) {
        CURRENT_WORKER.with(|slot| {
            *slot.borrow_mut() = Some(WorkerSlot {
                context: self.context.id(),
                index: self.index,
                locals: self.locals.clone(),
            })
        });

        trace!(context = self.context.name(), index = self.index, "worker started");

        enter_context(&self.context, || {
            let injector = self.context.injector();

            while !injector.is_shutdown() {
                let next = self.locals[self.index]
                    .pop()
                    .or_else(|| injector.steal())
                    .or_else(|| self.try_steal());

                match next {
                    Some(task) => task.run(),
                    None => injector.park(),
                }
            }
        });

        CURRENT_WORKER.with(|slot| slot.borrow_mut().take());

        trace!(context = self.context.name(), index = self.index, "worker stopped");
    }

    /// Steals from the other workers, starting with the next index so that
    /// victims are visited round-robin.
    fn try_steal(&self) -> Option<Arc<dyn Runnable>> {
        let len = self.locals.len();

        (1..len)
            .map(|offset| (self.index + offset) % len)
            .find_map(|victim| self.locals[victim].steal())
    }
}
