use crate::runtime::execution::ExecutionContext;
use crate::runtime::executor::worker::Worker;
use crate::runtime::work_stealing::queue::LocalQueue;

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

/// The worker threads serving one [`ExecutionContext`].
///
/// Tasks are stored in the context's injector and in the workers' local
/// queues; the executor only owns the threads and tears them down.
pub(crate) struct Executor {
    context: ExecutionContext,
    locals: Arc<Vec<Arc<LocalQueue>>>,
    handles: Vec<JoinHandle<()>>,
}

impl Executor {
    /// Spawns `context.threads()` workers named `coldflow-<context>-<index>`.
    ///
    /// If a thread cannot be spawned, the workers already started are shut
    /// down and joined before the error is returned.
    pub(crate) fn start(context: &ExecutionContext) -> io::Result<Self> {
        let threads = context.threads();
        let locals: Arc<Vec<_>> =
            Arc::new((0..threads).map(|_| Arc::new(LocalQueue::new())).collect());

        let mut executor = Self {
            context: context.clone(),
            locals: locals.clone(),
            handles: Vec::with_capacity(threads),
        };

        for index in 0..threads {
            let worker = Worker::new(index, context.clone(), locals.clone());

            let spawned = thread::Builder::new()
                .name(format!("coldflow-{}-{index}", context.name()))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => executor.handles.push(handle),
                Err(err) => {
                    executor.shutdown();
                    executor.join();
                    return Err(err);
                }
            }
        }

        debug!(context = context.name(), threads, "execution context started");

        Ok(executor)
    }

    pub(crate) fn shutdown(&self) {
        self.context.shutdown();
    }

    /// Waits for every worker to exit, then aborts the tasks left behind.
    ///
    /// A worker never joins itself: dropping the runtime from inside one of
    /// its own tasks only detaches that thread.
    pub(crate) fn join(&mut self) {
        let current = thread::current().id();

        for handle in self.handles.drain(..) {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }

        for local in self.locals.iter() {
            local.clear();
        }
        self.context.injector().clear();

        debug!(context = self.context.name(), "execution context stopped");
    }
}
