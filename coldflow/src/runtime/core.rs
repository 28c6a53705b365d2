use super::builder::{MAIN, RuntimeBuilder};
use super::execution::ExecutionContext;
use super::executor::core::Executor;
use crate::error::JoinError;
use crate::reactor::command::Command;
use crate::reactor::{Reactor, ReactorHandle};
use crate::runtime::task::JoinHandle;

use std::future::Future;
use std::io;
use std::thread;

use tracing::debug;

/// The runtime: one timer reactor plus a set of named execution contexts.
///
/// Dropping the runtime shuts every context down, aborts the tasks that
/// are still queued and joins all threads.
pub struct Runtime {
    main: ExecutionContext,
    contexts: Vec<ExecutionContext>,
    executors: Vec<Executor>,
    reactor: ReactorHandle,
    reactor_thread: Option<thread::JoinHandle<()>>,
}

impl Runtime {
    /// Creates a runtime with the default context layout.
    pub fn new() -> io::Result<Self> {
        RuntimeBuilder::new().build()
    }

    /// Returns a builder to customise contexts and the observer.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub(crate) fn with_builder(builder: RuntimeBuilder) -> io::Result<Self> {
        let (reactor, reactor_thread) = Reactor::start()?;

        let contexts: Vec<_> = builder
            .contexts
            .iter()
            .map(|(name, threads)| {
                ExecutionContext::new(name, *threads, reactor.clone(), builder.observer.clone())
            })
            .collect();

        let main = contexts
            .iter()
            .find(|c| c.name() == MAIN)
            .cloned()
            .ok_or_else(|| io::Error::other("runtime has no main context"))?;

        let mut runtime = Self {
            main,
            contexts,
            executors: Vec::new(),
            reactor,
            reactor_thread: Some(reactor_thread),
        };

        // On failure `runtime` is dropped, which stops what already started.
        for context in runtime.contexts.clone() {
            let executor = Executor::start(&context)?;
            runtime.executors.push(executor);
        }

        debug!(contexts = runtime.contexts.len(), "runtime started");

        Ok(runtime)
    }

    /// The single-threaded `main` context.
    pub fn main(&self) -> &ExecutionContext {
        &self.main
    }

    /// Looks a context up by name.
    pub fn context(&self, name: &str) -> Option<&ExecutionContext> {
        self.contexts.iter().find(|c| c.name() == name)
    }

    /// Every context of the runtime, in creation order.
    pub fn contexts(&self) -> &[ExecutionContext] {
        &self.contexts
    }

    /// Spawns a future on the `main` context.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.main.spawn(future)
    }

    /// Runs a future to completion on the `main` context, blocking the
    /// current thread.
    ///
    /// # Panics
    ///
    /// Panics if called from a runtime worker, if the future panics (the
    /// panic message is re-raised) or if the runtime shuts down first.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = runtime.block_on(async {
    ///     42
    /// });
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        assert!(
            ExecutionContext::current().is_none(),
            "cannot block_on from within a runtime worker"
        );

        match self.spawn(future).wait() {
            Ok(output) => output,
            Err(JoinError::Panicked(message)) => panic!("{message}"),
            Err(JoinError::Cancelled) => panic!("runtime shut down before block_on completed"),
        }
    }
}

impl Drop for Runtime {
    /// Shuts down the runtime.
    ///
    /// 1. Stops task submission on every context and wakes the workers
    /// 2. Sends a shutdown command to the reactor
    /// 3. Joins the workers, then the reactor thread
    fn drop(&mut self) {
        for context in &self.contexts {
            context.shutdown();
        }

        let _ = self.reactor.send(Command::Shutdown);

        for executor in &mut self.executors {
            executor.join();
        }

        if let Some(handle) = self.reactor_thread.take() {
            let _ = handle.join();
        }

        debug!("runtime shut down");
    }
}
