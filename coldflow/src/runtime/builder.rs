use super::Runtime;
use crate::flow::{FlowEvent, Observer};

use std::io;
use std::sync::Arc;
use std::thread;

/// Name of the single-threaded context that serializes consumer callbacks.
pub const MAIN: &str = "main";

/// Name of the CPU-bound pool, one thread per logical CPU by default.
pub const DEFAULT: &str = "default";

/// Name of the pool meant for blocking-ish or I/O-bound producers.
pub const IO: &str = "io";

const DEFAULT_IO_THREADS: usize = 4;

/// Builder for configuring and creating a runtime.
///
/// Every runtime has at least the [`MAIN`], [`DEFAULT`] and [`IO`]
/// contexts; extra named contexts can be added with
/// [`context`](Self::context).
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .worker_threads(4)
///     .context("sensors", 2)
///     .observer(|event| println!("{event:?}"))
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    /// Context names and thread counts, in creation order.
    pub(crate) contexts: Vec<(String, usize)>,

    /// Hook invoked for every flow event of the runtime.
    pub(crate) observer: Option<Observer>,
}

impl RuntimeBuilder {
    /// Creates a builder with the default context layout.
    ///
    /// The `default` pool gets one thread per logical CPU, falling back to
    /// `1` if that number is unavailable.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            contexts: vec![
                (MAIN.to_string(), 1),
                (DEFAULT.to_string(), worker_threads),
                (IO.to_string(), DEFAULT_IO_THREADS),
            ],
            observer: None,
        }
    }

    /// Sets the number of threads of the `default` context.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");
        self.context(DEFAULT, n)
    }

    /// Sets the number of threads of the `io` context.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn io_threads(self, n: usize) -> Self {
        assert!(n > 0, "io_threads must be > 0");
        self.context(IO, n)
    }

    /// Adds a named context, or resizes an existing one.
    ///
    /// # Panics
    ///
    /// Panics if `threads == 0`, or if `name` is [`MAIN`] and `threads` is
    /// not `1`: the main context is single-threaded by definition.
    pub fn context(mut self, name: impl Into<String>, threads: usize) -> Self {
        let name = name.into();

        assert!(threads > 0, "context `{name}` needs at least one thread");
        assert!(
            name != MAIN || threads == 1,
            "the `{MAIN}` context is single-threaded"
        );

        match self.contexts.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = threads,
            None => self.contexts.push((name, threads)),
        }

        self
    }

    /// Installs a hook called for every [`FlowEvent`] of the runtime's runs.
    ///
    /// The hook runs inline on whichever worker produced the event, so it
    /// must be quick and must not block.
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&FlowEvent) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Builds the runtime, starting the reactor and every context's workers.
    pub fn build(self) -> io::Result<Runtime> {
        Runtime::with_builder(self)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
