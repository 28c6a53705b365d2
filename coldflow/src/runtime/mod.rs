//! Execution contexts and the scheduler behind them.
//!
//! A [`Runtime`] owns one reactor thread plus a set of named
//! [`ExecutionContext`]s. Every context is an independent executor with
//! its own worker threads, global injector and per-worker local queues;
//! tasks never migrate between contexts, so a task spawned on `main`
//! always runs on the single `main` thread.
//!
//! It is responsible for:
//! - executing asynchronous tasks on the context they were spawned on,
//! - managing task queues and work stealing inside a context,
//! - providing the thread-local context used by [`sleep`](crate::time::sleep)
//!   and [`task::spawn`].

mod core;
mod execution;
mod executor;
pub(crate) mod park;
mod work_stealing;

pub(crate) mod builder;
pub(crate) mod context;

pub mod task;

pub use builder::{DEFAULT, IO, MAIN, RuntimeBuilder};
pub use self::core::Runtime;
pub use execution::ExecutionContext;
