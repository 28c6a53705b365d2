//! # coldflow
//!
//! **coldflow** is a cold asynchronous streams engine with its own small
//! runtime. A [`Flow`] describes how values are produced; collecting it runs
//! the producer, and every collection runs it again from the start.
//!
//! The runtime is organised in named execution contexts, each with its own
//! worker threads:
//!
//! - **`main`**: one thread, where consumer callbacks are usually run,
//! - **`default`**: one thread per logical CPU,
//! - **`io`**: four threads for producers that wait on the outside world.
//!
//! Stages decide where and how far ahead the producer runs:
//!
//! - [`Flow::buffer`] decouples producer and consumer through a bounded
//!   channel,
//! - [`Flow::on`] moves the producer to another context,
//! - [`Flow::launch`] starts a collection and returns a [`RunHandle`] that
//!   can cancel it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coldflow::time::sleep;
//! use coldflow::{ExecutionContext, flow};
//! use std::time::Duration;
//!
//! #[coldflow::main]
//! async fn main() {
//!     let main = ExecutionContext::current().unwrap();
//!
//!     let numbers = flow(|mut out| async move {
//!         for i in 0..4 {
//!             sleep(Duration::from_millis(300)).await;
//!             out.emit(i).await?;
//!         }
//!         Ok(())
//!     });
//!
//!     numbers
//!         .collect(&main, |n| async move {
//!             println!("collected {n}");
//!             Ok(())
//!         })
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`flow`]: flows, stages and collection
//! - [`task`]: spawning and joining tasks
//! - [`time`]: sleep, timeout and instrumentation
//!
//! ## Logging
//!
//! coldflow logs through [`tracing`]: runs, context switches and worker
//! lifecycle at `debug`, individual emissions and deliveries at `trace`,
//! failed runs at `warn`. No subscriber is installed by the library.

mod error;
mod reactor;
mod runtime;
mod sync;

pub mod flow;
pub mod time;

pub use error::{BoxError, Elapsed, FlowError, FlowResult, JoinError, SharedError};
pub use flow::{
    BUFFERED, Collector, EventKind, Flow, FlowEvent, Outcome, RunHandle, RunOutcome,
    channel_flow, collect, flow, flow_of,
};
pub use runtime::task;
pub use runtime::{DEFAULT, ExecutionContext, IO, MAIN, Runtime, RuntimeBuilder};

pub use coldflow_macros::{main, test};
