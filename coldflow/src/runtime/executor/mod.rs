//! Worker threads of an execution context.
//!
//! - [`core`]: starts the workers of one context and joins them on shutdown,
//! - [`worker`]: the per-thread loop (local queue, injector, stealing, park).

pub(crate) mod core;
pub(crate) mod worker;
