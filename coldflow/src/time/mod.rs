//! Timer utilities backed by the runtime reactor.
//!
//! - [`sleep`] suspends the calling task for a duration,
//! - [`timeout`] bounds the execution time of a future,
//! - [`instrumented`] measures how long a future takes to complete.
//!
//! [`ExecutionContext::sleep`](crate::ExecutionContext::sleep) is the
//! explicit-context variant of [`sleep`], usable from any thread.

mod instrumented;
mod sleep;
mod timeout;

#[doc(inline)]
pub use instrumented::{Instrumented, instrumented};

#[doc(inline)]
pub use sleep::{Sleep, sleep};

#[doc(inline)]
pub use timeout::{Timeout, timeout};
