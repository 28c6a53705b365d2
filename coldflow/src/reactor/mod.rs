//! Timer driver.
//!
//! Every runtime owns exactly one reactor thread. It keeps the pending
//! timers of all execution contexts in a min-heap and parks on the
//! platform poller until the earliest deadline expires or a new command
//! arrives. Expired timers are fired by waking the task that registered
//! them; the task is then rescheduled on its own execution context.
//!
//! Runtime users never talk to the reactor directly: they go through
//! [`sleep`](crate::time::sleep) or
//! [`ExecutionContext::sleep`](crate::ExecutionContext::sleep).

mod core;
mod poller;
mod timer;

pub(crate) mod command;

pub(crate) use core::{Reactor, ReactorHandle};
