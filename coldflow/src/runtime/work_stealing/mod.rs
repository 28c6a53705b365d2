//! Run queues of an execution context.
//!
//! - [`injector`]: the context-wide queue fed by spawns from outside the
//!   context and by wakeups,
//! - [`queue`]: per-worker local queues, LIFO for the owner and FIFO for
//!   thieves.

pub(crate) mod injector;
pub(crate) mod queue;
