//! Synchronization primitives used by flow stages.
//!
//! - [`channel`]: the bounded single-producer/single-consumer buffer that
//!   decouples a producer task from the collecting task, including the
//!   capacity-0 rendezvous,
//! - [`cancel`]: the cooperative cancellation token shared by every task
//!   of a collection run.
//!
//! Both park tasks by storing their [`Waker`](std::task::Waker) behind a
//! short-lived `std::sync::Mutex`; no thread ever blocks waiting for
//! another task.

pub(crate) mod cancel;
pub(crate) mod channel;

pub(crate) use cancel::CancelToken;
pub(crate) use channel::{Sender, channel};
