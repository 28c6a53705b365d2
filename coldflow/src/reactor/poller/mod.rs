//! Platform-specific parking for the reactor thread.
//!
//! The reactor only needs two things from the operating system: block
//! until a timeout expires, and be interrupted early from another thread.
//!
//! - Linux uses `epoll` with an `eventfd` wake source.
//! - Every other target falls back to a mutex/condvar pair.

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(not(target_os = "linux"))]
mod condvar;

#[cfg(target_os = "linux")]
pub(crate) use epoll::{EpollPoller as Poller, EventFdWaker as PollerWaker};

#[cfg(not(target_os = "linux"))]
pub(crate) use condvar::{CondvarPoller as Poller, CondvarWaker as PollerWaker};
