//! Asynchronous task primitives.
//!
//! A task is a spawned future pinned to the execution context it was
//! spawned on. This module contains:
//! - task state management and the custom waker,
//! - [`JoinHandle`] for awaiting (or aborting) a task,
//! - [`spawn`], which targets the execution context of the caller.

pub(crate) mod core;
pub(crate) mod handle;
pub(crate) mod state;
pub(crate) mod waker;

pub(crate) use self::core::{Runnable, Task};
pub(crate) use handle::AbortOnDrop;

pub use self::core::spawn;
pub use handle::JoinHandle;
