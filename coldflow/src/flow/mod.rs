//! Cold asynchronous streams.
//!
//! A [`Flow`] describes how to produce values; nothing runs until it is
//! collected, and every collection runs the producer again from the start.
//!
//! ```rust,ignore
//! use coldflow::{flow, time::sleep};
//! use std::time::Duration;
//!
//! let numbers = flow(|mut out| async move {
//!     for i in 0..4 {
//!         sleep(Duration::from_millis(300)).await;
//!         out.emit(i).await?;
//!     }
//!     Ok(())
//! });
//!
//! numbers
//!     .buffer(2)
//!     .on(runtime.context(coldflow::IO).unwrap())
//!     .collect(runtime.main(), |n| async move {
//!         println!("{n}");
//!         Ok(())
//!     })
//!     .await?;
//! ```
//!
//! Stages:
//! - [`Flow::buffer`] lets the producer run ahead of the consumer by a
//!   bounded number of values,
//! - [`Flow::on`] moves the producer to another execution context,
//! - [`Flow::map`] and [`Flow::on_each`] transform or observe values inline.
//!
//! Every stage preserves emission order.

mod collector;
mod core;
mod driver;
mod observer;
mod scope;
mod stage;

pub use self::core::{BUFFERED, Flow, channel_flow, flow, flow_of};
pub use collector::Collector;
pub use driver::{RunHandle, RunOutcome, collect};
pub use observer::{EventKind, FlowEvent, Outcome};

pub(crate) use observer::Observer;
