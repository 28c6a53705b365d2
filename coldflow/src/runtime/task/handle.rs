use crate::error::JoinError;
use crate::runtime::park;
use crate::runtime::task::Task;
use crate::runtime::task::state::{CANCELLED, COMPLETED};

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

/// A handle to a spawned task.
///
/// A `JoinHandle` resolves to the task's output once it completes, or to a
/// [`JoinError`] if the task panicked or was aborted.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only
/// discards the ability to observe its result.
pub struct JoinHandle<T> {
    pub(crate) task: Arc<Task<T>>,
}

impl<T: Send + 'static> JoinHandle<T> {
    /// Aborts the task.
    ///
    /// A pending future is dropped without being polled again. Awaiting the
    /// handle afterwards yields [`JoinError::Cancelled`], unless the task had
    /// already completed.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Returns `true` once the task completed, panicked or was aborted.
    pub fn is_finished(&self) -> bool {
        matches!(self.task.state.load(Ordering::Acquire), COMPLETED | CANCELLED)
    }

    /// Blocks the current thread until the task finishes.
    ///
    /// Must not be called from a worker of the task's own context when that
    /// context has a single thread: the task could never make progress.
    pub fn wait(self) -> Result<T, JoinError> {
        park::block_on(self)
    }

    fn try_take(&self) -> Option<Result<T, JoinError>> {
        match self.task.state.load(Ordering::Acquire) {
            // Safety: COMPLETED is published after the result is written and
            // only this handle reads it.
            COMPLETED => Some(unsafe {
                (*self.task.result.get())
                    .take()
                    .expect("JoinHandle polled after completion")
            }),
            CANCELLED => Some(Err(JoinError::Cancelled)),
            _ => None,
        }
    }
}

impl<T: Send + 'static> Future for JoinHandle<T> {
    type Output = Result<T, JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.try_take() {
            return Poll::Ready(result);
        }

        {
            let mut waiters = self.task.waiters.lock().unwrap();
            if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
                waiters.push(cx.waker().clone());
            }
        }

        // Re-check: the task may have finished while the waker was registered.
        match self.try_take() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle")
            .field("state", &self.task.state.load(Ordering::Acquire))
            .finish()
    }
}

/// A [`JoinHandle`] that aborts its task when dropped.
///
/// Used for tasks whose only purpose is to serve the future holding the
/// guard, such as the producer task of a buffered stage.
pub(crate) struct AbortOnDrop<T: Send + 'static>(pub(crate) JoinHandle<T>);

impl<T: Send + 'static> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().0).poll(cx)
    }
}

impl<T: Send + 'static> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
