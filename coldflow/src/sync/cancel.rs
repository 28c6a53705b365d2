use crate::error::{FlowError, FlowResult};

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// Cooperative cancellation shared by every task of a collection run.
///
/// Cancelling is sticky and idempotent. Futures wrapped with
/// [`guard`](Self::guard) are dropped at their next poll after the token
/// is cancelled, which is how producers running on other contexts are
/// stopped at their next suspension point.
#[derive(Clone, Default)]
pub(crate) struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    next_slot: AtomicUsize,
    waiters: Mutex<Vec<(usize, Waker)>>,
}

impl CancelToken {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes every guarded future.
    ///
    /// Returns `false` if it was already cancelled.
    pub(crate) fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }

        let waiters = std::mem::take(&mut *self.inner.waiters.lock().unwrap());
        for (_, waker) in waiters {
            waker.wake();
        }

        true
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once the token is cancelled.
    pub(crate) fn check(&self) -> FlowResult {
        if self.is_cancelled() {
            Err(FlowError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Wraps `future` so that it stops being polled, and is dropped, as
    /// soon as the token is cancelled.
    pub(crate) fn guard<F: Future>(&self, future: F) -> WithCancel<F> {
        WithCancel {
            token: self.clone(),
            future: Some(Box::pin(future)),
            slot: None,
        }
    }

    fn register(&self, slot: &mut Option<usize>, waker: &Waker) {
        let mut waiters = self.inner.waiters.lock().unwrap();

        if let Some(id) = *slot {
            if let Some(entry) = waiters.iter_mut().find(|(s, _)| *s == id) {
                if !entry.1.will_wake(waker) {
                    entry.1 = waker.clone();
                }
                return;
            }
        }

        let id = self.inner.next_slot.fetch_add(1, Ordering::Relaxed);
        waiters.push((id, waker.clone()));
        *slot = Some(id);
    }

    fn deregister(&self, slot: &mut Option<usize>) {
        if let Some(id) = slot.take() {
            self.inner.waiters.lock().unwrap().retain(|(s, _)| *s != id);
        }
    }
}

/// Future returned by [`CancelToken::guard`].
pub(crate) struct WithCancel<F> {
    token: CancelToken,
    future: Option<Pin<Box<F>>>,
    slot: Option<usize>,
}

impl<F> WithCancel<F> {
    fn stop(&mut self) -> Poll<Result<F::Output, FlowError>>
    where
        F: Future,
    {
        self.future = None;
        self.token.deregister(&mut self.slot);
        Poll::Ready(Err(FlowError::Cancelled))
    }
}

impl<F: Future> Future for WithCancel<F> {
    type Output = Result<F::Output, FlowError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.token.is_cancelled() {
            return this.stop();
        }

        let Some(future) = this.future.as_mut() else {
            return Poll::Ready(Err(FlowError::Cancelled));
        };

        let poll = future.as_mut().poll(cx);
        if let Poll::Ready(output) = poll {
            this.future = None;
            this.token.deregister(&mut this.slot);
            return Poll::Ready(Ok(output));
        }

        this.token.register(&mut this.slot, cx.waker());

        // A cancel racing with the registration above must not be missed.
        if this.token.is_cancelled() {
            return this.stop();
        }

        Poll::Pending
    }
}

impl<F> Drop for WithCancel<F> {
    fn drop(&mut self) {
        self.token.deregister(&mut self.slot);
    }
}
