use crate::reactor::ReactorHandle;
use crate::reactor::command::Command;
use crate::runtime::context::CURRENT_REACTOR;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Creates a future that completes after the given duration.
///
/// The deadline is fixed when `sleep` is called; the timer is registered
/// with the reactor of the current runtime on first poll.
///
/// # Panics
///
/// Panics if polled from a thread that does not belong to a runtime. Use
/// [`ExecutionContext::sleep`](crate::ExecutionContext::sleep) there.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// sleep(Duration::from_millis(10)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    Sleep::new(duration, None)
}

/// A future that completes once its deadline is reached.
///
/// This future is **cancel-safe**: dropping it before the deadline cancels
/// the timer, and the reactor then discards it without waking anyone.
pub struct Sleep {
    deadline: Instant,

    /// Reactor to register with; `None` means the current thread's one.
    reactor: Option<ReactorHandle>,

    registered: bool,

    /// Shared with the reactor's timer entry.
    cancelled: Arc<AtomicBool>,
}

impl Sleep {
    fn new(duration: Duration, reactor: Option<ReactorHandle>) -> Self {
        Self {
            deadline: Instant::now() + duration,
            reactor,
            registered: false,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn with_reactor(duration: Duration, reactor: ReactorHandle) -> Self {
        Self::new(duration, Some(reactor))
    }

    /// The instant at which the sleep completes.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    fn register(&self, command: Command) {
        if let Some(reactor) = &self.reactor {
            let _ = reactor.send(command);
            return;
        }

        CURRENT_REACTOR.with(|cell| {
            let current = cell.borrow();
            let reactor = current
                .as_ref()
                .expect("`sleep` polled outside of a coldflow runtime");

            let _ = reactor.send(command);
        });
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if Instant::now() >= this.deadline {
            return Poll::Ready(());
        }

        if !this.registered {
            this.registered = true;

            this.register(Command::SetTimer {
                deadline: this.deadline,
                waker: cx.waker().clone(),
                cancelled: this.cancelled.clone(),
            });
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
