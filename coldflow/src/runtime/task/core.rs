use super::JoinHandle;
use super::state::{CANCELLED, COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};
use crate::error::JoinError;
use crate::runtime::execution::ExecutionContext;
use crate::runtime::task::waker::make_waker;
use crate::runtime::work_stealing::injector::Injector;

use std::any::Any;
use std::cell::UnsafeCell;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// A runnable unit of work that can be executed by a worker.
///
/// The `Runnable` trait abstracts the specific return type of a task,
/// allowing the executor to manage a heterogeneous collection of tasks
/// through `Arc<dyn Runnable>`.
pub(crate) trait Runnable: Send + Sync {
    /// Executes the task. This is typically called by a worker thread.
    fn run(self: Arc<Self>);

    /// Cancels the task; used when its context can no longer run it.
    fn abort(&self);
}

type BoxedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A spawned asynchronous task.
///
/// A `Task` owns its future until the future completes, panics or is
/// aborted; after that only the outcome remains, waiting for the
/// [`JoinHandle`].
pub(crate) struct Task<T> {
    /// The underlying future, `None` once it has been released.
    ///
    /// Only the thread that moved the task into `RUNNING` (or that aborted
    /// it while `IDLE`) may touch this cell.
    future: UnsafeCell<Option<BoxedFuture<T>>>,

    /// Outcome published before the state becomes `COMPLETED`.
    pub(crate) result: UnsafeCell<Option<Result<T, JoinError>>>,

    /// Current lifecycle state (see [`state`](super::state)).
    pub(crate) state: AtomicUsize,

    /// Injector of the owning execution context, used for rescheduling.
    injector: Arc<Injector>,

    /// Wakers of the `JoinHandle` awaiting this task.
    pub(crate) waiters: Mutex<Vec<Waker>>,
}

unsafe impl<T: Send> Send for Task<T> {}
unsafe impl<T: Send> Sync for Task<T> {}

impl<T: Send + 'static> Task<T> {
    /// Creates a task in the `QUEUED` state; the caller must push it to a
    /// run queue.
    pub(crate) fn new<F>(future: F, injector: Arc<Injector>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: UnsafeCell::new(Some(Box::pin(future))),
            result: UnsafeCell::new(None),
            state: AtomicUsize::new(QUEUED),
            injector,
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Polls the task once.
    ///
    /// - `Poll::Pending`: back to `IDLE`, or re-queued if woken meanwhile.
    /// - `Poll::Ready`: the output is published and waiters are woken.
    /// - panic: the panic message is published as [`JoinError::Panicked`].
    pub(crate) fn run(self: Arc<Self>) {
        if self
            .state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // A task aborted while sitting in a queue is released here.
            if self.state.load(Ordering::Acquire) == CANCELLED {
                unsafe { self.release() };
            }
            return;
        }

        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        let poll = panic::catch_unwind(AssertUnwindSafe(|| {
            // Safety: the RUNNING state guarantees that no other thread
            // touches the future.
            match unsafe { (*self.future.get()).as_mut() } {
                Some(future) => future.as_mut().poll(&mut cx),
                None => Poll::Pending,
            }
        }));

        match poll {
            Ok(Poll::Pending) => self.park(),
            Ok(Poll::Ready(value)) => self.complete(Ok(value)),
            Err(payload) => self.complete(Err(JoinError::Panicked(panic_message(&*payload)))),
        }
    }

    /// Leaves the `RUNNING` state after a `Poll::Pending`.
    fn park(self: &Arc<Self>) {
        loop {
            match self
                .state
                .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(NOTIFIED) => {
                    // Woken while running: poll again from the queue.
                    if self
                        .state
                        .compare_exchange(NOTIFIED, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.injector.push(self.clone());
                        return;
                    }
                }
                Err(CANCELLED) => {
                    unsafe { self.release() };
                    return;
                }
                Err(_) => return,
            }
        }
    }

    /// Publishes the outcome of a finished poll.
    fn complete(&self, result: Result<T, JoinError>) {
        unsafe {
            self.release();
            *self.result.get() = Some(result);
        }

        loop {
            let state = self.state.load(Ordering::Acquire);

            if state == CANCELLED {
                return;
            }

            if self
                .state
                .compare_exchange(state, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.notify_waiters();
                return;
            }
        }
    }

    /// Drops the future, releasing everything it owns.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the future cell: it is
    /// either the running worker, or it moved the task out of `IDLE`.
    unsafe fn release(&self) {
        let future = unsafe { (*self.future.get()).take() };
        drop(future);
    }

    fn notify_waiters(&self) {
        let waiters = std::mem::take(&mut *self.waiters.lock().unwrap());
        for waiter in waiters {
            waiter.wake();
        }
    }

    /// Signals the task to be rescheduled.
    ///
    /// If the task is `IDLE`, it moves to `QUEUED` and is pushed to its
    /// context's injector. If the task is `RUNNING`, it moves to `NOTIFIED`
    /// so it is re-polled right after its current execution slice.
    pub(crate) fn wake(self: Arc<Self>) {
        loop {
            let state = self.state.load(Ordering::Acquire);

            match state {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.injector.push(self.clone());
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // Already queued, notified or finished: nothing to do.
                _ => return,
            }
        }
    }

    /// Aborts the task.
    ///
    /// The future is dropped as soon as no worker is polling it; the
    /// `JoinHandle` resolves to [`JoinError::Cancelled`].
    pub(crate) fn abort(&self) {
        loop {
            let state = self.state.load(Ordering::Acquire);

            if state == COMPLETED || state == CANCELLED {
                return;
            }

            if self
                .state
                .compare_exchange(state, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                if state == IDLE {
                    unsafe { self.release() };
                }

                self.notify_waiters();
                return;
            }
        }
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Arc<Self>) {
        Task::run(self)
    }

    fn abort(&self) {
        Task::abort(self)
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Spawns a future onto the execution context of the calling thread.
///
/// # Panics
///
/// Panics if called from a thread that does not belong to a coldflow
/// execution context. Use [`ExecutionContext::spawn`] to target a context
/// explicitly.
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let context = ExecutionContext::current()
        .expect("spawn must be called within the context of a coldflow runtime");

    context.spawn(future)
}
