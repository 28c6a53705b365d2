use crate::runtime::task::Task;

use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Raw waker plumbing for `Arc<Task<T>>`.
///
/// The data pointer always comes from `Arc::into_raw`, and every vtable
/// entry keeps the strong count balanced.
struct TaskWaker<T>(std::marker::PhantomData<T>);

impl<T: Send + 'static> TaskWaker<T> {
    const VTABLE: RawWakerVTable =
        RawWakerVTable::new(Self::clone, Self::wake, Self::wake_by_ref, Self::drop);

    fn raw(task: Arc<Task<T>>) -> RawWaker {
        RawWaker::new(Arc::into_raw(task).cast::<()>(), &Self::VTABLE)
    }

    /// Borrows the task behind `ptr` without touching the strong count.
    unsafe fn borrow(ptr: *const ()) -> ManuallyDrop<Arc<Task<T>>> {
        ManuallyDrop::new(unsafe { Arc::from_raw(ptr.cast::<Task<T>>()) })
    }

    unsafe fn clone(ptr: *const ()) -> RawWaker {
        let task = unsafe { Self::borrow(ptr) };
        Self::raw(Arc::clone(&task))
    }

    unsafe fn wake(ptr: *const ()) {
        let task = unsafe { Arc::from_raw(ptr.cast::<Task<T>>()) };
        task.wake();
    }

    unsafe fn wake_by_ref(ptr: *const ()) {
        let task = unsafe { Self::borrow(ptr) };
        Arc::clone(&task).wake();
    }

    unsafe fn drop(ptr: *const ()) {
        drop(unsafe { Arc::from_raw(ptr.cast::<Task<T>>()) });
    }
}

/// Creates a [`Waker`] that reschedules `task` on its execution context.
pub(crate) fn make_waker<T: Send + 'static>(task: Arc<Task<T>>) -> Waker {
    // Safety: the vtable upholds the `RawWaker` contract for `Arc<Task<T>>`.
    unsafe { Waker::from_raw(TaskWaker::raw(task)) }
}
