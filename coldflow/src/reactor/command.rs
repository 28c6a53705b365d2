use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::task::Waker;
use std::time::Instant;

/// Messages sent from runtime threads to the reactor thread.
pub(crate) enum Command {
    /// Wake `waker` once `deadline` has passed, unless `cancelled` is set
    /// by then.
    SetTimer {
        deadline: Instant,
        waker: Waker,
        cancelled: Arc<AtomicBool>,
    },

    /// Stop the reactor loop. Pending timers are dropped without firing.
    Shutdown,
}
