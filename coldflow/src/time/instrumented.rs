use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Wraps a future and measures the time it takes to complete.
///
/// Timing starts on the **first poll**, not at construction time.
///
/// # Examples
///
/// ```rust,ignore
/// let ((), elapsed) = instrumented(flow.collect(&main, consume)).await;
/// assert!(elapsed >= Duration::from_millis(400));
/// ```
pub fn instrumented<F: Future>(future: F) -> Instrumented<F> {
    Instrumented {
        future: Box::pin(future),
        start: None,
    }
}

/// Future returned by [`instrumented`]; resolves to the wrapped output and
/// the elapsed time since the first poll.
pub struct Instrumented<F> {
    /// The wrapped future.
    future: Pin<Box<F>>,

    /// Instant of the first poll.
    start: Option<Instant>,
}

impl<F: Future> Future for Instrumented<F> {
    /// The wrapped output and the time elapsed since the first poll.
    type Output = (F::Output, Duration);

    /// Records the start instant on the first poll, then polls the wrapped
    /// future and pairs its output with the elapsed time.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let start = *this.start.get_or_insert_with(Instant::now);

        this.future
            .as_mut()
            .poll(cx)
            .map(|output| (output, start.elapsed()))
    }
}
