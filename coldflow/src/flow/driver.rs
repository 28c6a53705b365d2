use super::collector::{Collector, Sink};
use super::core::{BoxFuture, Flow};
use super::observer::EventKind;
use super::scope::RunScope;
use crate::error::{FlowError, FlowResult, JoinError};
use crate::runtime::ExecutionContext;
use crate::runtime::task::{AbortOnDrop, JoinHandle};
use crate::sync::CancelToken;

use std::fmt;
use std::future::{Future, ready};
use std::sync::{Arc, Mutex};

use tracing::{Instrument, debug, debug_span, trace};

/// How a launched collection ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The producer finished and every value was handled.
    Completed,

    /// The run was cancelled through its [`RunHandle`].
    Cancelled,
}

/// Final stage of a run: hands values to the consumer callback.
struct Deliver<F> {
    on_each: F,
    scope: RunScope,
    delivered: u64,

    /// First consumer failure, surfaced even if the producer swallows it.
    failure: Arc<Mutex<Option<FlowError>>>,

    /// Set once the consumer failed; later values are refused.
    closed: bool,
}

impl<T, F, Fut> Sink<T> for Deliver<F>
where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = FlowResult> + Send + 'static,
{
    fn accept(&mut self, value: T) -> BoxFuture<'_, FlowResult> {
        Box::pin(async move {
            if self.closed {
                return Err(FlowError::BufferClosed);
            }
            self.scope.checkpoint()?;

            let index = self.delivered;
            self.delivered += 1;

            trace!(run = self.scope.id(), index, "deliver");
            self.scope.notify(EventKind::Delivered { index });

            let handled = (self.on_each)(value).await;

            handled.map_err(|err| {
                let err = err.into_consumer();
                if !err.is_cancelled() {
                    self.closed = true;
                    *self.failure.lock().unwrap() = Some(err.clone());
                }
                err
            })
        })
    }
}

impl<T: Send + 'static> Flow<T> {
    /// Collects the flow, calling `on_each` for every value in emission
    /// order, and returns once the producer finished.
    ///
    /// `on_each` runs on `context`. Awaited from a task running on
    /// `context`, the producer runs inline in that task; otherwise the whole
    /// collection is spawned on `context` and awaited.
    ///
    /// While `on_each` is suspended, the producer's pending `emit` is too:
    /// without a [`buffer`](Self::buffer) every value costs the producer's
    /// step plus the consumer's step.
    pub async fn collect<F, Fut>(&self, context: &ExecutionContext, on_each: F) -> FlowResult
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = FlowResult> + Send + 'static,
    {
        if !context.is_current() {
            let flow = self.clone();
            let target = context.clone();
            let run = context.spawn(async move { flow.collect_here(&target, on_each).await });

            return AbortOnDrop(run).await?;
        }

        self.collect_here(context, on_each).await
    }

    async fn collect_here<F, Fut>(&self, context: &ExecutionContext, on_each: F) -> FlowResult
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = FlowResult> + Send + 'static,
    {
        let scope = RunScope::new(context, CancelToken::new());
        let span = debug_span!("collect", run = scope.id(), context = context.name());

        let result = self.run(&scope, on_each).instrument(span).await;
        scope.finish(&result);

        result
    }

    /// Collects every value into a vector.
    pub async fn to_list(&self, context: &ExecutionContext) -> FlowResult<Vec<T>> {
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = values.clone();

        self.collect(context, move |value| {
            sink.lock().unwrap().push(value);
            ready(Ok(()))
        })
        .await?;

        let collected = std::mem::take(&mut *values.lock().unwrap());
        Ok(collected)
    }

    /// Starts collecting on `context` and returns immediately.
    ///
    /// The returned [`RunHandle`] cancels or awaits the run. Dropping it
    /// leaves the run going.
    ///
    /// ```rust,ignore
    /// let run = numbers.launch(runtime.main(), |n| async move {
    ///     println!("got {n}");
    ///     Ok(())
    /// });
    /// run.cancel();
    /// assert_eq!(run.join().await?, RunOutcome::Cancelled);
    /// ```
    pub fn launch<F, Fut>(&self, context: &ExecutionContext, on_each: F) -> RunHandle
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = FlowResult> + Send + 'static,
    {
        let token = CancelToken::new();
        let scope = RunScope::new(context, token.clone());
        let id = scope.id();
        let span = debug_span!("collect", run = id, context = context.name());

        let flow = self.clone();
        let target = context.clone();
        let join = context.spawn(
            async move {
                // A panicking producer or consumer unwinds the inner task
                // only, so the run still reports how it ended.
                let inner = {
                    let scope = scope.clone();
                    target.spawn(
                        async move {
                            scope
                                .token()
                                .guard(flow.run(&scope, on_each))
                                .await
                                .and_then(|result| result)
                        }
                        .in_current_span(),
                    )
                };

                let result = AbortOnDrop(inner)
                    .await
                    .map_err(FlowError::from)
                    .and_then(|result| result);

                scope.finish(&result);
                result
            }
            .instrument(span),
        );

        RunHandle { id, token, join }
    }

    async fn run<F, Fut>(&self, scope: &RunScope, on_each: F) -> FlowResult
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = FlowResult> + Send + 'static,
    {
        debug!(run = scope.id(), context = scope.context().name(), "collection started");
        scope.notify(EventKind::Started);

        let failure = Arc::new(Mutex::new(None));
        let sink = Deliver {
            on_each,
            scope: scope.clone(),
            delivered: 0,
            failure: failure.clone(),
            closed: false,
        };

        let result = self.drive(Collector::new(sink, scope.clone())).await;

        let consumer_failure = failure.lock().unwrap().take();
        match consumer_failure {
            Some(err) => Err(err),
            None => result,
        }
    }
}

/// Starts collecting `flow` on `context`; same as [`Flow::launch`].
pub fn collect<T, F, Fut>(flow: &Flow<T>, context: &ExecutionContext, on_each: F) -> RunHandle
where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = FlowResult> + Send + 'static,
{
    flow.launch(context, on_each)
}

/// Handle to a launched collection run.
pub struct RunHandle {
    id: u64,
    token: CancelToken,
    join: JoinHandle<FlowResult>,
}

impl RunHandle {
    /// Id of the run, as reported in [`FlowEvent`](super::FlowEvent)s.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancels the run.
    ///
    /// The consumer callback is not invoked again, producers on every
    /// context stop at their next suspension point and the run's buffers
    /// are released. Cancelling twice, or after the run ended, does nothing.
    pub fn cancel(&self) {
        if self.token.cancel() {
            debug!(run = self.id, "cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the run to end.
    ///
    /// A cancelled run resolves to `Ok(RunOutcome::Cancelled)`; producer and
    /// consumer failures, and panics, are returned as errors.
    pub async fn join(self) -> FlowResult<RunOutcome> {
        settle(self.join.await)
    }

    /// Blocking variant of [`join`](Self::join), for threads outside the
    /// runtime.
    pub fn wait(self) -> FlowResult<RunOutcome> {
        settle(self.join.wait())
    }
}

impl fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunHandle")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

fn settle(joined: Result<FlowResult, JoinError>) -> FlowResult<RunOutcome> {
    match joined {
        Ok(Ok(())) => Ok(RunOutcome::Completed),
        Ok(Err(FlowError::Cancelled)) => Ok(RunOutcome::Cancelled),
        Ok(Err(err)) => Err(err),
        Err(err) => Err(err.into()),
    }
}
