use super::core::BoxFuture;
use super::observer::EventKind;
use super::scope::RunScope;
use crate::error::FlowResult;
use crate::runtime::ExecutionContext;

use tracing::trace;

/// Where a [`Collector`] hands its values to: the next stage, a channel or
/// the consumer callback.
pub(crate) trait Sink<T>: Send {
    /// Completes once the value has been accepted downstream.
    fn accept(&mut self, value: T) -> BoxFuture<'_, FlowResult>;
}

/// The capability a producer body emits values through.
///
/// ```rust,ignore
/// let numbers = flow(|mut out| async move {
///     for i in 0..4 {
///         sleep(Duration::from_millis(300)).await;
///         out.emit(i).await?;
///     }
///     Ok(())
/// });
/// ```
pub struct Collector<T> {
    sink: Box<dyn Sink<T>>,
    scope: RunScope,
    emitted: u64,
}

impl<T: Send + 'static> Collector<T> {
    pub(crate) fn new(sink: impl Sink<T> + 'static, scope: RunScope) -> Self {
        Self {
            sink: Box::new(sink),
            scope,
            emitted: 0,
        }
    }

    /// Emits a value downstream.
    ///
    /// Completes only once the next stage accepted the value: the consumer
    /// finished handling it, or a buffer had room for it. Errors must be
    /// propagated (usually with `?`): they carry the consumer's failure or
    /// the run's cancellation.
    pub async fn emit(&mut self, value: T) -> FlowResult {
        self.scope.checkpoint()?;

        let index = self.emitted;
        self.emitted += 1;

        trace!(run = self.scope.id(), index, "emit");
        self.scope.notify(EventKind::Emitted { index });

        self.sink.accept(value).await
    }

    /// Hands a value over from a stage, without reporting a new emission.
    pub(crate) async fn forward(&mut self, value: T) -> FlowResult {
        self.scope.checkpoint()?;
        self.sink.accept(value).await
    }

    /// The execution context the producer is running on.
    pub fn context(&self) -> &ExecutionContext {
        self.scope.context()
    }

    /// Returns `true` once the collection run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.scope.token().is_cancelled()
    }

    pub(crate) fn scope(&self) -> &RunScope {
        &self.scope
    }
}
