//! Error types shared by the runtime and the flow engine.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error accepted by the [`FlowError`] constructors.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Error shared between the stage that raised it and the run that
/// surfaces it.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Result of a producer body, a consumer callback or a whole collection.
pub type FlowResult<T = ()> = Result<T, FlowError>;

/// Terminal failure of a collection run.
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    /// The producer body (or an upstream `on_each` stage) failed.
    #[error("producer failed: {0}")]
    Producer(#[source] SharedError),

    /// The consumer callback failed while handling a value.
    #[error("consumer failed: {0}")]
    Consumer(#[source] SharedError),

    /// The run was cancelled; cooperative stop, not a real failure.
    #[error("collection cancelled")]
    Cancelled,

    /// A value was emitted after the run owning the channel had ended.
    #[error("buffer closed: the collection owning it has ended")]
    BufferClosed,

    /// The task driving the run did not finish normally.
    #[error(transparent)]
    Join(#[from] JoinError),
}

impl FlowError {
    /// Builds a producer failure.
    ///
    /// ```rust,ignore
    /// return Err(FlowError::producer("sensor went offline"));
    /// ```
    pub fn producer(err: impl Into<BoxError>) -> Self {
        FlowError::Producer(Arc::from(err.into()))
    }

    /// Builds a consumer failure.
    pub fn consumer(err: impl Into<BoxError>) -> Self {
        FlowError::Consumer(Arc::from(err.into()))
    }

    /// Returns `true` for [`FlowError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FlowError::Cancelled)
    }

    /// Returns `true` for [`FlowError::Producer`].
    pub fn is_producer(&self) -> bool {
        matches!(self, FlowError::Producer(_))
    }

    /// Returns `true` for [`FlowError::Consumer`].
    pub fn is_consumer(&self) -> bool {
        matches!(self, FlowError::Consumer(_))
    }

    /// Re-tags an error returned by a consumer callback.
    ///
    /// Consumer failures and cancellations pass through; anything else the
    /// callback returned becomes the source of a consumer failure.
    pub(crate) fn into_consumer(self) -> Self {
        match self {
            FlowError::Consumer(_) | FlowError::Cancelled => self,
            other => FlowError::Consumer(Arc::new(other)),
        }
    }
}

/// Why a spawned task produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// The task was aborted, or its execution context shut down first.
    #[error("task was cancelled")]
    Cancelled,

    /// The task panicked; carries the panic message.
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Returned by [`timeout`](crate::time::timeout) when the deadline passed
/// before the future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline elapsed")]
pub struct Elapsed(pub(crate) ());
