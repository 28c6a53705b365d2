use super::collector::Collector;
use super::stage::ChannelStage;
use crate::error::FlowResult;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Capacity used by [`channel_flow`].
pub const BUFFERED: usize = 64;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Body<T> = Box<dyn Fn(Collector<T>) -> BoxFuture<'static, FlowResult> + Send + Sync>;

/// A cold asynchronous stream of `T`.
///
/// A `Flow` is only a description: building it runs nothing, and every
/// collection re-runs the producer from the start. Flows are immutable and
/// cheap to clone; stages such as [`map`](Flow::map), [`buffer`](Flow::buffer)
/// and [`on`](Flow::on) return new flows wrapping this one.
pub struct Flow<T> {
    node: Arc<Node<T>>,
}

pub(crate) enum Node<T> {
    /// Runs a producer body inline in the collecting task.
    Source(Body<T>),

    /// Runs the upstream in its own task, decoupled through a channel.
    Channel(ChannelStage<T>),
}

impl<T> Clone for Flow<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<T: Send + 'static> Flow<T> {
    pub(crate) fn from_body<F, Fut>(body: F) -> Self
    where
        F: Fn(Collector<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FlowResult> + Send + 'static,
    {
        Self::from_node(Node::Source(Box::new(
            move |out| -> BoxFuture<'static, FlowResult> { Box::pin(body(out)) },
        )))
    }

    pub(crate) fn from_node(node: Node<T>) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    pub(crate) fn node(&self) -> &Node<T> {
        &self.node
    }

    /// Runs the flow once, sending every value into `out`.
    pub(crate) fn drive(&self, out: Collector<T>) -> BoxFuture<'static, FlowResult> {
        match &*self.node {
            Node::Source(body) => body(out),
            Node::Channel(stage) => stage.clone().drive(out),
        }
    }
}

/// Builds a flow from a producer body.
///
/// The body runs once per collection, receiving a fresh [`Collector`].
/// Returning an error ends the collection with that error; errors returned
/// by [`Collector::emit`] should be propagated with `?`.
///
/// ```rust,ignore
/// let ticks = flow(|mut out| async move {
///     for i in 0..4 {
///         sleep(Duration::from_millis(300)).await;
///         out.emit(i).await?;
///     }
///     Ok(())
/// });
/// ```
pub fn flow<T, F, Fut>(body: F) -> Flow<T>
where
    T: Send + 'static,
    F: Fn(Collector<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FlowResult> + Send + 'static,
{
    Flow::from_body(body)
}

/// A flow emitting a fixed sequence of values.
pub fn flow_of<T, I>(values: I) -> Flow<T>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = T>,
{
    let values: Arc<[T]> = values.into_iter().collect();

    flow(move |mut out| {
        let values = values.clone();
        async move {
            for value in values.iter() {
                out.emit(value.clone()).await?;
            }
            Ok(())
        }
    })
}

/// A flow whose producer runs concurrently with the collector, ahead by up
/// to [`BUFFERED`] values.
///
/// Same as `flow(body).buffer(BUFFERED)`.
pub fn channel_flow<T, F, Fut>(body: F) -> Flow<T>
where
    T: Send + 'static,
    F: Fn(Collector<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FlowResult> + Send + 'static,
{
    flow(body).buffer(BUFFERED)
}

impl<T> FromIterator<T> for Flow<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        flow_of(iter)
    }
}
