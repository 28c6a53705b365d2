use super::collector::{Collector, Sink};
use super::core::{BoxFuture, Flow, Node};
use crate::error::{FlowError, FlowResult};
use crate::runtime::ExecutionContext;
use crate::runtime::task::AbortOnDrop;
use crate::sync::{self, Sender};

use std::future::Future;
use std::sync::Arc;

use tracing::Instrument;

/// Upstream flow decoupled from its collector by a bounded channel.
pub(crate) struct ChannelStage<T> {
    upstream: Flow<T>,
    capacity: usize,

    /// Where the upstream runs; `None` means the collection's context.
    context: Option<ExecutionContext>,
}

impl<T> Clone for ChannelStage<T> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            capacity: self.capacity,
            context: self.context.clone(),
        }
    }
}

impl<T: Send + 'static> ChannelStage<T> {
    /// Spawns the upstream as a producer task writing into the channel,
    /// and forwards what it reads to `out` until the terminal token.
    pub(crate) fn drive(self, mut out: Collector<T>) -> BoxFuture<'static, FlowResult> {
        Box::pin(async move {
            let scope = out.scope().clone();
            let target = self.context.unwrap_or_else(|| scope.context().clone());
            let producer_scope = scope.relocate(&target);

            let (tx, mut rx) = sync::channel(self.capacity);
            let upstream = self.upstream;

            let producer = scope.token().guard(async move {
                let sink = ChannelSink { tx: tx.clone() };
                let result = upstream.drive(Collector::new(sink, producer_scope)).await;
                tx.close(result);
            });

            // The producer must not outlive the stage, whatever ends it.
            let mut producer = AbortOnDrop(target.spawn(producer.in_current_span()));

            loop {
                match rx.recv().await {
                    Ok(Some(value)) => out.forward(value).await?,
                    Ok(None) => return Ok(()),
                    Err(err) if rx.is_orphaned() => return Err(stopped(&mut producer, err).await),
                    Err(err) => return Err(err),
                }
            }
        })
    }
}

/// Why a producer task dropped its sender without closing the channel.
async fn stopped(producer: &mut AbortOnDrop<FlowResult>, fallback: FlowError) -> FlowError {
    match producer.await {
        Ok(Err(err)) => err,
        Ok(Ok(())) => fallback,
        Err(join) => join.into(),
    }
}

struct ChannelSink<T> {
    tx: Sender<T>,
}

impl<T: Send + 'static> Sink<T> for ChannelSink<T> {
    fn accept(&mut self, value: T) -> BoxFuture<'_, FlowResult> {
        Box::pin(self.tx.send(value))
    }
}

struct MapSink<T, U> {
    f: Arc<dyn Fn(T) -> U + Send + Sync>,
    out: Collector<U>,
}

impl<T: Send + 'static, U: Send + 'static> Sink<T> for MapSink<T, U> {
    fn accept(&mut self, value: T) -> BoxFuture<'_, FlowResult> {
        let mapped = (self.f)(value);
        Box::pin(self.out.forward(mapped))
    }
}

struct EachSink<T, F> {
    f: Arc<F>,
    out: Collector<T>,
}

impl<T, F, Fut> Sink<T> for EachSink<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FlowResult> + Send + 'static,
{
    fn accept(&mut self, value: T) -> BoxFuture<'_, FlowResult> {
        Box::pin(async move {
            (self.f)(&value).await?;
            self.out.forward(value).await
        })
    }
}

impl<T: Send + 'static> Flow<T> {
    /// Runs the upstream producer concurrently with the collector, letting
    /// it get up to `capacity` values ahead.
    ///
    /// The producer becomes a separate task on the collection's context
    /// (or on the context chosen with [`on`](Self::on)). Once `capacity`
    /// values wait unread, its next `emit` suspends until the collector
    /// takes one. With `capacity == 0` every `emit` waits until the
    /// collector took that very value.
    ///
    /// A producer failure is delivered after the values buffered before it;
    /// a producer panic surfaces as [`FlowError::Join`] with its message.
    /// Applied on top of another buffer or [`on`](Self::on), the stages fuse
    /// into one channel with this capacity.
    pub fn buffer(&self, capacity: usize) -> Flow<T> {
        let stage = match self.node() {
            Node::Channel(stage) => ChannelStage {
                capacity,
                ..stage.clone()
            },
            Node::Source(_) => ChannelStage {
                upstream: self.clone(),
                capacity,
                context: None,
            },
        };

        Flow::from_node(Node::Channel(stage))
    }

    /// Runs the upstream producer on `context`.
    ///
    /// Values still reach the collector in order, on the collector's own
    /// context. Without an explicit [`buffer`](Self::buffer) the producer
    /// runs at most one value ahead. When stacked, the innermost `on`
    /// decides where the producer runs.
    pub fn on(&self, context: &ExecutionContext) -> Flow<T> {
        match self.node() {
            Node::Channel(stage) if stage.context.is_some() => self.clone(),
            Node::Channel(stage) => Flow::from_node(Node::Channel(ChannelStage {
                context: Some(context.clone()),
                ..stage.clone()
            })),
            Node::Source(_) => Flow::from_node(Node::Channel(ChannelStage {
                upstream: self.clone(),
                capacity: 1,
                context: Some(context.clone()),
            })),
        }
    }

    /// Transforms every value, preserving order.
    pub fn map<U, F>(&self, f: F) -> Flow<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f: Arc<dyn Fn(T) -> U + Send + Sync> = Arc::new(f);

        Flow::from_body(move |out: Collector<U>| {
            let upstream = upstream.clone();
            let f = f.clone();

            async move {
                let scope = out.scope().clone();
                upstream.drive(Collector::new(MapSink { f, out }, scope)).await
            }
        })
    }

    /// Runs an asynchronous side effect for every value before passing it
    /// on, typically a delay.
    ///
    /// An error returned by `f` ends the collection as a producer failure.
    ///
    /// ```rust,ignore
    /// let slowed = numbers.on_each(|_| async {
    ///     sleep(Duration::from_millis(300)).await;
    ///     Ok(())
    /// });
    /// ```
    pub fn on_each<F, Fut>(&self, f: F) -> Flow<T>
    where
        T: Sync,
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FlowResult> + Send + 'static,
    {
        let upstream = self.clone();
        let f = Arc::new(f);

        Flow::from_body(move |out: Collector<T>| {
            let upstream = upstream.clone();
            let f = f.clone();

            async move {
                let scope = out.scope().clone();
                upstream.drive(Collector::new(EachSink { f, out }, scope)).await
            }
        })
    }
}
