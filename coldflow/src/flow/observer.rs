use std::sync::Arc;

/// Hook installed with
/// [`RuntimeBuilder::observer`](crate::RuntimeBuilder::observer).
pub(crate) type Observer = Arc<dyn Fn(&FlowEvent) + Send + Sync>;

/// Something observable that happened during a collection run.
///
/// Events are reported inline, on the thread where they happen; observing
/// never changes ordering or timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEvent {
    /// Id of the collection run, unique per runtime process.
    pub run: u64,

    /// Execution context the event happened on.
    pub context: Arc<str>,

    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The collection run started.
    Started,

    /// The producer body emitted its `index`-th value (0-based).
    Emitted { index: u64 },

    /// The consumer callback is about to handle its `index`-th value.
    Delivered { index: u64 },

    /// The upstream producer moved to the context named `to`.
    Switched { to: Arc<str> },

    /// The run ended; reported once, after the last delivery.
    Finished { outcome: Outcome },
}

/// How a collection run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
    Cancelled,
}
