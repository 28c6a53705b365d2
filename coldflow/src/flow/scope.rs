use super::observer::{EventKind, FlowEvent, Observer, Outcome};
use crate::error::{FlowError, FlowResult};
use crate::runtime::ExecutionContext;
use crate::sync::CancelToken;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// State of one collection run, shared by every task taking part in it.
struct RunShared {
    id: u64,
    token: CancelToken,
    observer: Option<Observer>,
}

/// A collection run as seen from one execution context.
///
/// Stages that move the producer elsewhere [`relocate`](Self::relocate) the
/// scope; the run itself (id, cancellation, observer) stays shared.
#[derive(Clone)]
pub(crate) struct RunScope {
    shared: Arc<RunShared>,
    context: ExecutionContext,
}

impl RunScope {
    pub(crate) fn new(context: &ExecutionContext, token: CancelToken) -> Self {
        Self {
            shared: Arc::new(RunShared {
                id: NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed),
                token,
                observer: context.observer().cloned(),
            }),
            context: context.clone(),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.shared.id
    }

    pub(crate) fn token(&self) -> &CancelToken {
        &self.shared.token
    }

    pub(crate) fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Suspension-point check: fails with `Cancelled` once the run is
    /// cancelled.
    pub(crate) fn checkpoint(&self) -> FlowResult {
        self.shared.token.check()
    }

    pub(crate) fn notify(&self, kind: EventKind) {
        if let Some(observer) = &self.shared.observer {
            observer(&FlowEvent {
                run: self.shared.id,
                context: self.context.name_arc(),
                kind,
            });
        }
    }

    /// The same run, continued on `target`.
    pub(crate) fn relocate(&self, target: &ExecutionContext) -> RunScope {
        if *target != self.context {
            debug!(
                run = self.shared.id,
                from = self.context.name(),
                to = target.name(),
                "switching producer context"
            );
            self.notify(EventKind::Switched {
                to: target.name_arc(),
            });
        }

        RunScope {
            shared: self.shared.clone(),
            context: target.clone(),
        }
    }

    /// Logs and reports the end of the run.
    pub(crate) fn finish(&self, result: &FlowResult) {
        let run = self.shared.id;

        let outcome = match result {
            Ok(()) => {
                debug!(run, "collection completed");
                Outcome::Completed
            }
            Err(FlowError::Cancelled) => {
                debug!(run, "collection cancelled");
                Outcome::Cancelled
            }
            Err(err) => {
                warn!(run, %err, "collection failed");
                Outcome::Failed
            }
        };

        self.notify(EventKind::Finished { outcome });
    }
}
