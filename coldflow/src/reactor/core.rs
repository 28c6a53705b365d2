use super::command::Command;
use super::poller::{Poller, PollerWaker};
use super::timer::TimerEntry;

use std::collections::BinaryHeap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, SendError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, error, trace};

/// The reactor loop, owned by its dedicated thread.
pub(crate) struct Reactor {
    /// Commands submitted by runtime threads.
    receiver: Receiver<Command>,

    /// Platform poller used to park until the next deadline.
    poller: Poller,

    /// Pending timers, earliest deadline on top.
    timers: BinaryHeap<TimerEntry>,
}

/// Cloneable handle used to submit commands to the reactor thread.
#[derive(Clone)]
pub(crate) struct ReactorHandle {
    sender: Sender<Command>,
    waker: Arc<PollerWaker>,
}

impl ReactorHandle {
    /// Submits a command and interrupts the reactor if it is parked.
    pub(crate) fn send(&self, command: Command) -> Result<(), SendError<Command>> {
        self.sender.send(command)?;
        self.waker.wake();
        Ok(())
    }
}

impl Reactor {
    /// Spawns the reactor thread.
    ///
    /// Returns the handle used by execution contexts and the join handle of
    /// the reactor thread itself.
    pub(crate) fn start() -> io::Result<(ReactorHandle, JoinHandle<()>)> {
        let poller = Poller::new()?;
        let waker = poller.waker();
        let (sender, receiver) = mpsc::channel();

        let mut reactor = Reactor {
            receiver,
            poller,
            timers: BinaryHeap::new(),
        };

        let thread = thread::Builder::new()
            .name("coldflow-reactor".into())
            .spawn(move || {
                if let Err(err) = reactor.run() {
                    error!(%err, "reactor stopped unexpectedly");
                }
            })?;

        Ok((ReactorHandle { sender, waker }, thread))
    }

    fn run(&mut self) -> io::Result<()> {
        debug!("reactor started");

        loop {
            loop {
                match self.receiver.try_recv() {
                    Ok(Command::SetTimer {
                        deadline,
                        waker,
                        cancelled,
                    }) => {
                        self.timers.push(TimerEntry {
                            deadline,
                            waker,
                            cancelled,
                        });
                    }
                    Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => {
                        debug!(pending = self.timers.len(), "reactor shutting down");
                        return Ok(());
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }

            self.fire_expired();

            let timeout = self
                .timers
                .peek()
                .map(|t| t.deadline.saturating_duration_since(Instant::now()));

            self.poller.park(timeout)?;

            self.fire_expired();
        }
    }

    /// Wakes every timer whose deadline has passed.
    fn fire_expired(&mut self) {
        let now = Instant::now();

        while let Some(timer) = self.timers.peek() {
            if timer.deadline > now {
                break;
            }

            let Some(timer) = self.timers.pop() else {
                break;
            };

            if timer.cancelled.load(Ordering::Acquire) {
                continue;
            }

            trace!("timer fired");
            timer.waker.wake();
        }
    }
}
