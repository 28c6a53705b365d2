use crate::error::{FlowError, FlowResult};

use std::collections::VecDeque;
use std::future::poll_fn;
use std::sync::{Arc, Mutex};
use std::task::{Poll, Waker};

/// Creates a bounded buffer channel.
///
/// With `capacity > 0`, a send completes as soon as the value is queued
/// and suspends while `capacity` values are already waiting. With
/// `capacity == 0` the channel is a rendezvous: a send completes only once
/// the receiver has taken that very value.
///
/// The channel ends with a terminal token set by [`Sender::close`], which
/// the receiver observes after every value queued before it.
pub(crate) fn channel<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            queue: VecDeque::with_capacity(capacity.max(1)),
            capacity,
            terminal: None,
            senders: 1,
            receiver_alive: true,
            pushed: 0,
            taken: 0,
            send_wakers: Vec::new(),
            recv_waker: None,
        }),
    });

    (
        Sender {
            shared: shared.clone(),
        },
        Receiver { shared },
    )
}

struct Shared<T> {
    state: Mutex<State<T>>,
}

struct State<T> {
    queue: VecDeque<T>,
    capacity: usize,

    /// Completion or failure of the producer, set at most once.
    terminal: Option<FlowResult>,

    senders: usize,
    receiver_alive: bool,

    /// Values ever queued and ever taken; a rendezvous send waits until
    /// `taken` reaches the ticket of its value.
    pushed: u64,
    taken: u64,

    send_wakers: Vec<Waker>,
    recv_waker: Option<Waker>,
}

impl<T> State<T> {
    fn park_sender(&mut self, waker: &Waker) {
        if !self.send_wakers.iter().any(|w| w.will_wake(waker)) {
            self.send_wakers.push(waker.clone());
        }
    }
}

/// Writing half of a buffer channel.
pub(crate) struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Queues `value`, suspending while the channel is full.
    ///
    /// Fails with [`FlowError::BufferClosed`] once the receiver is gone or
    /// the channel has been closed.
    pub(crate) async fn send(&self, value: T) -> FlowResult {
        let mut value = Some(value);
        let mut ticket = None;

        poll_fn(|cx| {
            let mut state = self.shared.state.lock().unwrap();

            if let Some(ticket) = ticket {
                if state.taken >= ticket {
                    return Poll::Ready(Ok(()));
                }
                if !state.receiver_alive {
                    return Poll::Ready(Err(FlowError::BufferClosed));
                }
                state.park_sender(cx.waker());
                return Poll::Pending;
            }

            if !state.receiver_alive || state.terminal.is_some() {
                return Poll::Ready(Err(FlowError::BufferClosed));
            }

            let room = if state.capacity == 0 {
                state.queue.is_empty()
            } else {
                state.queue.len() < state.capacity
            };

            if !room {
                state.park_sender(cx.waker());
                return Poll::Pending;
            }

            let Some(value) = value.take() else {
                return Poll::Ready(Err(FlowError::BufferClosed));
            };

            state.queue.push_back(value);
            state.pushed += 1;
            let receiver = state.recv_waker.take();

            let ready = if state.capacity == 0 {
                ticket = Some(state.pushed);
                state.park_sender(cx.waker());
                Poll::Pending
            } else {
                Poll::Ready(Ok(()))
            };

            drop(state);
            if let Some(waker) = receiver {
                waker.wake();
            }

            ready
        })
        .await
    }

    /// Ends the channel with `result`; only the first close counts.
    pub(crate) fn close(&self, result: FlowResult) {
        let receiver = {
            let mut state = self.shared.state.lock().unwrap();
            if state.terminal.is_none() {
                state.terminal = Some(result);
            }
            state.recv_waker.take()
        };

        if let Some(waker) = receiver {
            waker.wake();
        }
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.state.lock().unwrap().senders += 1;

        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let receiver = {
            let mut state = self.shared.state.lock().unwrap();
            state.senders -= 1;
            if state.senders == 0 {
                state.recv_waker.take()
            } else {
                None
            }
        };

        if let Some(waker) = receiver {
            waker.wake();
        }
    }
}

/// Reading half of a buffer channel.
pub(crate) struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Takes the next value in FIFO order.
    ///
    /// Returns `Ok(None)` once the producer closed the channel successfully
    /// and every queued value was taken, or the producer's error. If every
    /// sender is dropped without closing, the producer is reported as
    /// failed.
    pub(crate) async fn recv(&mut self) -> FlowResult<Option<T>> {
        poll_fn(|cx| {
            let mut state = self.shared.state.lock().unwrap();

            if let Some(value) = state.queue.pop_front() {
                state.taken += 1;
                let senders = std::mem::take(&mut state.send_wakers);
                drop(state);

                for waker in senders {
                    waker.wake();
                }
                return Poll::Ready(Ok(Some(value)));
            }

            if let Some(terminal) = &state.terminal {
                return Poll::Ready(terminal.clone().map(|()| None));
            }

            if state.senders == 0 {
                return Poll::Ready(Err(FlowError::producer(
                    "producer stopped before completing",
                )));
            }

            state.recv_waker = Some(cx.waker().clone());
            Poll::Pending
        })
        .await
    }
}

impl<T> Receiver<T> {
    /// Returns `true` when every sender is gone without closing the
    /// channel and nothing is left to read.
    pub(crate) fn is_orphaned(&self) -> bool {
        let state = self.shared.state.lock().unwrap();
        state.senders == 0 && state.terminal.is_none() && state.queue.is_empty()
    }
}

impl<T> Drop for Receiver<T> {
    /// Releases the buffered values and fails every pending send.
    fn drop(&mut self) {
        let (values, senders) = {
            let mut state = self.shared.state.lock().unwrap();
            state.receiver_alive = false;
            (
                std::mem::take(&mut state.queue),
                std::mem::take(&mut state.send_wakers),
            )
        };

        drop(values);
        for waker in senders {
            waker.wake();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::park::block_on;

    #[test]
    fn values_then_terminal_in_order() {
        let (tx, mut rx) = channel(4);

        block_on(async {
            tx.send(1).await.unwrap();
            tx.send(2).await.unwrap();
            tx.close(Err(FlowError::producer("boom")));

            assert_eq!(rx.recv().await.unwrap(), Some(1));
            assert_eq!(rx.recv().await.unwrap(), Some(2));
            assert!(rx.recv().await.unwrap_err().is_producer());
        });
    }

    #[test]
    fn dropped_sender_without_close_is_a_producer_failure() {
        let (tx, mut rx) = channel::<u8>(1);
        drop(tx);

        let err = block_on(rx.recv()).unwrap_err();
        assert!(err.is_producer());
        assert!(rx.is_orphaned());
    }

    #[test]
    fn closed_channel_is_not_orphaned() {
        let (tx, rx) = channel::<u8>(1);
        tx.close(Ok(()));
        drop(tx);

        assert!(!rx.is_orphaned());
    }

    #[test]
    fn send_after_receiver_drop_fails() {
        let (tx, rx) = channel(1);
        drop(rx);

        let err = block_on(tx.send(7)).unwrap_err();
        assert!(matches!(err, FlowError::BufferClosed));
    }

    #[test]
    fn completed_channel_yields_none_after_values() {
        let (tx, mut rx) = channel(2);

        block_on(async {
            tx.send("a").await.unwrap();
            tx.close(Ok(()));
            assert_eq!(rx.recv().await.unwrap(), Some("a"));
            assert_eq!(rx.recv().await.unwrap(), None);
        });
    }
}
