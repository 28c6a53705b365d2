//! Linux `epoll`-based poller.
//!
//! The poller owns an `epoll` instance with a single registration: an
//! internal `eventfd` used as a wake-up signal. Parking is an
//! `epoll_wait()` bounded by the next timer deadline.

use libc::{
    EFD_CLOEXEC, EFD_NONBLOCK, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLLIN, close, epoll_create1,
    epoll_ctl, epoll_event, epoll_wait, eventfd,
};
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Token of the wake-up registration.
const WAKE_TOKEN: u64 = u64::MAX;

/// Capacity of the event buffer handed to `epoll_wait()`.
const EVENTS: usize = 8;

pub(crate) struct EpollPoller {
    epoll: RawFd,
    events: Vec<epoll_event>,
    waker: Arc<EventFdWaker>,
}

/// Interrupts a parked [`EpollPoller`] from any thread.
pub(crate) struct EventFdWaker(RawFd);

unsafe impl Send for EpollPoller {}

impl EventFdWaker {
    /// Writes to the internal `eventfd`, making `epoll_wait()` return.
    pub(crate) fn wake(&self) {
        let buf: u64 = 1;
        unsafe {
            libc::write(self.0, &buf as *const u64 as *const _, 8);
        }
    }

    /// Resets the counter after a wake-up was observed.
    fn drain(&self) {
        let mut buf = 0u64;
        unsafe {
            libc::read(self.0, &mut buf as *mut u64 as *mut _, 8);
        }
    }
}

impl Drop for EventFdWaker {
    fn drop(&mut self) {
        unsafe {
            close(self.0);
        }
    }
}

impl EpollPoller {
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        let fd = unsafe { eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) };
        if fd < 0 {
            let err = io::Error::last_os_error();
            unsafe { close(epoll) };
            return Err(err);
        }

        let waker = Arc::new(EventFdWaker(fd));

        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: WAKE_TOKEN,
        };

        let rc = unsafe { epoll_ctl(epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            unsafe { close(epoll) };
            return Err(err);
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(EVENTS),
            waker,
        })
    }

    pub(crate) fn waker(&self) -> Arc<EventFdWaker> {
        self.waker.clone()
    }

    /// Blocks until woken or until `timeout` elapses (`None` waits forever).
    ///
    /// Timeouts are rounded up to whole milliseconds so the reactor never
    /// wakes before a deadline and spins.
    pub(crate) fn park(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let timeout_ms = match timeout {
            Some(t) => t.as_nanos().div_ceil(1_000_000).min(i32::MAX as u128) as i32,
            None => -1,
        };

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        if self.events.iter().any(|ev| {
            // `epoll_event` is packed on some targets; copy the field out.
            let token = ev.u64;
            token == WAKE_TOKEN
        }) {
            self.waker.drain();
        }

        self.events.clear();

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe {
            close(self.epoll);
        }
    }
}
