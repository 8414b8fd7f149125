//! Shared completion state of a single execution.
//!
//! An [`ExecutionOutcome`] tracks two things for the coordinator: how many
//! lanes are still running and the write-once first-error slot. Both live
//! behind one mutex; the coordinator blocks on a condition variable (or on a
//! tokio `Notify` for async executions) that is signalled only when the last
//! lane finishes or when the slot is claimed.
//!
//! The slot follows the transitions:
//! - `Empty` -> `Claimed` when the first error is recorded
//! - `Empty` -> `Delivered` when every lane drains without error
//! - `Claimed` -> `Delivered` when the coordinator takes the error
//!
//! Records arriving in `Claimed` or `Delivered` are discarded.

use std::{
    sync::{
        Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use crate::{cancel::Cancellable, error::Error};

pub(crate) struct ExecutionOutcome<E> {
    state: Mutex<State<E>>,
    condvar: Condvar,
    /// Raised together with the slot claim; lanes check it before each item.
    stop: AtomicBool,
    #[cfg(feature = "tokio")]
    notify: tokio::sync::Notify,
}

impl<E> ExecutionOutcome<E> {
    pub(crate) fn new(running_lanes: usize) -> ExecutionOutcome<E> {
        ExecutionOutcome {
            state: Mutex::new(State {
                running_lanes,
                slot: Slot::Empty,
            }),
            condvar: Condvar::new(),
            stop: AtomicBool::new(false),
            #[cfg(feature = "tokio")]
            notify: tokio::sync::Notify::new(),
        }
    }

    /// Returns `true` once the execution has an error or was cancelled.
    #[inline]
    pub(crate) fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub(crate) fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Attempts to claim the first-error slot.
    ///
    /// Returns `true` if `error` became the execution's error, `false` if the
    /// slot was already taken, in which case `error` is dropped.
    pub(crate) fn try_record(&self, lane: Option<usize>, error: Error<E>) -> bool {
        let mut state = self.lock();
        let label = error.label();
        match state.slot.claim(error) {
            Ok(()) => {
                self.stop();
                drop(state);
                log::debug!("lane {lane:?} claimed the first-error slot with a {label}");
                self.wake();
                true
            }
            Err(_late) => {
                log::debug!("lane {lane:?}: discarding late {label}");
                false
            }
        }
    }

    /// Marks one lane as finished, waking the coordinator after the last one.
    pub(crate) fn lane_finished(&self) {
        let mut state = self.lock();
        debug_assert_ne!(state.running_lanes, 0);
        state.running_lanes = state.running_lanes.saturating_sub(1);
        let drained = state.running_lanes == 0;
        drop(state);
        if drained {
            self.wake();
        }
    }

    /// Blocks until every lane finished or an error was claimed.
    pub(crate) fn wait(&self) -> Result<(), Error<E>> {
        let guard = self.lock();
        let mut guard = self
            .condvar
            .wait_while(guard, |state| state.is_running())
            .unwrap_or_else(PoisonError::into_inner);
        guard.finish()
    }

    /// Like [`wait`](Self::wait), but claims the slot with
    /// [`Error::Cancelled`] if `deadline` passes first.
    pub(crate) fn wait_until(&self, deadline: Instant) -> Result<(), Error<E>> {
        let mut guard = self.lock();
        while guard.is_running() {
            let now = Instant::now();
            if now >= deadline {
                drop(guard);
                return self.expire();
            }
            guard = self
                .condvar
                .wait_timeout_while(guard, deadline - now, |state| state.is_running())
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        guard.finish()
    }

    /// Awaits the same condition as [`wait`](Self::wait) without blocking
    /// the runtime thread.
    #[cfg(feature = "tokio")]
    pub(crate) async fn wait_async(&self) -> Result<(), Error<E>> {
        loop {
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let mut state = self.lock();
                if !state.is_running() {
                    return state.finish();
                }
            }
            notified.await;
        }
    }

    /// Ends a still-running execution with [`Error::Cancelled`] and returns
    /// the execution's final result.
    pub(crate) fn expire(&self) -> Result<(), Error<E>> {
        let mut state = self.lock();
        if state.is_running() {
            log::debug!("deadline expired with {} lanes running", state.running_lanes);
            let _ = state.slot.claim(Error::Cancelled);
        }
        self.stop();
        state.finish()
    }

    fn wake(&self) {
        self.condvar.notify_all();
        #[cfg(feature = "tokio")]
        self.notify.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Send> Cancellable for ExecutionOutcome<E> {
    fn cancel(&self) {
        self.try_record(None, Error::Cancelled);
    }
}

struct State<E> {
    running_lanes: usize,
    slot: Slot<E>,
}

impl<E> State<E> {
    fn is_running(&self) -> bool {
        self.running_lanes > 0 && matches!(self.slot, Slot::Empty)
    }

    /// Takes the final result out of the slot.
    ///
    /// # Panics
    ///
    /// Panics if the execution is still running or the result was already
    /// delivered.
    fn finish(&mut self) -> Result<(), Error<E>> {
        match std::mem::replace(&mut self.slot, Slot::Delivered) {
            Slot::Empty if self.running_lanes == 0 => Ok(()),
            Slot::Empty => panic!("State::finish() unexpected: lanes still running"),
            Slot::Claimed(error) => Err(error),
            Slot::Delivered => panic!("State::finish() unexpected: result already delivered"),
        }
    }
}

enum Slot<E> {
    Empty,
    Claimed(Error<E>),
    Delivered,
}

impl<E> Slot<E> {
    fn claim(&mut self, error: Error<E>) -> Result<(), Error<E>> {
        match self {
            Slot::Empty => {
                *self = Slot::Claimed(error);
                Ok(())
            }
            Slot::Claimed(_) | Slot::Delivered => Err(error),
        }
    }
}
