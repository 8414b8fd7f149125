//! Draining of a single lane.
//!
//! A lane worker takes items from its lane strictly in FIFO order and hands
//! each one to the processing callback, one at a time. Before starting an item
//! it checks the execution's stop flag; an item that has started always runs
//! to completion. The first failure (or panic) on the lane is offered to the
//! execution's first-error slot and ends the lane.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use crate::{error::Error, outcome::ExecutionOutcome, partition::Lane};

/// How a lane worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LaneExit {
    /// Every item of the lane was processed.
    Drained,
    /// The execution was stopped by another lane or by cancellation.
    Stopped,
    /// An item on this lane failed or panicked.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LaneReport {
    pub lane: usize,
    pub processed: usize,
    pub exit: LaneExit,
}

pub(crate) fn run_lane<T, E, F>(
    mut lane: Lane<T>,
    operation: &F,
    outcome: &ExecutionOutcome<E>,
) -> LaneReport
where
    F: Fn(T) -> Result<(), Error<E>>,
{
    let index = lane.index();
    let mut processed = 0;
    log::debug!("lane {index}: starting with {} items", lane.len());
    loop {
        if outcome.should_stop() {
            return stopped(index, processed, lane.len());
        }
        let Some(item) = lane.pop_front() else {
            return LaneReport {
                lane: index,
                processed,
                exit: LaneExit::Drained,
            };
        };
        log::trace!("lane {index}: item {processed} started");
        match panic::catch_unwind(AssertUnwindSafe(|| operation(item))) {
            Ok(Ok(())) => processed += 1,
            Ok(Err(error)) => return failed(index, processed, error, outcome),
            Err(payload) => return panicked(index, processed, payload, outcome),
        }
    }
}

#[cfg(feature = "tokio")]
pub(crate) async fn run_lane_async<T, E, F, Fut>(
    mut lane: Lane<T>,
    operation: &F,
    outcome: &ExecutionOutcome<E>,
) -> LaneReport
where
    F: Fn(T) -> Fut,
    Fut: std::future::Future<Output = Result<(), Error<E>>>,
{
    use futures::FutureExt;

    let index = lane.index();
    let mut processed = 0;
    log::debug!("lane {index}: starting with {} items", lane.len());
    loop {
        if outcome.should_stop() {
            return stopped(index, processed, lane.len());
        }
        let Some(item) = lane.pop_front() else {
            return LaneReport {
                lane: index,
                processed,
                exit: LaneExit::Drained,
            };
        };
        log::trace!("lane {index}: item {processed} started");
        match AssertUnwindSafe(async move { operation(item).await })
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => processed += 1,
            Ok(Err(error)) => return failed(index, processed, error, outcome),
            Err(payload) => return panicked(index, processed, payload, outcome),
        }
    }
}

fn stopped(lane: usize, processed: usize, remaining: usize) -> LaneReport {
    log::debug!("lane {lane}: stop requested, {remaining} items left unprocessed");
    LaneReport {
        lane,
        processed,
        exit: LaneExit::Stopped,
    }
}

fn failed<E>(
    lane: usize,
    processed: usize,
    error: Error<E>,
    outcome: &ExecutionOutcome<E>,
) -> LaneReport {
    log::debug!("lane {lane}: item {processed} reported a {}", error.label());
    outcome.try_record(Some(lane), error);
    LaneReport {
        lane,
        processed,
        exit: LaneExit::Failed,
    }
}

fn panicked<E>(
    lane: usize,
    processed: usize,
    payload: Box<dyn Any + Send>,
    outcome: &ExecutionOutcome<E>,
) -> LaneReport {
    let message = panic_message(payload.as_ref());
    outcome.try_record(Some(lane), Error::Panicked { lane, message });
    LaneReport {
        lane,
        processed,
        exit: LaneExit::Failed,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{LaneExit, run_lane};
    use crate::{error::Error, outcome::ExecutionOutcome, partition::partition};

    #[test]
    fn test_lane_drains_in_order() {
        let lane = partition(0..10, 3).remove(1);
        let seen = Mutex::new(Vec::new());
        let outcome = ExecutionOutcome::<()>::new(1);
        let report = run_lane(
            lane,
            &|i| {
                seen.lock().unwrap().push(i);
                Ok(())
            },
            &outcome,
        );
        assert_eq!(report.exit, LaneExit::Drained);
        assert_eq!(report.lane, 1);
        assert_eq!(report.processed, 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 4, 7]);
    }

    #[test]
    fn test_lane_stops_at_first_failure() {
        let lane = partition(0..5, 1).remove(0);
        let seen = Mutex::new(Vec::new());
        let outcome = ExecutionOutcome::<String>::new(1);
        let report = run_lane(
            lane,
            &|i| {
                seen.lock().unwrap().push(i);
                if i == 2 {
                    Err(Error::Failed(format!("item {i}")))
                } else {
                    Ok(())
                }
            },
            &outcome,
        );
        assert_eq!(report.exit, LaneExit::Failed);
        assert_eq!(report.processed, 2);
        // Exactly the prefix up to and including the failing item.
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert!(outcome.should_stop());
        match outcome.wait() {
            Err(Error::Failed(cause)) => assert_eq!(cause, "item 2"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_lane_honors_stop_flag() {
        let lane = partition(0..4, 1).remove(0);
        let outcome = ExecutionOutcome::<()>::new(2);
        outcome.try_record(Some(1), Error::Cancelled);
        let report = run_lane(
            lane,
            &|_: i32| -> Result<(), Error<()>> { panic!("must not start") },
            &outcome,
        );
        assert_eq!(report.exit, LaneExit::Stopped);
        assert_eq!(report.processed, 0);
    }

    #[test]
    fn test_stop_between_items() {
        let lane = partition(0..4, 1).remove(0);
        let outcome = ExecutionOutcome::<()>::new(2);
        let seen = Mutex::new(Vec::new());
        let report = run_lane(
            lane,
            &|i| {
                seen.lock().unwrap().push(i);
                if i == 1 {
                    // Another lane fails while this item is in flight.
                    outcome.try_record(Some(7), Error::Cancelled);
                }
                Ok(())
            },
            &outcome,
        );
        assert_eq!(report.exit, LaneExit::Stopped);
        assert_eq!(report.processed, 2);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_panic_is_recorded() {
        let lane = partition(["a", "b"], 1).remove(0);
        let outcome = ExecutionOutcome::<()>::new(1);
        let report = run_lane(
            lane,
            &|item| {
                if item == "b" {
                    panic!("bad item {item}");
                }
                Ok(())
            },
            &outcome,
        );
        assert_eq!(report.exit, LaneExit::Failed);
        assert_eq!(report.processed, 1);
        match outcome.wait() {
            Err(Error::Panicked { lane, message }) => {
                assert_eq!(lane, 0);
                assert_eq!(message, "bad item b");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
