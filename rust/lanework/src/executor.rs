//! The completion coordinator.
//!
//! [`LaneExecutor`] partitions the items into lanes, starts one worker per
//! non-empty lane, and suspends the caller until either every lane drained or
//! the first error was claimed. On error the remaining lanes are told to stop
//! and the call returns right away; lanes that are in the middle of an item
//! finish it in the background and their results are discarded.

use std::{
    sync::{Arc, Weak},
    thread,
    time::Instant,
};

use crate::{
    cancel::{Cancellable, CancellationToken},
    config::ExecutorConfig,
    error::Error,
    outcome::ExecutionOutcome,
    partition::{Lane, partition},
    worker,
};

/// Non-empty lanes with the outcome they report into.
type Prepared<T, E> = (Vec<Lane<T>>, Arc<ExecutionOutcome<E>>);

/// Runs items through a caller-supplied operation on a fixed number of lanes.
///
/// Item `k` is processed on lane `k % lane_count`; each lane processes its
/// items strictly in order on its own thread, and lanes run concurrently.
/// The lane count therefore bounds the number of items in flight.
///
/// The result is all-or-first-error: `Ok(())` means every item was processed
/// successfully, otherwise exactly one error is returned. When several lanes
/// fail at about the same time, the one that reaches the shared outcome first
/// wins; no lane-index or wall-clock priority is applied.
#[derive(Debug, Clone, Default)]
pub struct LaneExecutor {
    config: ExecutorConfig,
}

impl LaneExecutor {
    pub fn new(config: ExecutorConfig) -> lanework_common::Result<LaneExecutor> {
        config.validate()?;
        Ok(LaneExecutor { config })
    }

    pub fn with_lane_count(lane_count: usize) -> lanework_common::Result<LaneExecutor> {
        Self::new(ExecutorConfig::new(lane_count)?)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn lane_count(&self) -> usize {
        self.config.lane_count
    }

    /// Processes every item with `operation` and blocks until all lanes
    /// drained or one of them failed.
    ///
    /// With no items, returns `Ok(())` without starting any thread.
    ///
    /// # Panics
    ///
    /// Panics if a lane thread cannot be spawned. Lanes started before the
    /// failure are told to stop and do not begin any further item.
    pub fn execute<T, E, F>(
        &self,
        items: impl IntoIterator<Item = T>,
        operation: F,
    ) -> Result<(), Error<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Result<(), Error<E>> + Send + Sync + 'static,
    {
        self.run(items, operation, None)
    }

    /// Same as [`execute`](Self::execute), but also ends with
    /// [`Error::Cancelled`] as soon as `token` is cancelled.
    pub fn execute_with_cancel<T, E, F>(
        &self,
        items: impl IntoIterator<Item = T>,
        operation: F,
        token: &CancellationToken,
    ) -> Result<(), Error<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Result<(), Error<E>> + Send + Sync + 'static,
    {
        self.run(items, operation, Some(token))
    }

    fn run<T, E, F>(
        &self,
        items: impl IntoIterator<Item = T>,
        operation: F,
        token: Option<&CancellationToken>,
    ) -> Result<(), Error<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Result<(), Error<E>> + Send + Sync + 'static,
    {
        let Some((lanes, outcome)) = self.prepare(items, token)? else {
            return Ok(());
        };
        let started = Instant::now();
        let lane_total = lanes.len();
        let operation = Arc::new(operation);

        let mut threads = Vec::with_capacity(lane_total);
        for lane in lanes {
            let index = lane.index();
            let lane_outcome = outcome.clone();
            let operation = operation.clone();
            let mut builder = thread::Builder::new();
            if !self.config.thread_name_prefix.is_empty() {
                builder = builder.name(format!("{}-{index}", self.config.thread_name_prefix));
            }
            let spawned = builder.spawn(move || {
                let report = worker::run_lane(lane, operation.as_ref(), &lane_outcome);
                log::debug!(
                    "lane {}: {:?} after {} items",
                    report.lane,
                    report.exit,
                    report.processed
                );
                lane_outcome.lane_finished();
            });
            match spawned {
                Ok(handle) => threads.push(handle.thread().clone()),
                Err(e) => {
                    stop_lanes(&outcome, &threads);
                    panic!("failed to spawn the thread for lane {index}: {e}");
                }
            }
        }

        let result = match self.config.deadline() {
            Some(deadline) => outcome.wait_until(started + deadline),
            None => outcome.wait(),
        };
        if result.is_err() {
            stop_lanes(&outcome, &threads);
        }
        log_result(&result, lane_total, started);
        result
    }

    /// Partitions the items and sets up the shared outcome.
    ///
    /// Returns `Ok(None)` when there is nothing to run, and
    /// `Err(Error::Cancelled)` when `token` is already cancelled.
    fn prepare<T, E>(
        &self,
        items: impl IntoIterator<Item = T>,
        token: Option<&CancellationToken>,
    ) -> Result<Option<Prepared<T, E>>, Error<E>>
    where
        E: Send + 'static,
    {
        if token.is_some_and(CancellationToken::is_cancelled) {
            log::debug!("token cancelled before the execution started");
            return Err(Error::Cancelled);
        }
        let lanes = partition(items, self.config.lane_count)
            .into_iter()
            .filter(|lane| !lane.is_empty())
            .collect::<Vec<_>>();
        if lanes.is_empty() {
            log::debug!("no items to process");
            return Ok(None);
        }
        let outcome = Arc::new(ExecutionOutcome::new(lanes.len()));
        if let Some(token) = token {
            token.attach(Arc::downgrade(&outcome) as Weak<dyn Cancellable>);
        }
        Ok(Some((lanes, outcome)))
    }
}

#[cfg(feature = "tokio")]
impl LaneExecutor {
    /// Async counterpart of [`execute`](Self::execute): each non-empty lane
    /// runs as its own tokio task, and the caller awaits the same
    /// drained-or-first-error condition.
    ///
    /// Must be called within a tokio runtime.
    pub async fn execute_async<T, E, F, Fut>(
        &self,
        items: impl IntoIterator<Item = T>,
        operation: F,
    ) -> Result<(), Error<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), Error<E>>> + Send + 'static,
    {
        self.run_async(items, operation, None).await
    }

    /// Async counterpart of [`execute_with_cancel`](Self::execute_with_cancel).
    pub async fn execute_async_with_cancel<T, E, F, Fut>(
        &self,
        items: impl IntoIterator<Item = T>,
        operation: F,
        token: &CancellationToken,
    ) -> Result<(), Error<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), Error<E>>> + Send + 'static,
    {
        self.run_async(items, operation, Some(token)).await
    }

    async fn run_async<T, E, F, Fut>(
        &self,
        items: impl IntoIterator<Item = T>,
        operation: F,
        token: Option<&CancellationToken>,
    ) -> Result<(), Error<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), Error<E>>> + Send + 'static,
    {
        let Some((lanes, outcome)) = self.prepare(items, token)? else {
            return Ok(());
        };
        let started = Instant::now();
        let lane_total = lanes.len();
        let operation = Arc::new(operation);

        for lane in lanes {
            let outcome = outcome.clone();
            let operation = operation.clone();
            lanework_common::async_runtime::spawn(async move {
                let report = worker::run_lane_async(lane, operation.as_ref(), &outcome).await;
                log::debug!(
                    "lane {}: {:?} after {} items",
                    report.lane,
                    report.exit,
                    report.processed
                );
                outcome.lane_finished();
            });
        }

        let result = match self.config.deadline() {
            Some(deadline) => {
                let deadline = tokio::time::Instant::from_std(started + deadline);
                match tokio::time::timeout_at(deadline, outcome.wait_async()).await {
                    Ok(result) => result,
                    Err(_) => outcome.expire(),
                }
            }
            None => outcome.wait_async().await,
        };
        if result.is_err() {
            outcome.stop();
        }
        log_result(&result, lane_total, started);
        result
    }
}

/// Processes `items` on `lane_count` lanes with the default configuration.
///
/// # Panics
///
/// Panics if `lane_count` is 0 or if a lane thread cannot be spawned.
pub fn execute<T, E, F>(
    items: impl IntoIterator<Item = T>,
    lane_count: usize,
    operation: F,
) -> Result<(), Error<E>>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Result<(), Error<E>> + Send + Sync + 'static,
{
    assert_ne!(lane_count, 0, "lane_count must be positive");
    let executor = LaneExecutor {
        config: ExecutorConfig {
            lane_count,
            ..Default::default()
        },
    };
    executor.execute(items, operation)
}

/// Raises the stop flag and unparks the given lane threads.
///
/// The unpark is a best-effort wake for callbacks parked on their lane thread.
fn stop_lanes<E>(outcome: &ExecutionOutcome<E>, threads: &[thread::Thread]) {
    outcome.stop();
    threads.iter().for_each(thread::Thread::unpark);
}

fn log_result<E>(result: &Result<(), Error<E>>, lanes: usize, started: Instant) {
    match result {
        Ok(()) => log::info!("{lanes} lanes drained in {:?}", started.elapsed()),
        Err(error) => log::warn!(
            "execution over {lanes} lanes ended with a {} after {:?}",
            error.label(),
            started.elapsed()
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use super::{LaneExecutor, execute, stop_lanes};
    use crate::{
        config::ExecutorConfig,
        error::Error,
        outcome::ExecutionOutcome,
        partition::partition,
        worker::{self, LaneExit},
    };

    #[test]
    fn test_execute_all_succeed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let res: Result<(), Error<()>> = execute(["a", "b", "c", "d", "e"], 2, move |item| {
            recorder.lock().unwrap().push(item);
            Ok(())
        });
        assert!(res.is_ok());
        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_empty_input_spawns_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let executor = LaneExecutor::with_lane_count(4).unwrap();
        let res = executor.execute(Vec::<u32>::new(), move |_| -> Result<(), Error<()>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(res.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let prepared = executor.prepare::<u32, ()>(Vec::new(), None).unwrap();
        assert!(prepared.is_none());
    }

    #[test]
    fn test_empty_lanes_are_not_started() {
        let executor = LaneExecutor::with_lane_count(4).unwrap();
        let (lanes, _outcome) = executor
            .prepare::<_, ()>(["a", "b"], None)
            .unwrap()
            .unwrap();
        let indices = lanes.iter().map(|lane| lane.index()).collect::<Vec<_>>();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_stop_lanes_halts_started_lanes() {
        let outcome = Arc::new(ExecutionOutcome::<()>::new(2));
        let lane = partition(0..1000, 1).remove(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let lane_outcome = outcome.clone();
        let counter = calls.clone();
        let handle = std::thread::spawn(move || {
            let operation = move |_: i32| -> Result<(), Error<()>> {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(1));
                Ok(())
            };
            let report = worker::run_lane(lane, &operation, &lane_outcome);
            lane_outcome.lane_finished();
            report
        });
        while calls.load(Ordering::SeqCst) == 0 {
            std::thread::yield_now();
        }

        // The second lane never started, as after a failed spawn.
        stop_lanes(&outcome, &[handle.thread().clone()]);
        let report = handle.join().unwrap();
        assert_eq!(report.exit, LaneExit::Stopped);
        assert!(report.processed < 1000);
        assert_eq!(calls.load(Ordering::SeqCst), report.processed);
    }

    #[test]
    fn test_thread_names() {
        let names = Arc::new(Mutex::new(Vec::new()));
        let recorder = names.clone();
        let executor = LaneExecutor::new(
            ExecutorConfig::new(2)
                .unwrap()
                .with_thread_name_prefix("segment"),
        )
        .unwrap();
        executor
            .execute(0..2, move |_| -> Result<(), Error<()>> {
                let name = std::thread::current().name().map(str::to_string);
                recorder.lock().unwrap().push(name.unwrap_or_default());
                Ok(())
            })
            .unwrap();
        let mut names = names.lock().unwrap().clone();
        names.sort();
        assert_eq!(names, vec!["segment-0", "segment-1"]);
    }

    #[test]
    fn test_deadline_cancels() {
        let executor = LaneExecutor::new(
            ExecutorConfig::new(1)
                .unwrap()
                .with_deadline(Duration::from_millis(30)),
        )
        .unwrap();
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();
        let res = executor.execute(0..100, move |_| -> Result<(), Error<()>> {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            Ok(())
        });
        assert!(matches!(res, Err(Error::Cancelled)));
        std::thread::sleep(Duration::from_millis(50));
        assert!(started.load(Ordering::SeqCst) < 100);
    }

    #[test]
    #[should_panic]
    fn test_zero_lanes_panics() {
        let _ = execute(0..3, 0, |_| -> Result<(), Error<()>> { Ok(()) });
    }

    #[test]
    fn test_with_lane_count_rejects_zero() {
        assert!(LaneExecutor::with_lane_count(0).is_err());
    }
}
