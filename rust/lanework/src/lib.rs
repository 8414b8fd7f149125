//! Bounded-parallelism execution of ordered work items.
//!
//! `lanework` splits an ordered sequence of items into a fixed number of
//! lanes, drains each lane sequentially on its own worker, runs all lanes
//! concurrently, and returns once every lane drained or any lane failed.
//!
//! # Key Components
//!
//! - [`partition`] - Round-robin assignment of items to lanes: the item at
//!   index `k` goes to lane `k % lane_count`.
//! - [`LaneExecutor`] - The coordinator. Starts one worker per non-empty lane,
//!   blocks (without polling) until completion or the first error, and tells
//!   the remaining lanes to stop on failure.
//! - [`CancellationToken`] - Cooperative cancellation from the outside.
//! - [`ExecutorConfig`] - Lane count, thread naming and an optional deadline.
//!
//! # Semantics
//!
//! - Items of one lane are processed strictly in order, one at a time.
//! - The result is all-or-first-error: exactly one [`Error`] is surfaced,
//!   whichever lane claimed the shared first-error slot first.
//! - Cancellation is checked only before a lane starts its next item. Items
//!   already started always run to completion; after a failure the call
//!   returns without waiting for them.
//!
//! ```rust,no_run
//! use lanework::{Error, LaneExecutor};
//!
//! let executor = LaneExecutor::with_lane_count(3).unwrap();
//! let res = executor.execute(vec!["seg-1", "seg-2", "seg-3"], |segment| {
//!     std::fs::read(segment)?;
//!     Ok::<(), Error<std::io::Error>>(())
//! });
//! assert!(res.is_ok());
//! ```

mod cancel;
pub mod config;
mod error;
mod executor;
mod outcome;
pub mod partition;
mod worker;

pub use cancel::CancellationToken;
pub use config::ExecutorConfig;
pub use error::Error;
pub use executor::{LaneExecutor, execute};
pub use partition::{Lane, partition};
