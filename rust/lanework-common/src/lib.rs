//! Core definitions shared by all lanework-* crates.

pub mod async_runtime;
pub mod error;
pub mod result;

pub use result::Result;
