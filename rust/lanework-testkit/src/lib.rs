//! Test utilities and helpers for the lanework project.
//!
//! This crate provides:
//! - [`call_log::CallLog`] for recording when processing callbacks start and
//!   finish, so tests can reason about ordering and in-flight work
//! - [`fixtures`] for item sequences and on-disk source files

pub mod call_log;
pub mod fixtures;
