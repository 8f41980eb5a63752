//! Workflow execution for atomos.
//!
//! This crate provides the [`Scheduler`] which handles:
//! - Ordering blocks so producers run before consumers
//! - Running independent blocks concurrently (or one at a time)
//! - Piping stored results into each block's stdin
//! - Capturing each block's stdout into the [`ResultStore`]
//!
//! Progress is reported through an [`ExecutionNotifier`].

mod block;
mod error;
mod events;
mod process;
mod scheduler;
mod store;

pub use block::{BlockExecutor, BlockTask, Produced};
pub use error::ExecutionError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use scheduler::{ExecutionReport, RunOptions, Scheduler, default_concurrency};
pub use store::ResultStore;
