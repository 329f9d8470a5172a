//! Runs one batch operation's file × payload matrix.

pub mod control;
pub mod error;
pub mod runner;

pub use control::{ExecutionControl, ExecutionOutcome, NoopControl};
pub use error::ExecutorError;
pub use runner::{Executor, UNKNOWN_FILE_NAME};
