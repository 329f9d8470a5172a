//! Observer-facing state: pushed events and a pollable snapshot.

pub mod batch_progress;
pub mod status_board;

pub use batch_progress::{BatchEvent, BatchEventKind, BatchProgressBroadcaster};
pub use status_board::{ListFilter, StatusBoard};
