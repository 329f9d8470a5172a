use crossbeam_channel::Sender;

use crate::operation::BatchOperation;

/// Result of a [`crate::scheduler::BatchHandle::process_queue`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Operations picked up during the drain, including ones that were
    /// paused, cancelled or faulted part way.
    pub processed: usize,
    /// The call joined a drain that was already running instead of starting
    /// one.
    pub already_running: bool,
}

/// Messages into the scheduler thread. The thread applies them in arrival
/// order.
pub(crate) enum Command {
    Enqueue {
        operation: BatchOperation,
        priority: i32,
        max_retries: u32,
    },
    Pause(String),
    Resume(String),
    Cancel(String),
    Retry(String),
    Remove(String),
    ClearTerminal,
    ProcessQueue {
        reply: Sender<DrainSummary>,
    },
    /// Replies once every earlier command has been applied.
    Flush {
        reply: Sender<()>,
    },
    Shutdown,
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Enqueue { .. } => "enqueue",
            Command::Pause(_) => "pause",
            Command::Resume(_) => "resume",
            Command::Cancel(_) => "cancel",
            Command::Retry(_) => "retry",
            Command::Remove(_) => "remove",
            Command::ClearTerminal => "clear_terminal",
            Command::ProcessQueue { .. } => "process_queue",
            Command::Flush { .. } => "flush",
            Command::Shutdown => "shutdown",
        }
    }
}
