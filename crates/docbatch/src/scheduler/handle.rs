use crossbeam_channel::{bounded, Sender};
use tokio::sync::broadcast;

use crate::broadcast::{BatchEvent, BatchProgressBroadcaster, ListFilter, StatusBoard};
use crate::error::{Result, SchedulerError};
use crate::operation::BatchOperation;
use crate::queue::{QueueItem, QueueStats};

use super::command::{Command, DrainSummary};

/// Cloneable front end of a running [`crate::scheduler::BatchScheduler`].
///
/// Control methods hand a command to the scheduler thread and return once
/// it is queued; they only fail when the scheduler has stopped. Requests
/// that do not apply to the target's current state are ignored. Read
/// methods answer from the last published snapshot, which trails queued
/// commands until the thread gets to them (see [`BatchHandle::flush`]).
#[derive(Clone)]
pub struct BatchHandle {
    commands: Sender<Command>,
    board: StatusBoard,
    events: BatchProgressBroadcaster,
    default_max_retries: u32,
}

impl BatchHandle {
    pub(crate) fn new(
        commands: Sender<Command>,
        board: StatusBoard,
        events: BatchProgressBroadcaster,
        default_max_retries: u32,
    ) -> Self {
        Self {
            commands,
            board,
            events,
            default_max_retries,
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SchedulerError::ChannelClosed.into())
    }

    /// Queues an operation with the configured retry budget and returns its
    /// id. Does not start processing.
    pub fn enqueue(&self, operation: BatchOperation, priority: i32) -> Result<String> {
        self.enqueue_with_retries(operation, priority, self.default_max_retries)
    }

    pub fn enqueue_with_retries(
        &self,
        operation: BatchOperation,
        priority: i32,
        max_retries: u32,
    ) -> Result<String> {
        let id = operation.id.clone();
        self.send(Command::Enqueue {
            operation,
            priority,
            max_retries,
        })?;
        Ok(id)
    }

    /// Pauses a pending operation, or a processing one after its current
    /// unit.
    pub fn pause(&self, id: &str) -> Result<()> {
        self.send(Command::Pause(id.to_string()))
    }

    /// Returns a paused operation to pending and starts a drain.
    pub fn resume(&self, id: &str) -> Result<()> {
        self.send(Command::Resume(id.to_string()))
    }

    /// Cancels a pending or paused operation, or a processing one after its
    /// current unit. Cancelled operations leave the queue.
    pub fn cancel(&self, id: &str) -> Result<()> {
        self.send(Command::Cancel(id.to_string()))
    }

    /// Re-admits a failed operation while it has retries left, clearing its
    /// results, and starts a drain.
    pub fn retry(&self, id: &str) -> Result<()> {
        self.send(Command::Retry(id.to_string()))
    }

    /// Drops an operation from the queue in any state. Unknown ids are
    /// ignored.
    pub fn remove(&self, id: &str) -> Result<()> {
        self.send(Command::Remove(id.to_string()))
    }

    /// Drops every completed and failed operation.
    pub fn clear_terminal(&self) -> Result<()> {
        self.send(Command::ClearTerminal)
    }

    /// Runs queued operations until none is eligible and blocks until then.
    /// A call made while a drain is running waits for that drain instead of
    /// starting another.
    pub fn process_queue(&self) -> Result<DrainSummary> {
        let (reply, response) = bounded(1);
        self.send(Command::ProcessQueue { reply })?;
        response
            .recv()
            .map_err(|_| SchedulerError::ChannelClosed.into())
    }

    /// Blocks until every command sent before this call has been applied
    /// and published.
    pub fn flush(&self) -> Result<()> {
        let (reply, response) = bounded(1);
        self.send(Command::Flush { reply })?;
        response
            .recv()
            .map_err(|_| SchedulerError::ChannelClosed.into())
    }

    pub fn stats(&self) -> QueueStats {
        self.board.stats()
    }

    pub fn list(&self, filter: ListFilter) -> Vec<QueueItem> {
        self.board.list(filter)
    }

    pub fn get(&self, id: &str) -> Option<QueueItem> {
        self.board.get(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }

    pub(crate) fn request_shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }
}
