//! The scheduler thread: sole owner of the queue and of the operation being
//! executed.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};

use crate::broadcast::{BatchEvent, BatchEventKind, BatchProgressBroadcaster, StatusBoard};
use crate::executor::{ExecutionControl, ExecutionOutcome, Executor};
use crate::operation::aggregate;
use crate::operation::{BatchOperation, ProcessingState};
use crate::queue::{BatchQueue, QueueItem};

use super::command::{Command, DrainSummary};

/// Queue bookkeeping of the operation taken out for execution.
struct ActiveSlot {
    id: String,
    priority: i32,
    retry_count: u32,
    max_retries: u32,
    sequence: u64,
}

impl ActiveSlot {
    fn take(item: QueueItem) -> (Self, BatchOperation) {
        let QueueItem {
            id,
            priority,
            retry_count,
            max_retries,
            sequence,
            operation,
        } = item;
        let slot = Self {
            id,
            priority,
            retry_count,
            max_retries,
            sequence,
        };
        (slot, operation)
    }

    fn to_item(&self, operation: BatchOperation) -> QueueItem {
        QueueItem {
            id: self.id.clone(),
            priority: self.priority,
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            sequence: self.sequence,
            operation,
        }
    }
}

pub(crate) struct SchedulerState {
    queue: BatchQueue,
    board: StatusBoard,
    events: BatchProgressBroadcaster,
    retain_finished: bool,
    draining: bool,
    drain_requested: bool,
    /// `process_queue` callers, and whether each joined a running drain.
    waiters: Vec<(Sender<DrainSummary>, bool)>,
    /// `flush` callers, answered on the next publish.
    flushes: Vec<Sender<()>>,
    shutdown: bool,
}

impl SchedulerState {
    pub(crate) fn new(
        board: StatusBoard,
        events: BatchProgressBroadcaster,
        retain_finished: bool,
    ) -> Self {
        Self {
            queue: BatchQueue::new(),
            board,
            events,
            retain_finished,
            draining: false,
            drain_requested: false,
            waiters: Vec::new(),
            flushes: Vec::new(),
            shutdown: false,
        }
    }

    fn publish(&mut self, active: Option<(&ActiveSlot, &BatchOperation)>) {
        let extra = active.map(|(slot, operation)| slot.to_item(operation.clone()));
        self.board.replace(self.queue.snapshot_with(extra));
        for reply in self.flushes.drain(..) {
            let _ = reply.send(());
        }
    }

    fn emit(&self, kind: BatchEventKind, operation: &BatchOperation) {
        self.events.send(BatchEvent::from_operation(kind, operation));
    }

    /// Applies one command. `active` is the operation currently executing,
    /// which is not in the queue while it runs.
    fn apply(&mut self, command: Command, active: Option<&mut BatchOperation>) {
        debug!("Applying {} command", command.name());
        match command {
            Command::Enqueue {
                operation,
                priority,
                max_retries,
            } => self.enqueue(operation, priority, max_retries, active.as_deref()),
            Command::Pause(id) => self.pause(&id, active),
            Command::Resume(id) => self.resume(&id, active),
            Command::Cancel(id) => self.cancel(&id, active),
            Command::Retry(id) => self.retry(&id),
            Command::Remove(id) => self.remove(&id, active),
            Command::ClearTerminal => {
                let removed = self.queue.clear_terminal();
                info!("Cleared {} finished operations", removed.len());
                for id in removed {
                    self.events.send(BatchEvent::removed(&id));
                }
            }
            Command::ProcessQueue { reply } => {
                let joined = self.draining;
                self.waiters.push((reply, joined));
                if !joined {
                    self.drain_requested = true;
                }
            }
            Command::Flush { reply } => self.flushes.push(reply),
            Command::Shutdown => {
                info!("Scheduler shutdown requested");
                self.shutdown = true;
            }
        }
    }

    fn enqueue(
        &mut self,
        operation: BatchOperation,
        priority: i32,
        max_retries: u32,
        active: Option<&BatchOperation>,
    ) {
        if active.is_some_and(|running| running.id == operation.id) {
            warn!("Operation {} is already running", operation.id);
            return;
        }
        match self.queue.add(operation, priority, max_retries) {
            Ok(item) => {
                info!(
                    "Enqueued {} '{}' with priority {}",
                    item.id, item.operation.name, priority
                );
                self.events
                    .send(BatchEvent::from_operation(BatchEventKind::Enqueued, &item.operation));
            }
            Err(e) => warn!("Rejected enqueue: {}", e),
        }
    }

    fn pause(&mut self, id: &str, active: Option<&mut BatchOperation>) {
        if let Some(running) = active.filter(|running| running.id == id) {
            if running.state() == ProcessingState::Processing {
                aggregate::mark_paused(running);
                info!("Pausing {} after the current step", id);
                self.emit(BatchEventKind::Paused, running);
            }
            return;
        }
        match self.queue.get_mut(id) {
            Some(item) if item.state() == ProcessingState::Pending => {
                aggregate::mark_paused(&mut item.operation);
                info!("Paused {}", id);
                self.events
                    .send(BatchEvent::from_operation(BatchEventKind::Paused, &item.operation));
            }
            Some(item) => debug!("Ignoring pause of {} in state {}", id, item.state()),
            None => debug!("Ignoring pause of unknown operation {}", id),
        }
    }

    fn resume(&mut self, id: &str, active: Option<&mut BatchOperation>) {
        if let Some(running) = active.filter(|running| running.id == id) {
            // Paused at this checkpoint and not yet returned to the queue.
            if running.state() == ProcessingState::Paused {
                aggregate::mark_running(running);
                info!("Resumed {} before it left the executor", id);
                self.emit(BatchEventKind::Resumed, running);
            }
            return;
        }
        match self.queue.get_mut(id) {
            Some(item) if item.state() == ProcessingState::Paused => {
                aggregate::mark_resumed(&mut item.operation);
                info!(
                    "Resumed {} at step {}/{}",
                    id, item.operation.status.completed_steps, item.operation.status.total_steps
                );
                self.events
                    .send(BatchEvent::from_operation(BatchEventKind::Resumed, &item.operation));
                self.drain_requested = true;
            }
            Some(item) => debug!("Ignoring resume of {} in state {}", id, item.state()),
            None => debug!("Ignoring resume of unknown operation {}", id),
        }
    }

    fn cancel(&mut self, id: &str, active: Option<&mut BatchOperation>) {
        if let Some(running) = active.filter(|running| running.id == id) {
            if is_live(running) {
                aggregate::mark_cancelled(running);
                info!("Cancelling {} after the current step", id);
                self.emit(BatchEventKind::Cancelled, running);
            }
            return;
        }
        let cancellable = self.queue.get(id).map(|item| {
            matches!(
                item.state(),
                ProcessingState::Pending | ProcessingState::Paused
            )
        });
        match cancellable {
            Some(true) => {
                if let Some(mut item) = self.queue.remove(id) {
                    aggregate::mark_cancelled(&mut item.operation);
                    info!("Cancelled {}", id);
                    self.emit(BatchEventKind::Cancelled, &item.operation);
                }
            }
            Some(false) => debug!("Ignoring cancel of finished operation {}", id),
            None => debug!("Ignoring cancel of unknown operation {}", id),
        }
    }

    fn retry(&mut self, id: &str) {
        match self.queue.get_mut(id) {
            Some(item) if item.can_retry() => {
                aggregate::reset_for_retry(&mut item.operation);
                item.retry_count += 1;
                info!(
                    "Retrying {} (attempt {}/{})",
                    id, item.retry_count, item.max_retries
                );
                self.events
                    .send(BatchEvent::from_operation(BatchEventKind::Retried, &item.operation));
                self.drain_requested = true;
            }
            Some(item) if item.state() == ProcessingState::Failed => {
                warn!("Operation {} has used all {} retries", id, item.max_retries)
            }
            Some(item) => debug!("Ignoring retry of {} in state {}", id, item.state()),
            None => debug!("Ignoring retry of unknown operation {}", id),
        }
    }

    fn remove(&mut self, id: &str, active: Option<&mut BatchOperation>) {
        if let Some(running) = active.filter(|running| running.id == id) {
            if is_live(running) {
                aggregate::mark_cancelled(running);
                info!("Removing {} after the current step", id);
                self.events.send(BatchEvent::removed(id));
            }
            return;
        }
        if self.queue.remove(id).is_some() {
            info!("Removed {}", id);
            self.events.send(BatchEvent::removed(id));
        }
    }

    /// Files a finished operation according to the retention setting.
    fn settle(&mut self, slot: ActiveSlot, operation: BatchOperation) {
        if self.retain_finished {
            self.queue.reinsert(slot.to_item(operation));
        } else {
            debug!("Dropping finished operation {}", slot.id);
            self.events.send(BatchEvent::removed(&slot.id));
        }
    }

    fn answer_waiters(&mut self, processed: usize) {
        for (reply, already_running) in self.waiters.drain(..) {
            let _ = reply.send(DrainSummary {
                processed,
                already_running,
            });
        }
    }
}

/// The running operation still accepts cancel and remove, including after a
/// pause applied at the same checkpoint.
fn is_live(operation: &BatchOperation) -> bool {
    matches!(
        operation.state(),
        ProcessingState::Processing | ProcessingState::Paused
    )
}

/// Checkpoint hook handed to the executor: drains pending commands and
/// republishes the snapshot between units.
struct SchedulerControl<'a> {
    state: &'a mut SchedulerState,
    commands: &'a Receiver<Command>,
    slot: &'a ActiveSlot,
    started: bool,
}

impl ExecutionControl for SchedulerControl<'_> {
    fn checkpoint(&mut self, operation: &mut BatchOperation) {
        let kind = if self.started {
            BatchEventKind::Progress
        } else {
            self.started = true;
            BatchEventKind::Started
        };
        self.state.emit(kind, operation);

        while let Ok(command) = self.commands.try_recv() {
            self.state.apply(command, Some(&mut *operation));
        }
        self.state.publish(Some((self.slot, &*operation)));
    }
}

pub(crate) struct Scheduler {
    executor: Executor,
    state: SchedulerState,
}

impl Scheduler {
    pub(crate) fn new(executor: Executor, state: SchedulerState) -> Self {
        Self { executor, state }
    }

    /// Applies commands until shutdown or until every handle is dropped.
    pub(crate) fn run(mut self, commands: Receiver<Command>) {
        debug!("Scheduler thread started");

        while let Ok(command) = commands.recv() {
            self.state.apply(command, None);
            self.state.publish(None);

            if self.state.drain_requested && !self.state.shutdown {
                self.drain(&commands);
            }
            if self.state.shutdown {
                break;
            }
        }

        self.state.answer_waiters(0);
        debug!("Scheduler thread stopped");
    }

    /// Runs eligible operations one at a time until none is left.
    fn drain(&mut self, commands: &Receiver<Command>) {
        self.state.draining = true;
        self.state.drain_requested = false;
        info!("Draining batch queue ({} queued)", self.state.queue.len());

        let mut processed = 0;
        loop {
            while let Ok(command) = commands.try_recv() {
                self.state.apply(command, None);
            }
            self.state.publish(None);

            if self.state.shutdown {
                break;
            }
            let Some(id) = self.state.queue.next_eligible().map(str::to_string) else {
                break;
            };
            let Some(item) = self.state.queue.remove(&id) else {
                break;
            };
            self.run_item(item, commands);
            processed += 1;
        }

        self.state.draining = false;
        self.state.drain_requested = false;
        info!("Drain finished, {} operations processed", processed);
        self.state.answer_waiters(processed);
    }

    fn run_item(&mut self, item: QueueItem, commands: &Receiver<Command>) {
        let (slot, mut operation) = ActiveSlot::take(item);
        debug!("Dequeued {} with priority {}", slot.id, slot.priority);

        let outcome = {
            let mut control = SchedulerControl {
                state: &mut self.state,
                commands,
                slot: &slot,
                started: false,
            };
            self.executor.execute(&mut operation, &mut control)
        };

        match outcome {
            Ok(ExecutionOutcome::Finished) => {
                let kind = if operation.state() == ProcessingState::Failed {
                    BatchEventKind::Failed
                } else {
                    BatchEventKind::Completed
                };
                self.state.emit(kind, &operation);
                self.state.settle(slot, operation);
            }
            Ok(ExecutionOutcome::Interrupted) => {
                if operation.state() == ProcessingState::Cancelled {
                    debug!("Dropping cancelled operation {}", slot.id);
                } else {
                    info!(
                        "Operation {} stopped at step {}/{}",
                        slot.id,
                        operation.status.completed_steps,
                        operation.status.total_steps
                    );
                    self.state.queue.reinsert(slot.to_item(operation));
                }
            }
            Err(e) => {
                error!("Operation {} aborted: {}", slot.id, e);
                aggregate::fault(&mut operation, e.to_string());
                self.state.emit(BatchEventKind::Failed, &operation);
                self.state.settle(slot, operation);
            }
        }

        self.state.publish(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{create_batch_split, SplitOptions};
    use crossbeam_channel::bounded;

    fn state() -> SchedulerState {
        SchedulerState::new(StatusBoard::new(), BatchProgressBroadcaster::new(16), true)
    }

    fn op() -> BatchOperation {
        create_batch_split(["f1"], SplitOptions::every_pages(1)).unwrap()
    }

    fn enqueue(state: &mut SchedulerState, operation: BatchOperation, priority: i32) -> String {
        let id = operation.id.clone();
        state.apply(
            Command::Enqueue {
                operation,
                priority,
                max_retries: 1,
            },
            None,
        );
        id
    }

    #[test]
    fn test_pause_resume_pending() {
        let mut state = state();
        let id = enqueue(&mut state, op(), 0);

        state.apply(Command::Pause(id.clone()), None);
        assert_eq!(state.queue.get(&id).unwrap().state(), ProcessingState::Paused);
        assert!(!state.drain_requested);

        state.apply(Command::Resume(id.clone()), None);
        assert_eq!(state.queue.get(&id).unwrap().state(), ProcessingState::Pending);
        assert!(state.drain_requested);
    }

    #[test]
    fn test_cancel_removes_from_queue() {
        let mut state = state();
        let id = enqueue(&mut state, op(), 0);
        let mut events = state.events.subscribe();

        state.apply(Command::Cancel(id.clone()), None);

        assert!(state.queue.is_empty());
        let event = events.try_recv().unwrap();
        assert_eq!(event.kind, BatchEventKind::Cancelled);
        assert_eq!(event.state, Some(ProcessingState::Cancelled));
    }

    #[test]
    fn test_commands_reach_running_operation() {
        let mut state = state();
        let mut running = op();
        running.status.state = ProcessingState::Processing;
        let id = running.id.clone();

        // Enqueueing the running id again is rejected.
        state.apply(
            Command::Enqueue {
                operation: running.clone(),
                priority: 0,
                max_retries: 1,
            },
            Some(&mut running),
        );
        assert!(state.queue.is_empty());

        state.apply(Command::Pause(id.clone()), Some(&mut running));
        assert_eq!(running.state(), ProcessingState::Paused);

        running.status.state = ProcessingState::Processing;
        state.apply(Command::Cancel(id), Some(&mut running));
        assert_eq!(running.state(), ProcessingState::Cancelled);
    }

    #[test]
    fn test_commands_after_pause_at_same_checkpoint() {
        let mut state = state();
        let mut running = op();
        running.status.state = ProcessingState::Processing;
        let id = running.id.clone();
        let mut events = state.events.subscribe();

        state.apply(Command::Pause(id.clone()), Some(&mut running));
        state.apply(Command::Resume(id.clone()), Some(&mut running));
        assert_eq!(running.state(), ProcessingState::Processing);

        state.apply(Command::Pause(id.clone()), Some(&mut running));
        state.apply(Command::Remove(id.clone()), Some(&mut running));
        assert_eq!(running.state(), ProcessingState::Cancelled);

        let kinds: Vec<BatchEventKind> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|event| event.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                BatchEventKind::Paused,
                BatchEventKind::Resumed,
                BatchEventKind::Paused,
                BatchEventKind::Removed,
            ]
        );
    }

    #[test]
    fn test_retry_budget() {
        let mut state = state();
        let id = enqueue(&mut state, op(), 0);
        state.queue.get_mut(&id).unwrap().operation.status.state = ProcessingState::Failed;

        state.apply(Command::Retry(id.clone()), None);
        let item = state.queue.get(&id).unwrap();
        assert_eq!(item.retry_count, 1);
        assert_eq!(item.state(), ProcessingState::Pending);

        state.queue.get_mut(&id).unwrap().operation.status.state = ProcessingState::Failed;
        state.drain_requested = false;
        state.apply(Command::Retry(id.clone()), None);
        let item = state.queue.get(&id).unwrap();
        assert_eq!(item.retry_count, 1);
        assert_eq!(item.state(), ProcessingState::Failed);
        assert!(!state.drain_requested);
    }

    #[test]
    fn test_process_queue_while_draining_joins() {
        let mut state = state();
        let (tx, rx) = bounded(1);
        state.draining = true;

        state.apply(Command::ProcessQueue { reply: tx }, None);
        assert!(!state.drain_requested);

        state.answer_waiters(2);
        assert_eq!(
            rx.recv().unwrap(),
            DrainSummary {
                processed: 2,
                already_running: true
            }
        );
    }

    #[test]
    fn test_publish_includes_active() {
        let mut state = state();
        enqueue(&mut state, op(), 1);
        let item = QueueItem {
            id: "running".to_string(),
            priority: 5,
            retry_count: 0,
            max_retries: 3,
            sequence: 99,
            operation: op(),
        };
        let (slot, operation) = ActiveSlot::take(item);

        state.publish(Some((&slot, &operation)));

        let listed = state.board.list(crate::broadcast::ListFilter::all());
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "running");
    }
}
