//! Priority-ordered queue of batch operations.
//!
//! Ordering is descending priority, then arrival order among equal
//! priorities. Queue sizes are human-driven, so insertion is a linear scan.

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;
use crate::operation::{BatchOperation, ProcessingState};

/// Retry budget applied when none is given at enqueue time.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A queued operation plus its ordering and retry bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Same as `operation.id`.
    pub id: String,
    pub priority: i32,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Arrival order, used to break priority ties.
    pub sequence: u64,
    pub operation: BatchOperation,
}

impl QueueItem {
    pub fn state(&self) -> ProcessingState {
        self.operation.status.state
    }

    /// True while an operator retry would be accepted.
    pub fn can_retry(&self) -> bool {
        self.state() == ProcessingState::Failed && self.retry_count < self.max_retries
    }

    /// Whether `self` is dequeued before `other`.
    fn runs_before(&self, other: &QueueItem) -> bool {
        self.priority > other.priority
            || (self.priority == other.priority && self.sequence < other.sequence)
    }
}

/// Per-state counts over the retained items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
    /// Every retained item, paused ones included.
    pub total: usize,
}

impl QueueStats {
    pub fn from_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a QueueItem>,
    {
        let mut stats = Self::default();
        for item in items {
            stats.total += 1;
            match item.state() {
                ProcessingState::Pending => stats.pending += 1,
                ProcessingState::Processing => stats.processing += 1,
                ProcessingState::Paused => stats.paused += 1,
                ProcessingState::Completed => stats.completed += 1,
                ProcessingState::Failed => stats.failed += 1,
                // Cancelled items leave the queue immediately.
                ProcessingState::Cancelled => stats.total -= 1,
            }
        }
        stats
    }
}

#[derive(Debug, Default)]
pub struct BatchQueue {
    items: Vec<QueueItem>,
    next_sequence: u64,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation behind every item of equal or higher priority.
    pub fn add(
        &mut self,
        operation: BatchOperation,
        priority: i32,
        max_retries: u32,
    ) -> Result<&QueueItem, SchedulerError> {
        if self.contains(&operation.id) {
            return Err(SchedulerError::DuplicateId(operation.id));
        }

        let item = QueueItem {
            id: operation.id.clone(),
            priority,
            retry_count: 0,
            max_retries,
            sequence: self.next_sequence,
            operation,
        };
        self.next_sequence += 1;

        let index = self.reinsert(item);
        Ok(&self.items[index])
    }

    /// Puts an item taken out with [`BatchQueue::remove`] back at the position
    /// its priority and sequence give it. Returns the index it landed at.
    pub fn reinsert(&mut self, item: QueueItem) -> usize {
        let index = self
            .items
            .iter()
            .position(|existing| item.runs_before(existing))
            .unwrap_or(self.items.len());
        self.items.insert(index, item);
        index
    }

    /// Removes and returns an item. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Option<QueueItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut QueueItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Id of the next operation to run.
    ///
    /// Scans in queue order and returns the first pending item. A paused item
    /// keeps its place: anything ordered behind it waits until it is resumed,
    /// cancelled or removed.
    pub fn next_eligible(&self) -> Option<&str> {
        for item in &self.items {
            match item.state() {
                ProcessingState::Pending => return Some(&item.id),
                ProcessingState::Paused => return None,
                _ => continue,
            }
        }
        None
    }

    /// Drops completed and failed items, returning their ids.
    pub fn clear_terminal(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        self.items.retain(|item| {
            if item.state().is_terminal() {
                removed.push(item.id.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats::from_items(&self.items)
    }

    /// Items in dequeue order.
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    /// Cloned items, with `extra` placed where [`BatchQueue::reinsert`]
    /// would put it.
    pub fn snapshot_with(&self, extra: Option<QueueItem>) -> Vec<QueueItem> {
        let mut items = self.items.clone();
        if let Some(extra) = extra {
            let index = items
                .iter()
                .position(|existing| extra.runs_before(existing))
                .unwrap_or(items.len());
            items.insert(index, extra);
        }
        items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
