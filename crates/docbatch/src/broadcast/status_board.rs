//! Read-only view of the queue for observers.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use crate::queue::{QueueItem, QueueStats};

/// Which items [`StatusBoard::list`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Include completed and failed items.
    pub include_terminal: bool,
}

impl ListFilter {
    pub fn all() -> Self {
        Self {
            include_terminal: true,
        }
    }

    pub fn active() -> Self {
        Self {
            include_terminal: false,
        }
    }
}

/// Snapshot of the queue, replaced wholesale by the scheduler thread after
/// every change. Readers never see a half-applied update.
#[derive(Clone, Default)]
pub struct StatusBoard {
    items: Arc<RwLock<Vec<QueueItem>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn replace(&self, items: Vec<QueueItem>) {
        let mut guard = match self.items.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Status board lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = items;
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<QueueItem>> {
        match self.items.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Status board lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats::from_items(self.read().iter())
    }

    /// Items in dequeue order.
    pub fn list(&self, filter: ListFilter) -> Vec<QueueItem> {
        self.read()
            .iter()
            .filter(|item| filter.include_terminal || !item.state().is_terminal())
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<QueueItem> {
        self.read().iter().find(|item| item.id == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{create_batch_split, ProcessingState, SplitOptions};
    use crate::queue::BatchQueue;

    fn queue_with_states(states: &[ProcessingState]) -> BatchQueue {
        let mut queue = BatchQueue::new();
        for state in states {
            let mut op = create_batch_split(["f1"], SplitOptions::every_pages(1)).unwrap();
            op.status.state = *state;
            queue.add(op, 0, 3).unwrap();
        }
        queue
    }

    #[test]
    fn test_empty_board() {
        let board = StatusBoard::new();
        assert_eq!(board.stats(), QueueStats::default());
        assert!(board.list(ListFilter::all()).is_empty());
        assert!(board.get("nope").is_none());
    }

    #[test]
    fn test_list_filters_terminal() {
        let queue = queue_with_states(&[
            ProcessingState::Completed,
            ProcessingState::Pending,
            ProcessingState::Failed,
            ProcessingState::Paused,
        ]);
        let board = StatusBoard::new();
        board.replace(queue.items().to_vec());

        assert_eq!(board.list(ListFilter::all()).len(), 4);
        let active = board.list(ListFilter::active());
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|item| !item.state().is_terminal()));

        let stats = board.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.paused, 1);
    }

    #[test]
    fn test_clones_share_snapshot() {
        let queue = queue_with_states(&[ProcessingState::Pending]);
        let id = queue.items()[0].id.clone();
        let board = StatusBoard::new();
        let reader = board.clone();

        board.replace(queue.items().to_vec());
        assert_eq!(reader.get(&id).unwrap().id, id);

        board.replace(Vec::new());
        assert!(reader.get(&id).is_none());
    }
}
