//! Batch progress broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::operation::{BatchOperation, ProcessingState};

/// What happened to an operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchEventKind {
    Enqueued,
    Started,
    Progress,
    Paused,
    Resumed,
    Retried,
    Completed,
    Failed,
    Cancelled,
    Removed,
}

impl std::fmt::Display for BatchEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchEventKind::Enqueued => write!(f, "Enqueued"),
            BatchEventKind::Started => write!(f, "Started"),
            BatchEventKind::Progress => write!(f, "Progress"),
            BatchEventKind::Paused => write!(f, "Paused"),
            BatchEventKind::Resumed => write!(f, "Resumed"),
            BatchEventKind::Retried => write!(f, "Retried"),
            BatchEventKind::Completed => write!(f, "Completed"),
            BatchEventKind::Failed => write!(f, "Failed"),
            BatchEventKind::Cancelled => write!(f, "Cancelled"),
            BatchEventKind::Removed => write!(f, "Removed"),
        }
    }
}

/// Status or progress change of one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEvent {
    pub operation_id: String,
    pub kind: BatchEventKind,
    /// State after the change. Absent once the operation left the queue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ProcessingState>,
    pub progress: u8,
    pub current_step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl BatchEvent {
    /// Captures the operation's current status.
    pub fn from_operation(kind: BatchEventKind, operation: &BatchOperation) -> Self {
        Self {
            operation_id: operation.id.clone(),
            kind,
            state: Some(operation.status.state),
            progress: operation.progress,
            current_step: operation.status.current_step.clone(),
            error: operation.status.error.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Event for an operation that is no longer queued.
    pub fn removed(operation_id: &str) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            kind: BatchEventKind::Removed,
            state: None,
            progress: 0,
            current_step: String::new(),
            error: None,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts batch events to any number of observers.
#[derive(Clone)]
pub struct BatchProgressBroadcaster {
    sender: Arc<broadcast::Sender<BatchEvent>>,
}

impl BatchProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: BatchEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Receivers only see events sent after they subscribed. A receiver that
    /// falls more than `capacity` events behind gets `Lagged` and skips ahead.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BatchProgressBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
