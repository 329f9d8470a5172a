use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::params::OperationParams;
use super::result::BatchResult;

/// Kind of batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Export,
    Split,
    Merge,
    Watermark,
    HeaderFooter,
    Security,
}

impl OperationType {
    /// Merge combines every input into one output instead of transforming
    /// each file independently.
    pub fn is_merge(&self) -> bool {
        matches!(self, OperationType::Merge)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Export => "export",
            OperationType::Split => "split",
            OperationType::Merge => "merge",
            OperationType::Watermark => "watermark",
            OperationType::HeaderFooter => "header_footer",
            OperationType::Security => "security",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    Processing,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl ProcessingState {
    /// Terminal states see no further automatic transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingState::Completed | ProcessingState::Failed | ProcessingState::Cancelled
        )
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingState::Pending => write!(f, "Pending"),
            ProcessingState::Processing => write!(f, "Processing"),
            ProcessingState::Paused => write!(f, "Paused"),
            ProcessingState::Completed => write!(f, "Completed"),
            ProcessingState::Failed => write!(f, "Failed"),
            ProcessingState::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatus {
    pub state: ProcessingState,
    /// Human-readable label of the current step.
    pub current_step: String,
    pub total_steps: u32,
    pub completed_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingStatus {
    pub fn pending(total_steps: u32) -> Self {
        Self {
            state: ProcessingState::Pending,
            current_step: "Initializing".to_string(),
            total_steps,
            completed_steps: 0,
            message: None,
            error: None,
        }
    }
}

/// One composite unit of batch work: a set of files and the per-type
/// parameters to apply to them.
///
/// Identity fields (`id`, `kind`, `files`, `operations`) never change after
/// construction. `status`, `progress`, `results` and the timestamps are only
/// written by the result aggregator on the scheduler thread; observers see
/// cloned snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperation {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OperationType,
    /// File registry identifiers, in processing order.
    pub files: Vec<String>,
    pub operations: Vec<OperationParams>,
    pub status: ProcessingStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub results: Vec<BatchResult>,
}

impl BatchOperation {
    /// Number of units the executor runs: one per file per payload, or a
    /// single unit for merge.
    pub fn unit_count(&self) -> u32 {
        if self.kind.is_merge() {
            1
        } else {
            (self.files.len() * self.operations.len()) as u32
        }
    }

    pub fn state(&self) -> ProcessingState {
        self.status.state
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    /// Elapsed wall time, measured to `end_time` or to now while running.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let start = self.start_time?;
        let end = self.end_time.unwrap_or_else(Utc::now);
        Some(end - start)
    }
}

/// Formats a duration the way the queue panel shows it: `1h 2m 3s`, `2m 5s`
/// or `7s`.
pub fn format_duration(duration: chrono::Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}
