//! Result aggregation: the only code that writes an operation's status,
//! progress, results and timestamps.
//!
//! The scheduler thread is the single caller, so no locking is involved.

use chrono::Utc;

use super::descriptor::{BatchOperation, ProcessingState};
use super::result::BatchResult;

/// `round(completed / total * 100)`, clamped to `0..=100`. An operation with
/// no units counts as done.
pub fn compute_progress(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((completed * 100 + total / 2) / total) as u8
}

/// Moves a dequeued operation into `processing`.
///
/// `start_time` is kept when resuming so elapsed time covers the whole run.
pub fn begin(operation: &mut BatchOperation) {
    operation.status.state = ProcessingState::Processing;
    operation.status.error = None;
    operation.status.current_step = if operation.status.completed_steps == 0 {
        "Starting batch operation".to_string()
    } else {
        "Resuming batch operation".to_string()
    };
    if operation.start_time.is_none() {
        operation.start_time = Some(Utc::now());
    }
}

/// Labels the unit about to run.
pub fn step_started(operation: &mut BatchOperation, file_label: &str) {
    operation.status.current_step = format!("Processing {}", file_label);
}

/// Appends one unit's result and advances the step counter and progress.
/// Progress never moves backwards.
pub fn record(operation: &mut BatchOperation, result: BatchResult) {
    operation.status.current_step = if result.success {
        format!("Completed {}", result.file_name)
    } else {
        format!(
            "Failed {}: {}",
            result.file_name,
            result.error.as_deref().unwrap_or("Unknown error")
        )
    };
    operation.results.push(result);

    let status = &mut operation.status;
    status.completed_steps = (status.completed_steps + 1).min(status.total_steps);
    let progress = compute_progress(status.completed_steps, status.total_steps);
    operation.progress = operation.progress.max(progress);
}

/// Applies the completion rule once every unit has run.
///
/// Zero failures and partial failures both end `completed`; only a run where
/// every unit failed ends `failed`. Failures stay visible in `results`.
pub fn finish(operation: &mut BatchOperation) {
    let success_count = operation.success_count();
    let failure_count = operation.results.len() - success_count;

    let state = if failure_count > 0 && failure_count == operation.results.len() {
        ProcessingState::Failed
    } else {
        ProcessingState::Completed
    };

    let status = &mut operation.status;
    status.state = state;
    status.completed_steps = status.total_steps;
    status.current_step = format!(
        "Completed: {} successful, {} failed",
        success_count, failure_count
    );
    status.message = Some("Batch operation completed".to_string());
    if state == ProcessingState::Failed {
        status.error = operation
            .results
            .iter()
            .rev()
            .find_map(|r| r.error.clone());
    }
    operation.progress = operation
        .progress
        .max(compute_progress(status.completed_steps, status.total_steps));
    operation.end_time = Some(Utc::now());
}

/// Marks an operation failed for a reason outside any single unit.
pub fn fault(operation: &mut BatchOperation, error: String) {
    operation.status.state = ProcessingState::Failed;
    operation.status.error = Some(error);
    operation.status.message = Some("Batch operation failed".to_string());
    operation.end_time = Some(Utc::now());
}

pub fn mark_paused(operation: &mut BatchOperation) {
    operation.status.state = ProcessingState::Paused;
    operation.status.message = Some("Batch operation paused".to_string());
}

pub fn mark_resumed(operation: &mut BatchOperation) {
    operation.status.state = ProcessingState::Pending;
    operation.status.message = Some("Batch operation resumed".to_string());
}

/// Undoes a pause that has not yet taken the operation out of the executor.
pub fn mark_running(operation: &mut BatchOperation) {
    operation.status.state = ProcessingState::Processing;
    operation.status.message = Some("Batch operation resumed".to_string());
}

pub fn mark_cancelled(operation: &mut BatchOperation) {
    operation.status.state = ProcessingState::Cancelled;
    operation.status.message = Some("Batch operation cancelled".to_string());
    operation.end_time = Some(Utc::now());
}

/// Returns a failed operation to `pending` with a clean slate.
pub fn reset_for_retry(operation: &mut BatchOperation) {
    operation.results.clear();
    operation.progress = 0;
    operation.start_time = None;
    operation.end_time = None;
    let status = &mut operation.status;
    status.state = ProcessingState::Pending;
    status.completed_steps = 0;
    status.current_step = "Waiting for retry".to_string();
    status.message = None;
    status.error = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::factory::{create_batch_merge, create_batch_watermark};
    use crate::operation::params::{MergeOptions, WatermarkOptions};
    use std::path::PathBuf;

    fn ok(file: &str) -> BatchResult {
        BatchResult::success(file, file, PathBuf::from(file), 10, 1)
    }

    fn err(file: &str) -> BatchResult {
        BatchResult::failure(file, file, "boom".to_string())
    }

    fn watermark(files: &[&str]) -> BatchOperation {
        create_batch_watermark(files.to_vec(), WatermarkOptions::text("DRAFT", 0.5)).unwrap()
    }

    #[test]
    fn test_compute_progress() {
        assert_eq!(compute_progress(0, 3), 0);
        assert_eq!(compute_progress(1, 3), 33);
        assert_eq!(compute_progress(2, 3), 67);
        assert_eq!(compute_progress(3, 3), 100);
        assert_eq!(compute_progress(1, 2), 50);
        assert_eq!(compute_progress(5, 3), 100);
        assert_eq!(compute_progress(0, 0), 100);
    }

    #[test]
    fn test_record_advances_progress() {
        let mut op = watermark(&["a", "b", "c"]);
        begin(&mut op);
        assert_eq!(op.state(), ProcessingState::Processing);
        assert!(op.start_time.is_some());

        record(&mut op, ok("a"));
        assert_eq!(op.status.completed_steps, 1);
        assert_eq!(op.progress, 33);
        assert_eq!(op.status.current_step, "Completed a");

        record(&mut op, err("b"));
        assert_eq!(op.progress, 67);
        assert_eq!(op.status.current_step, "Failed b: boom");

        record(&mut op, ok("c"));
        assert_eq!(op.progress, 100);
        assert_eq!(op.results.len(), 3);
    }

    #[test]
    fn test_finish_all_success_completes() {
        let mut op = watermark(&["a", "b"]);
        begin(&mut op);
        record(&mut op, ok("a"));
        record(&mut op, ok("b"));
        finish(&mut op);
        assert_eq!(op.state(), ProcessingState::Completed);
        assert_eq!(op.status.current_step, "Completed: 2 successful, 0 failed");
        assert_eq!(op.status.message.as_deref(), Some("Batch operation completed"));
        assert!(op.end_time.is_some());
    }

    #[test]
    fn test_finish_partial_failure_still_completes() {
        let mut op = watermark(&["a", "b", "c"]);
        begin(&mut op);
        record(&mut op, ok("a"));
        record(&mut op, err("b"));
        record(&mut op, ok("c"));
        finish(&mut op);
        assert_eq!(op.state(), ProcessingState::Completed);
        assert!(op.status.error.is_none());
        assert_eq!(op.progress, 100);
    }

    #[test]
    fn test_finish_total_failure_fails() {
        let mut op = create_batch_merge(["a", "b"], MergeOptions::default()).unwrap();
        begin(&mut op);
        record(&mut op, err("merged"));
        finish(&mut op);
        assert_eq!(op.state(), ProcessingState::Failed);
        assert_eq!(op.status.error.as_deref(), Some("boom"));
        assert_eq!(op.progress, 100);
    }

    #[test]
    fn test_begin_keeps_start_time_on_resume() {
        let mut op = watermark(&["a", "b"]);
        begin(&mut op);
        let started = op.start_time;
        record(&mut op, ok("a"));
        mark_paused(&mut op);
        mark_resumed(&mut op);
        begin(&mut op);
        assert_eq!(op.start_time, started);
        assert_eq!(op.status.current_step, "Resuming batch operation");
    }

    #[test]
    fn test_reset_for_retry() {
        let mut op = watermark(&["a"]);
        begin(&mut op);
        record(&mut op, err("a"));
        finish(&mut op);
        assert_eq!(op.state(), ProcessingState::Failed);

        reset_for_retry(&mut op);
        assert_eq!(op.state(), ProcessingState::Pending);
        assert!(op.results.is_empty());
        assert_eq!(op.progress, 0);
        assert_eq!(op.status.completed_steps, 0);
        assert!(op.status.error.is_none());
        assert!(op.start_time.is_none());
        assert!(op.end_time.is_none());
    }
}
