//! Constructors for batch operations, one per operation type.
//!
//! These only assemble data: nothing is queued or executed here.

use std::collections::HashSet;

use crate::error::OperationError;

use super::descriptor::{BatchOperation, OperationType, ProcessingStatus};
use super::params::{
    ExportOptions, HeaderFooterOptions, MergeOptions, OperationParams, SecuritySettings,
    SplitOptions, WatermarkOptions,
};

/// Builds a pending operation after checking that the file set is non-empty
/// and that every payload matches `kind`.
pub fn create_batch_operation<I, S>(
    name: &str,
    kind: OperationType,
    files: I,
    operations: Vec<OperationParams>,
) -> Result<BatchOperation, OperationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let files = dedup_files(files);
    if files.is_empty() {
        return Err(OperationError::EmptyFileSet { kind });
    }
    if operations.is_empty() {
        return Err(OperationError::NoOperations { kind });
    }
    for params in &operations {
        if params.kind() != kind {
            return Err(OperationError::MismatchedParams {
                kind,
                found: params.kind(),
            });
        }
        params
            .validate()
            .map_err(|reason| OperationError::InvalidParams { kind, reason })?;
    }

    let mut operation = BatchOperation {
        id: format!("batch_{}", uuid::Uuid::new_v4()),
        name: name.to_string(),
        kind,
        files,
        operations,
        status: ProcessingStatus::pending(0),
        progress: 0,
        start_time: None,
        end_time: None,
        results: Vec::new(),
    };
    operation.status.total_steps = operation.unit_count();
    Ok(operation)
}

/// Keeps first occurrence order; a file listed twice is processed once.
fn dedup_files<I, S>(files: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    files
        .into_iter()
        .map(Into::into)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn named(
    mut operation: BatchOperation,
    name: impl FnOnce(usize) -> String,
) -> BatchOperation {
    operation.name = name(operation.files.len());
    operation
}

pub fn create_batch_export<I, S>(
    files: I,
    options: ExportOptions,
) -> Result<BatchOperation, OperationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let label = options.format.format_type.label();
    let operation = create_batch_operation(
        "",
        OperationType::Export,
        files,
        vec![OperationParams::Export(options)],
    )?;
    Ok(named(operation, |n| format!("Export {} files to {}", n, label)))
}

pub fn create_batch_split<I, S>(
    files: I,
    options: SplitOptions,
) -> Result<BatchOperation, OperationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let operation = create_batch_operation(
        "",
        OperationType::Split,
        files,
        vec![OperationParams::Split(options)],
    )?;
    Ok(named(operation, |n| format!("Split {} files", n)))
}

pub fn create_batch_merge<I, S>(
    files: I,
    options: MergeOptions,
) -> Result<BatchOperation, OperationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let operation = create_batch_operation(
        "",
        OperationType::Merge,
        files,
        vec![OperationParams::Merge(options)],
    )?;
    Ok(named(operation, |n| format!("Merge {} files", n)))
}

pub fn create_batch_watermark<I, S>(
    files: I,
    watermark: WatermarkOptions,
) -> Result<BatchOperation, OperationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let operation = create_batch_operation(
        "",
        OperationType::Watermark,
        files,
        vec![OperationParams::Watermark(watermark)],
    )?;
    Ok(named(operation, |n| format!("Add watermark to {} files", n)))
}

pub fn create_batch_header_footer<I, S>(
    files: I,
    header_footer: HeaderFooterOptions,
) -> Result<BatchOperation, OperationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let operation = create_batch_operation(
        "",
        OperationType::HeaderFooter,
        files,
        vec![OperationParams::HeaderFooter(header_footer)],
    )?;
    Ok(named(operation, |n| format!("Add header/footer to {} files", n)))
}

pub fn create_batch_security<I, S>(
    files: I,
    security: SecuritySettings,
) -> Result<BatchOperation, OperationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let operation = create_batch_operation(
        "",
        OperationType::Security,
        files,
        vec![OperationParams::Security(security)],
    )?;
    Ok(named(operation, |n| format!("Apply security to {} files", n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::params::{ExportFormatType, Permissions};
    use crate::operation::ProcessingState;

    #[test]
    fn test_export_descriptor() {
        let op = create_batch_export(["a", "b"], ExportOptions::new(ExportFormatType::Pdf))
            .unwrap();
        assert!(op.id.starts_with("batch_"));
        assert_eq!(op.name, "Export 2 files to PDF");
        assert_eq!(op.kind, OperationType::Export);
        assert_eq!(op.files, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(op.status.state, ProcessingState::Pending);
        assert_eq!(op.status.current_step, "Initializing");
        assert_eq!(op.status.total_steps, 2);
        assert_eq!(op.status.completed_steps, 0);
        assert_eq!(op.progress, 0);
        assert!(op.results.is_empty());
        assert!(op.start_time.is_none());
    }

    #[test]
    fn test_merge_has_single_step() {
        let op = create_batch_merge(["a", "b", "c", "d"], MergeOptions::default()).unwrap();
        assert_eq!(op.status.total_steps, 1);
        assert_eq!(op.unit_count(), 1);
        assert_eq!(op.name, "Merge 4 files");
    }

    #[test]
    fn test_total_steps_is_files_times_operations() {
        let op = create_batch_operation(
            "two footers",
            OperationType::HeaderFooter,
            vec!["a", "b", "c"],
            vec![
                OperationParams::HeaderFooter(HeaderFooterOptions::footer("Page {page}")),
                OperationParams::HeaderFooter(HeaderFooterOptions::footer("Confidential")),
            ],
        )
        .unwrap();
        assert_eq!(op.status.total_steps, 6);
        assert_eq!(op.unit_count(), 6);
    }

    #[test]
    fn test_names_per_type() {
        let files = ["a", "b", "c"];
        assert_eq!(
            create_batch_split(files, SplitOptions::every_pages(1))
                .unwrap()
                .name,
            "Split 3 files"
        );
        assert_eq!(
            create_batch_watermark(files, WatermarkOptions::text("DRAFT", 0.2))
                .unwrap()
                .name,
            "Add watermark to 3 files"
        );
        assert_eq!(
            create_batch_header_footer(files, HeaderFooterOptions::footer("x"))
                .unwrap()
                .name,
            "Add header/footer to 3 files"
        );
        assert_eq!(
            create_batch_security(
                files,
                SecuritySettings::encrypted("owner", Permissions::default())
            )
            .unwrap()
            .name,
            "Apply security to 3 files"
        );
    }

    #[test]
    fn test_empty_file_set_rejected() {
        let err = create_batch_export(Vec::<String>::new(), ExportOptions::new(ExportFormatType::Png))
            .unwrap_err();
        assert_eq!(
            err,
            OperationError::EmptyFileSet {
                kind: OperationType::Export
            }
        );
    }

    #[test]
    fn test_mismatched_params_rejected() {
        let err = create_batch_operation(
            "bad",
            OperationType::Split,
            ["a"],
            vec![OperationParams::Merge(MergeOptions::default())],
        )
        .unwrap_err();
        assert!(matches!(err, OperationError::MismatchedParams { .. }));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let err = create_batch_watermark(["a"], WatermarkOptions::text("DRAFT", 2.0)).unwrap_err();
        assert!(matches!(err, OperationError::InvalidParams { .. }));
    }

    #[test]
    fn test_duplicate_files_are_collapsed() {
        let op = create_batch_split(["a", "b", "a"], SplitOptions::every_pages(1)).unwrap();
        assert_eq!(op.files, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(op.status.total_steps, 2);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = create_batch_merge(["x"], MergeOptions::default()).unwrap();
        let b = create_batch_merge(["x"], MergeOptions::default()).unwrap();
        assert_ne!(a.id, b.id);
    }
}
