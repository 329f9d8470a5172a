use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, debug_span, info, info_span, warn};

use crate::error::StorageError;
use crate::operation::aggregate;
use crate::operation::{
    BatchOperation, BatchResult, MergeOptions, OperationParams, ProcessingState, MERGED_FILE_ID,
    MERGED_FILE_NAME,
};
use crate::services::{
    DocumentTransformService, FileHandle, FileRegistry, RegistryError, TransformError,
    TransformOutput,
};
use crate::storage::OutputStorage;

use super::control::{ExecutionControl, ExecutionOutcome};
use super::error::ExecutorError;

/// File name recorded when an id cannot be resolved.
pub const UNKNOWN_FILE_NAME: &str = "Unknown";

/// Where a unit's output goes, before storage decides the final path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputName {
    File(String),
    Parts { directory: String, extension: String },
}

/// Runs one operation's units, in order, against the transform service.
pub struct Executor {
    transform: Arc<dyn DocumentTransformService>,
    registry: Arc<dyn FileRegistry>,
    storage: Option<OutputStorage>,
}

impl Executor {
    pub fn new(
        transform: Arc<dyn DocumentTransformService>,
        registry: Arc<dyn FileRegistry>,
    ) -> Self {
        Self {
            transform,
            registry,
            storage: None,
        }
    }

    /// Writes outputs to disk instead of reporting logical names only.
    pub fn with_storage(mut self, storage: OutputStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Runs the operation from its first unfinished unit.
    ///
    /// Per-unit failures are recorded in `results`. An `Err` means the
    /// operation could not continue at all; the caller decides how to
    /// record that.
    pub fn execute(
        &self,
        operation: &mut BatchOperation,
        control: &mut dyn ExecutionControl,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let _span = info_span!("batch_operation",
            id = %operation.id,
            kind = %operation.kind,
            files = operation.files.len(),
        )
        .entered();

        aggregate::begin(operation);
        control.checkpoint(operation);

        if operation.kind.is_merge() {
            self.run_merge(operation, control)
        } else {
            self.run_units(operation, control)
        }
    }

    fn run_units(
        &self,
        operation: &mut BatchOperation,
        control: &mut dyn ExecutionControl,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let per_file = operation.operations.len().max(1);

        while operation.status.completed_steps < operation.status.total_steps {
            if operation.state() != ProcessingState::Processing {
                return Ok(ExecutionOutcome::Interrupted);
            }

            let unit = operation.status.completed_steps as usize;
            let (Some(file_id), Some(params)) = (
                operation.files.get(unit / per_file).cloned(),
                operation.operations.get(unit % per_file).cloned(),
            ) else {
                warn!(
                    "Operation {} has fewer units than its step count ({})",
                    operation.id, operation.status.total_steps
                );
                break;
            };

            let _unit_span = debug_span!("unit", unit, file_id = %file_id).entered();
            let started = Instant::now();

            let result = match self.resolve(&file_id)? {
                Some(handle) => {
                    aggregate::step_started(operation, &handle.name);
                    control.checkpoint(operation);
                    if operation.state() != ProcessingState::Processing {
                        return Ok(ExecutionOutcome::Interrupted);
                    }
                    self.transform_one(&handle, &params, started)?
                }
                None => {
                    debug!("File {} is not registered", file_id);
                    BatchResult::failure(
                        &file_id,
                        UNKNOWN_FILE_NAME,
                        RegistryError::NotFound(file_id.clone()).to_string(),
                    )
                    .with_processing_time(elapsed_millis(started))
                }
            };

            aggregate::record(operation, result);
            control.checkpoint(operation);
        }

        Ok(conclude(operation))
    }

    fn run_merge(
        &self,
        operation: &mut BatchOperation,
        control: &mut dyn ExecutionControl,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        if operation.status.completed_steps < operation.status.total_steps {
            if operation.state() != ProcessingState::Processing {
                return Ok(ExecutionOutcome::Interrupted);
            }

            let options = operation
                .operations
                .iter()
                .find_map(|params| match params {
                    OperationParams::Merge(options) => Some(options.clone()),
                    _ => None,
                })
                .unwrap_or_default();

            aggregate::step_started(
                operation,
                &format!("merge of {} files", operation.files.len()),
            );
            control.checkpoint(operation);
            if operation.state() != ProcessingState::Processing {
                return Ok(ExecutionOutcome::Interrupted);
            }

            let started = Instant::now();
            let result = self.merge_files(&operation.files, &options, started)?;
            aggregate::record(operation, result);
            control.checkpoint(operation);
        }

        Ok(conclude(operation))
    }

    /// `Ok(None)` for an unknown id, which only fails the unit.
    fn resolve(&self, file_id: &str) -> Result<Option<FileHandle>, ExecutorError> {
        let resolved =
            guarded(|| self.registry.resolve(file_id)).map_err(ExecutorError::RegistryPanicked)?;
        match resolved {
            Ok(handle) => Ok(Some(handle)),
            Err(RegistryError::NotFound(_)) => Ok(None),
            Err(e) => Err(ExecutorError::Registry(e)),
        }
    }

    fn transform_one(
        &self,
        handle: &FileHandle,
        params: &OperationParams,
        started: Instant,
    ) -> Result<BatchResult, ExecutorError> {
        if let OperationParams::Merge(_) = params {
            let error = TransformError::Unsupported("merge payload on a per-file operation".into());
            return Ok(BatchResult::failure(&handle.id, &handle.name, error.to_string())
                .with_processing_time(elapsed_millis(started)));
        }

        let outcome = guarded(|| self.transform.transform(handle, params))
            .map_err(ExecutorError::TransformPanicked)?;

        Ok(match outcome {
            Ok(output) => {
                let name = output_name(handle, params, &output);
                self.stored_result(&handle.id, &handle.name, &name, output, started)
            }
            Err(e) => {
                debug!("Transform of {} failed: {}", handle.name, e);
                BatchResult::failure(&handle.id, &handle.name, e.to_string())
                    .with_processing_time(elapsed_millis(started))
            }
        })
    }

    /// One attempt over the whole file set. Any failure fails the attempt.
    fn merge_files(
        &self,
        file_ids: &[String],
        options: &MergeOptions,
        started: Instant,
    ) -> Result<BatchResult, ExecutorError> {
        let mut handles = Vec::with_capacity(file_ids.len());
        for file_id in file_ids {
            match self.resolve(file_id)? {
                Some(handle) => handles.push(handle),
                None => {
                    let error = format!("{}: {}", RegistryError::NotFound(file_id.clone()), file_id);
                    return Ok(BatchResult::failure(MERGED_FILE_ID, MERGED_FILE_NAME, error)
                        .with_processing_time(elapsed_millis(started)));
                }
            }
        }

        let outcome = guarded(|| self.transform.merge_all(&handles, options))
            .map_err(ExecutorError::TransformPanicked)?;

        Ok(match outcome {
            Ok(output) => {
                let name = OutputName::File(MERGED_FILE_NAME.to_string());
                self.stored_result(MERGED_FILE_ID, MERGED_FILE_NAME, &name, output, started)
            }
            Err(e) => {
                debug!("Merge of {} files failed: {}", handles.len(), e);
                BatchResult::failure(MERGED_FILE_ID, MERGED_FILE_NAME, e.to_string())
                    .with_processing_time(elapsed_millis(started))
            }
        })
    }

    fn stored_result(
        &self,
        file_id: &str,
        file_name: &str,
        name: &OutputName,
        output: TransformOutput,
        started: Instant,
    ) -> BatchResult {
        match self.write_output(name, &output) {
            Ok(path) => BatchResult::success(
                file_id,
                file_name,
                path,
                output.output_size(),
                elapsed_millis(started),
            )
            .with_warnings(output.warnings),
            Err(e) => {
                warn!("Failed to store output for {}: {}", file_name, e);
                BatchResult::failure(file_id, file_name, e.to_string())
                    .with_processing_time(elapsed_millis(started))
            }
        }
    }

    fn write_output(
        &self,
        name: &OutputName,
        output: &TransformOutput,
    ) -> Result<PathBuf, StorageError> {
        match (&self.storage, name) {
            (None, OutputName::File(file)) => Ok(PathBuf::from(file)),
            (None, OutputName::Parts { directory, .. }) => Ok(PathBuf::from(directory)),
            (Some(storage), OutputName::File(file)) => {
                storage.store_file(file, &output.parts.concat())
            }
            (Some(storage), OutputName::Parts {
                directory,
                extension,
            }) => storage.store_parts(directory, extension, &output.parts),
        }
    }
}

/// Applies the completion rule unless a checkpoint moved the operation out
/// of `processing`.
fn conclude(operation: &mut BatchOperation) -> ExecutionOutcome {
    if operation.state() != ProcessingState::Processing {
        return ExecutionOutcome::Interrupted;
    }
    aggregate::finish(operation);
    info!(
        "Operation {} {}: {} successful, {} failed",
        operation.id,
        operation.state(),
        operation.success_count(),
        operation.failure_count()
    );
    ExecutionOutcome::Finished
}

/// Names derive from the file stem: `report.pdf` exports as `report_exported.pdf`.
fn output_name(handle: &FileHandle, params: &OperationParams, output: &TransformOutput) -> OutputName {
    let stem = handle.stem();
    match params {
        OperationParams::Export(options) => OutputName::File(format!(
            "{}_exported.{}",
            stem,
            options.format.format_type.extension()
        )),
        OperationParams::Split(options) => OutputName::Parts {
            directory: format!("{}_split_{}_files", stem, output.parts.len()),
            extension: options.output_format.clone(),
        },
        OperationParams::Merge(_) => OutputName::File(MERGED_FILE_NAME.to_string()),
        OperationParams::Watermark(_) => OutputName::File(format!("{}_watermarked.pdf", stem)),
        OperationParams::HeaderFooter(_) => {
            OutputName::File(format!("{}_with_headers.pdf", stem))
        }
        OperationParams::Security(_) => OutputName::File(format!("{}_secured.pdf", stem)),
    }
}

fn elapsed_millis(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Runs a service call, turning a panic into its message.
fn guarded<T>(call: impl FnOnce() -> T) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(call)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
