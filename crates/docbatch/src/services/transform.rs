//! Contract for the service that performs the byte-level document work.

use thiserror::Error;

use crate::operation::{MergeOptions, OperationParams};

use super::registry::FileHandle;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Failed to read document '{name}': {reason}")]
    ReadDocument { name: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// Bytes produced by one transform. Splits yield several parts; everything
/// else yields one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    pub parts: Vec<Vec<u8>>,
    pub warnings: Vec<String>,
}

impl TransformOutput {
    pub fn single(bytes: Vec<u8>) -> Self {
        Self {
            parts: vec![bytes],
            warnings: vec![],
        }
    }

    pub fn parts(parts: Vec<Vec<u8>>) -> Self {
        Self {
            parts,
            warnings: vec![],
        }
    }

    pub fn with_warning(mut self, warning: &str) -> Self {
        self.warnings.push(warning.to_string());
        self
    }

    /// Sum of all part sizes.
    pub fn output_size(&self) -> u64 {
        self.parts.iter().map(|p| p.len() as u64).sum()
    }
}

/// Performs single-file and multi-file transforms.
///
/// Calls block the scheduler thread until they return; implementations
/// must not call back into the scheduler's blocking API.
pub trait DocumentTransformService: Send + Sync {
    /// Applies one payload to one file. `params` never carries merge
    /// settings; merges go through [`DocumentTransformService::merge_all`].
    fn transform(
        &self,
        file: &FileHandle,
        params: &OperationParams,
    ) -> Result<TransformOutput, TransformError>;

    /// Combines `files`, in order, into one document.
    fn merge_all(
        &self,
        files: &[FileHandle],
        options: &MergeOptions,
    ) -> Result<TransformOutput, TransformError>;
}
