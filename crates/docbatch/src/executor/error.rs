use thiserror::Error;

use crate::services::RegistryError;

/// Failures that abort a whole operation instead of being recorded against
/// one unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error(transparent)]
    Registry(RegistryError),

    #[error("Document transform service panicked: {0}")]
    TransformPanicked(String),

    #[error("File registry panicked: {0}")]
    RegistryPanicked(String),
}
