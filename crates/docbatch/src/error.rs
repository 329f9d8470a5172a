use std::path::PathBuf;
use thiserror::Error;

use crate::operation::OperationType;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Errors raised while assembling an operation descriptor.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OperationError {
    #[error("{kind} operation requires at least one file")]
    EmptyFileSet { kind: OperationType },

    #[error("{kind} operation requires at least one parameter payload")]
    NoOperations { kind: OperationType },

    #[error("{kind} operation received {found} parameters")]
    MismatchedParams {
        kind: OperationType,
        found: OperationType,
    },

    #[error("Invalid {kind} parameters: {reason}")]
    InvalidParams { kind: OperationType, reason: String },
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Failed to spawn scheduler thread: {0}")]
    SpawnFailed(String),

    #[error("Scheduler channel closed unexpectedly")]
    ChannelClosed,

    #[error("Scheduler thread panicked")]
    WorkerPanicked,

    #[error("Operation '{0}' is already queued")]
    DuplicateId(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

pub type Result<T> = std::result::Result<T, BatchError>;
