pub mod broadcast;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod operation;
pub mod queue;
pub mod scheduler;
pub mod services;
pub mod storage;

pub use broadcast::{BatchEvent, BatchEventKind, ListFilter};
pub use config::{load_config, load_config_from_str, load_config_from_yaml_str, BatchConfig};
pub use error::{
    BatchError, ConfigError, OperationError, Result, SchedulerError, StorageError,
};
pub use executor::{ExecutorError, UNKNOWN_FILE_NAME};
pub use operation::{
    create_batch_export, create_batch_header_footer, create_batch_merge, create_batch_operation,
    create_batch_security, create_batch_split, create_batch_watermark, BatchOperation,
    BatchResult, OperationParams, OperationType, ProcessingState, ProcessingStatus,
};
pub use queue::{QueueItem, QueueStats, DEFAULT_MAX_RETRIES};
pub use scheduler::{BatchHandle, BatchScheduler, DrainSummary};
pub use services::{
    DocumentTransformService, FileHandle, FileRegistry, InMemoryFileRegistry, RegistryError,
    TransformError, TransformOutput,
};
