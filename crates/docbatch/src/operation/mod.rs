pub mod aggregate;
pub mod descriptor;
pub mod factory;
pub mod params;
pub mod result;

pub use descriptor::{
    format_duration, BatchOperation, OperationType, ProcessingState, ProcessingStatus,
};
pub use factory::{
    create_batch_export, create_batch_header_footer, create_batch_merge, create_batch_operation,
    create_batch_security, create_batch_split, create_batch_watermark,
};
pub use params::{
    ExportFormatType, ExportOptions, HeaderFooterOptions, MergeOptions, OperationParams,
    SecuritySettings, SplitOptions, WatermarkOptions,
};
pub use result::{BatchResult, MERGED_FILE_ID, MERGED_FILE_NAME};
