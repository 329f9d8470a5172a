//! Contracts for the collaborators the pipeline consumes.

pub mod registry;
pub mod transform;

pub use registry::{FileHandle, FileRegistry, InMemoryFileRegistry, RegistryError};
pub use transform::{DocumentTransformService, TransformError, TransformOutput};
