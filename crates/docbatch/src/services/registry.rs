//! File registry contract and an in-memory implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The id is unknown. Recorded as a failed unit; the batch continues.
    #[error("File not found")]
    NotFound(String),

    /// The registry itself cannot answer. Aborts the whole operation.
    #[error("File registry unavailable: {0}")]
    Unavailable(String),
}

/// A resolved input file. The pipeline never owns file bytes; the transform
/// service reads them through the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub id: String,
    /// Display name, e.g. `report.pdf`.
    pub name: String,
    /// Location on disk, if the file is backed by one.
    pub path: Option<PathBuf>,
    pub size: u64,
    pub mime_type: Option<String>,
}

impl FileHandle {
    pub fn new(id: &str, name: &str, size: u64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            path: None,
            size,
            mime_type: mime_guess::from_path(name).first().map(|m| m.to_string()),
        }
    }

    /// Name without its final extension, used to build output names.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

pub trait FileRegistry: Send + Sync {
    fn resolve(&self, file_id: &str) -> Result<FileHandle, RegistryError>;
}

/// Registry backed by a map, for embedding and tests.
#[derive(Default)]
pub struct InMemoryFileRegistry {
    files: RwLock<HashMap<String, FileHandle>>,
}

impl InMemoryFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: FileHandle) {
        let mut guard = match self.files.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("File registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.insert(handle.id.clone(), handle);
    }

    /// Registers a file on disk under a fresh id and returns the id.
    pub fn register_path(&self, path: &Path) -> std::io::Result<String> {
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let id = uuid::Uuid::new_v4().to_string();

        let mut handle = FileHandle::new(&id, &name, metadata.len());
        handle.path = Some(path.to_path_buf());
        self.insert(handle);
        Ok(id)
    }

    pub fn remove(&self, file_id: &str) -> Option<FileHandle> {
        match self.files.write() {
            Ok(mut guard) => guard.remove(file_id),
            Err(poisoned) => poisoned.into_inner().remove(file_id),
        }
    }

    pub fn len(&self) -> usize {
        match self.files.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => {
                log::warn!("File registry lock was poisoned, recovering");
                poisoned.into_inner().len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileRegistry for InMemoryFileRegistry {
    fn resolve(&self, file_id: &str) -> Result<FileHandle, RegistryError> {
        let guard = self
            .files
            .read()
            .map_err(|_| RegistryError::Unavailable("registry lock poisoned".to_string()))?;
        guard
            .get(file_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(file_id.to_string()))
    }
}
