use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Upper bound on `_N` suffixes tried before giving up on a name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Writes transform outputs under one directory without overwriting
/// earlier artifacts.
pub struct OutputStorage {
    output_directory: PathBuf,
}

impl OutputStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Stores one artifact as `filename`, or `stem_N.ext` if taken.
    pub fn store_file(&self, filename: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        self.ensure_directory(&self.output_directory)?;

        let (base, ext) = split_extension(filename);
        for counter in 1..=MAX_NAME_ATTEMPTS {
            let try_path = self.output_directory.join(numbered(base, ext, counter));

            // create_new is an atomic check-and-create (O_CREAT | O_EXCL)
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    })
                }
            }
        }

        Err(StorageError::FileExists(self.output_directory.join(filename)))
    }

    /// Stores a multi-part artifact as a fresh directory holding
    /// `part_001.<extension>`, `part_002.<extension>`, ...
    pub fn store_parts(
        &self,
        directory: &str,
        extension: &str,
        parts: &[Vec<u8>],
    ) -> Result<PathBuf, StorageError> {
        self.ensure_directory(&self.output_directory)?;

        let dir_path = self.create_unique_directory(directory)?;
        for (index, part) in parts.iter().enumerate() {
            let part_path = dir_path.join(format!("part_{:03}.{}", index + 1, extension));
            std::fs::write(&part_path, part).map_err(|e| StorageError::WriteFile {
                path: part_path.clone(),
                source: e,
            })?;
        }
        Ok(dir_path)
    }

    fn create_unique_directory(&self, name: &str) -> Result<PathBuf, StorageError> {
        for counter in 1..=MAX_NAME_ATTEMPTS {
            let try_path = self.output_directory.join(numbered(name, None, counter));
            match std::fs::create_dir(&try_path) {
                Ok(()) => return Ok(try_path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::CreateDirectory {
                        path: try_path,
                        source: e,
                    })
                }
            }
        }
        Err(StorageError::FileExists(self.output_directory.join(name)))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(dot) if dot > 0 => (&filename[..dot], Some(&filename[dot..])),
        _ => (filename, None),
    }
}

fn numbered(base: &str, ext: Option<&str>, counter: u32) -> String {
    match (counter, ext) {
        (1, Some(ext)) => format!("{}{}", base, ext),
        (1, None) => base.to_string(),
        (n, Some(ext)) => format!("{}_{}{}", base, n, ext),
        (n, None) => format!("{}_{}", base, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_file_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("nested/out");
        let storage = OutputStorage::new(&out);

        let path = storage.store_file("a_secured.pdf", b"data").unwrap();
        assert_eq!(path, out.join("a_secured.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
    }

    #[test]
    fn test_store_file_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let storage = OutputStorage::new(temp_dir.path());

        let first = storage.store_file("merged_document.pdf", b"one").unwrap();
        let second = storage.store_file("merged_document.pdf", b"two").unwrap();
        let third = storage.store_file("merged_document.pdf", b"three").unwrap();

        assert_eq!(first.file_name().unwrap(), "merged_document.pdf");
        assert_eq!(second.file_name().unwrap(), "merged_document_2.pdf");
        assert_eq!(third.file_name().unwrap(), "merged_document_3.pdf");
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
    }

    #[test]
    fn test_store_parts() {
        let temp_dir = TempDir::new().unwrap();
        let storage = OutputStorage::new(temp_dir.path());
        let parts = vec![b"p1".to_vec(), b"p2".to_vec(), b"p3".to_vec()];

        let dir = storage.store_parts("a_split_3_files", "pdf", &parts).unwrap();
        assert!(dir.is_dir());
        assert_eq!(std::fs::read(dir.join("part_001.pdf")).unwrap(), b"p1");
        assert_eq!(std::fs::read(dir.join("part_003.pdf")).unwrap(), b"p3");

        let again = storage.store_parts("a_split_3_files", "pdf", &parts).unwrap();
        assert_eq!(again.file_name().unwrap(), "a_split_3_files_2");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.pdf"), ("a", Some(".pdf")));
        assert_eq!(split_extension("a.b.pdf"), ("a.b", Some(".pdf")));
        assert_eq!(split_extension("noext"), ("noext", None));
        assert_eq!(split_extension(".hidden"), (".hidden", None));
    }
}
