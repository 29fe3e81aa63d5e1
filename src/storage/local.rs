//! # Local Filesystem Backend
//!
//! One file per key under a root directory. Key segments map to
//! directories, so `f/color/red/dd42` lives at `<root>/f/color/red/dd42`.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::backend::StorageBackend;
use super::errors::{StorageError, StorageResult};

/// Local filesystem storage backend
#[derive(Debug)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a new local backend rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory of this backend
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn full_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Ok(self.root.clone());
        }
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(StorageError::InvalidKey(key.to_string()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    fn map_err(key: &str, e: std::io::Error) -> StorageError {
        if e.kind() == ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::io(key, e)
        }
    }
}

impl StorageBackend for LocalBackend {
    fn write(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let full_path = self.full_path(key)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(key, e))?;
        }

        fs::write(&full_path, data).map_err(|e| StorageError::io(key, e))
    }

    fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.full_path(key)?;
        if full_path.is_dir() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        fs::read(&full_path).map_err(|e| Self::map_err(key, e))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let full_path = self.full_path(key)?;
        fs::remove_file(&full_path).map_err(|e| Self::map_err(key, e))
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.full_path(key)?.exists())
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let full_path = self.full_path(prefix)?;
        let mut results = Vec::new();

        if !full_path.is_dir() {
            return Ok(results);
        }

        let entries = fs::read_dir(&full_path).map_err(|e| Self::map_err(prefix, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(prefix, e))?;
            if let Some(name) = entry.file_name().to_str() {
                if prefix.is_empty() {
                    results.push(name.to_string());
                } else {
                    results.push(format!("{}/{}", prefix, name));
                }
            }
        }

        results.sort();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path().to_path_buf());

        backend.write("space", b"hello").unwrap();
        let data = backend.read("space").unwrap();
        assert_eq!(data, b"hello");
    }

    #[test]
    fn test_nested_key() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path().to_path_buf());

        backend.write("f/color/red/dd1", b"").unwrap();
        assert!(backend.exists("f/color/red/dd1").unwrap());
        assert_eq!(backend.read("f/color/red/dd1").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_delete() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path().to_path_buf());

        backend.write("d/doc", b"bye").unwrap();
        backend.delete("d/doc").unwrap();
        assert!(!backend.exists("d/doc").unwrap());

        let again = backend.delete("d/doc");
        assert!(matches!(again, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_not_found() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path().to_path_buf());

        let result = backend.read("d/nonexistent");
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_list_direct_children() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path().to_path_buf());

        backend.write("f/color/red/b", b"").unwrap();
        backend.write("f/color/red/a", b"").unwrap();
        backend.write("f/color/blue/c", b"").unwrap();

        assert_eq!(
            backend.list("f/color/red").unwrap(),
            vec!["f/color/red/a".to_string(), "f/color/red/b".to_string()]
        );
        assert_eq!(
            backend.list("f/color").unwrap(),
            vec!["f/color/blue".to_string(), "f/color/red".to_string()]
        );
        assert!(backend.list("f/size").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path().to_path_buf());

        assert!(matches!(
            backend.write("f/../../etc", b"x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            backend.write("f//x", b"x"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
